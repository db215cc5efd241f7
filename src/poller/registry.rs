use std::collections::HashMap;

use crate::settings::InstanceId;

/// The two kinds of deferred work a button instance can have pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Press,
    Refresh,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Press => "press",
            TimerKind::Refresh => "refresh",
        }
    }
}

/// Identifies one armed timer. The serial distinguishes a timer from the one it replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub instance: InstanceId,
    pub kind: TimerKind,
    pub serial: u64,
}

/// A scheduled timer that can be cancelled before it fires.
pub trait TimerHandle {
    fn cancel(self);
}

struct Armed<T> {
    serial: u64,
    timer: T,
}

struct Slots<T> {
    press: Option<Armed<T>>,
    refresh: Option<Armed<T>>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            press: None,
            refresh: None,
        }
    }
}

impl<T> Slots<T> {
    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<Armed<T>> {
        match kind {
            TimerKind::Press => &mut self.press,
            TimerKind::Refresh => &mut self.refresh,
        }
    }

    fn slot(&self, kind: TimerKind) -> &Option<Armed<T>> {
        match kind {
            TimerKind::Press => &self.press,
            TimerKind::Refresh => &self.refresh,
        }
    }

    fn is_empty(&self) -> bool {
        self.press.is_none() && self.refresh.is_none()
    }
}

/// Maps each button instance to its pending press and refresh timers.
///
/// At most one timer per kind exists for an instance; every operation is
/// idempotent, so callers never need to check state first.
pub struct InstanceRegistry<T: TimerHandle> {
    entries: HashMap<InstanceId, Slots<T>>,
    next_serial: u64,
}

impl<T: TimerHandle> Default for InstanceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimerHandle> InstanceRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_serial: 0,
        }
    }

    /// Allocate the key for a timer about to be scheduled.
    pub fn key(&mut self, instance: &InstanceId, kind: TimerKind) -> TimerKey {
        self.next_serial += 1;
        TimerKey {
            instance: instance.clone(),
            kind,
            serial: self.next_serial,
        }
    }

    /// Store `timer` under `key`, cancelling whatever was armed for that instance and kind.
    pub fn arm(&mut self, key: TimerKey, timer: T) {
        let slots = self.entries.entry(key.instance).or_default();
        let previous = slots.slot_mut(key.kind).replace(Armed {
            serial: key.serial,
            timer,
        });
        if let Some(previous) = previous {
            previous.timer.cancel();
        }
    }

    /// Cancel and remove the timer of `kind`. Returns whether one was armed.
    pub fn disarm(&mut self, instance: &InstanceId, kind: TimerKind) -> bool {
        let Some(slots) = self.entries.get_mut(instance) else {
            return false;
        };
        let removed = slots.slot_mut(kind).take();
        if slots.is_empty() {
            self.entries.remove(instance);
        }
        match removed {
            Some(armed) => {
                armed.timer.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel both timers and forget the instance.
    pub fn disarm_all(&mut self, instance: &InstanceId) {
        if let Some(slots) = self.entries.remove(instance) {
            for armed in [slots.press, slots.refresh].into_iter().flatten() {
                armed.timer.cancel();
            }
        }
    }

    /// Consume a timer that has just fired. Returns false when `key` is no
    /// longer the armed timer (it was replaced or disarmed meanwhile).
    pub fn fired(&mut self, key: &TimerKey) -> bool {
        let Some(slots) = self.entries.get_mut(&key.instance) else {
            return false;
        };
        let slot = slots.slot_mut(key.kind);
        let current = slot.as_ref().map(|armed| armed.serial) == Some(key.serial);
        if current {
            // Already fired, so there is nothing left to cancel.
            slot.take();
            if slots.is_empty() {
                self.entries.remove(&key.instance);
            }
        }
        current
    }

    pub fn is_armed(&self, instance: &InstanceId, kind: TimerKind) -> bool {
        self.entries
            .get(instance)
            .map(|slots| slots.slot(kind).is_some())
            .unwrap_or(false)
    }

    /// Total timers of `kind` armed across all instances.
    pub fn armed(&self, kind: TimerKind) -> usize {
        self.entries
            .values()
            .filter(|slots| slots.slot(kind).is_some())
            .count()
    }

    pub fn contains(&self, instance: &InstanceId) -> bool {
        self.entries.contains_key(instance)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct TestTimer {
        serial: u64,
        cancelled: Rc<RefCell<Vec<u64>>>,
    }

    impl TimerHandle for TestTimer {
        fn cancel(self) {
            self.cancelled.borrow_mut().push(self.serial);
        }
    }

    fn arm(
        registry: &mut InstanceRegistry<TestTimer>,
        cancelled: &Rc<RefCell<Vec<u64>>>,
        instance: &InstanceId,
        kind: TimerKind,
    ) -> TimerKey {
        let key = registry.key(instance, kind);
        registry.arm(
            key.clone(),
            TestTimer {
                serial: key.serial,
                cancelled: cancelled.clone(),
            },
        );
        key
    }

    #[test]
    fn arming_twice_keeps_one_timer() {
        let cancelled = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InstanceRegistry::new();
        let id = InstanceId::new("a");
        let first = arm(&mut registry, &cancelled, &id, TimerKind::Refresh);
        let second = arm(&mut registry, &cancelled, &id, TimerKind::Refresh);
        assert_eq!(registry.armed(TimerKind::Refresh), 1);
        assert_eq!(*cancelled.borrow(), vec![first.serial]);
        assert!(!registry.fired(&first), "replaced key must be stale");
        assert!(registry.fired(&second));
        assert!(registry.is_empty());
    }

    #[test]
    fn kinds_and_instances_are_independent() {
        let cancelled = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InstanceRegistry::new();
        let a = InstanceId::new("a");
        let b = InstanceId::new("b");
        arm(&mut registry, &cancelled, &a, TimerKind::Press);
        arm(&mut registry, &cancelled, &a, TimerKind::Refresh);
        arm(&mut registry, &cancelled, &b, TimerKind::Refresh);
        assert!(registry.disarm(&a, TimerKind::Press));
        assert!(registry.is_armed(&a, TimerKind::Refresh));
        assert!(registry.is_armed(&b, TimerKind::Refresh));
        assert_eq!(registry.armed(TimerKind::Refresh), 2);
        assert_eq!(cancelled.borrow().len(), 1);
    }

    #[test]
    fn disarm_is_idempotent() {
        let cancelled = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InstanceRegistry::new();
        let id = InstanceId::new("a");
        arm(&mut registry, &cancelled, &id, TimerKind::Press);
        assert!(registry.disarm(&id, TimerKind::Press));
        assert!(!registry.disarm(&id, TimerKind::Press));
        assert!(!registry.disarm(&InstanceId::new("zz"), TimerKind::Refresh));
        registry.disarm_all(&id);
        registry.disarm_all(&id);
        assert_eq!(cancelled.borrow().len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn disarm_all_cancels_both_kinds() {
        let cancelled = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InstanceRegistry::new();
        let id = InstanceId::new("a");
        arm(&mut registry, &cancelled, &id, TimerKind::Press);
        arm(&mut registry, &cancelled, &id, TimerKind::Refresh);
        registry.disarm_all(&id);
        assert_eq!(cancelled.borrow().len(), 2);
        assert!(!registry.contains(&id));
    }

    #[test]
    fn fired_does_not_cancel() {
        let cancelled = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InstanceRegistry::new();
        let id = InstanceId::new("a");
        let key = arm(&mut registry, &cancelled, &id, TimerKind::Press);
        assert!(registry.fired(&key));
        assert!(!registry.fired(&key));
        assert!(cancelled.borrow().is_empty());
    }
}
