use super::{ButtonPoller, Fetcher, PollOutcome, Scheduler, TimerKind};
use crate::{
    host::Host,
    settings::{ButtonConfig, InstanceId},
    Result,
};

/// Where an instance is in the press state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressPhase {
    Idle,
    /// Down, and the long-press timer has not fired yet.
    Pressed,
}

/// How a key release was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressRelease {
    /// Released inside the debounce window; the long-press action was suppressed.
    Short,
    /// Nothing pending: the long press already fired, or there was no press.
    Ignored,
}

impl<H, S, F> ButtonPoller<H, S, F>
where
    H: Host,
    S: Scheduler,
    F: Fetcher,
{
    /// Key went down: arm the long-press timer and poll right away.
    pub fn press_down(
        &mut self,
        instance: &InstanceId,
        settings: ButtonConfig,
    ) -> Result<PollOutcome> {
        self.upsert(instance, settings);
        let long_press = self.timings.long_press;
        self.arm(instance, TimerKind::Press, long_press)?;
        self.poll(instance)
    }

    /// Key came up. Cancels a pending long press; never polls again.
    pub fn press_up(&mut self, instance: &InstanceId) -> PressRelease {
        if self.registry.disarm(instance, TimerKind::Press) {
            PressRelease::Short
        } else {
            PressRelease::Ignored
        }
    }

    pub fn press_phase(&self, instance: &InstanceId) -> PressPhase {
        if self.registry.is_armed(instance, TimerKind::Press) {
            PressPhase::Pressed
        } else {
            PressPhase::Idle
        }
    }

    /// The key was held past the debounce window: open the pipeline's console page.
    pub(super) fn long_press(&mut self, instance: &InstanceId) -> Result<()> {
        let url = self
            .instances
            .get(instance)
            .and_then(|state| state.config.console_url());
        match url {
            Some(url) => {
                log::info!("{instance}: long press, opening {url}");
                self.host.open_url(&url)
            }
            None => {
                log::warn!("{instance}: long press ignored, region or pipeline name missing");
                Ok(())
            }
        }
    }
}
