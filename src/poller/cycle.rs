use crc32fast::Hasher;

use super::{ButtonPoller, FetchResult, FetchTicket, Fetcher, PollOutcome, Scheduler, TimerKind};
use crate::{
    display::{render, IconImage, RenderRequest},
    host::Host,
    pipeline::{all_succeeded, errors::classify_error, PipelineRequest},
    settings::InstanceId,
    Result,
};

impl<H, S, F> ButtonPoller<H, S, F>
where
    H: Host,
    S: Scheduler,
    F: Fetcher,
{
    /// Start one poll for `instance`.
    ///
    /// Incomplete settings short-circuit to the placeholder icon. Otherwise a
    /// fetch is dispatched unless one is already outstanding for the instance;
    /// the rest of the cycle happens in [`ButtonPoller::complete`].
    pub fn poll(&mut self, instance: &InstanceId) -> Result<PollOutcome> {
        let Some(state) = self.instances.get_mut(instance) else {
            log::warn!("{instance}: poll for unknown instance");
            return Ok(PollOutcome::Unknown);
        };

        if !state.config.is_complete() {
            log::info!(
                "{instance}: not configured (missing {})",
                state.config.missing_fields().join(", ")
            );
            self.registry.disarm(instance, TimerKind::Refresh);
            self.send_icon(instance, &render(&RenderRequest::Unconfigured))?;
            return Ok(PollOutcome::NotConfigured);
        }

        if let Some(id) = state.in_flight {
            log::debug!("{instance}: fetch #{id} still in flight, dropping poll");
            return Ok(PollOutcome::AlreadyInFlight);
        }

        let request = PipelineRequest {
            pipeline_name: state.config.pipeline_name.trim().to_string(),
            region: state.config.region.trim().to_string(),
            credentials: state.config.credentials(),
        };
        self.next_ticket += 1;
        let ticket = FetchTicket {
            instance: instance.clone(),
            id: self.next_ticket,
        };
        state.in_flight = Some(ticket.id);

        log::debug!(
            "{instance}: fetching {} in {} (#{})",
            request.pipeline_name,
            request.region,
            ticket.id
        );
        match self.fetcher.dispatch(ticket.clone(), request) {
            Ok(()) => Ok(PollOutcome::Dispatched),
            Err(err) => self.complete(ticket, Err(err)),
        }
    }

    /// Finish the poll identified by `ticket` with the fetch result.
    ///
    /// Fetch errors stop refreshing and raise the failure indicator; they are
    /// never returned. Only host errors propagate.
    pub fn complete(&mut self, ticket: FetchTicket, result: FetchResult) -> Result<PollOutcome> {
        let instance = ticket.instance;
        let Some(state) = self.instances.get_mut(&instance) else {
            log::debug!("{instance}: discarding result #{} for gone instance", ticket.id);
            return Ok(PollOutcome::Stale);
        };
        if state.in_flight != Some(ticket.id) {
            log::debug!("{instance}: discarding superseded result #{}", ticket.id);
            return Ok(PollOutcome::Stale);
        }
        state.in_flight = None;

        let statuses = match result {
            Ok(statuses) => statuses,
            Err(err) => {
                let kind = classify_error(&err);
                log::warn!("{instance}: {err}");
                self.registry.disarm(&instance, TimerKind::Refresh);
                self.host.show_failure_indicator(&instance)?;
                return Ok(PollOutcome::Failed(kind));
            }
        };

        let display_name = state.config.display_name.trim().to_string();
        let settled = all_succeeded(&statuses);
        let icon = render(&RenderRequest::Pipeline {
            display_name: &display_name,
            statuses: &statuses,
            refreshing: !settled,
            refreshed_at: (self.clock)(),
        });
        self.send_icon(&instance, &icon)?;

        if settled {
            if self.registry.disarm(&instance, TimerKind::Refresh) {
                log::info!("{instance}: all {} stages succeeded, refresh stopped", statuses.len());
            }
            Ok(PollOutcome::Settled)
        } else {
            let interval = self.timings.refresh_interval;
            self.arm(&instance, TimerKind::Refresh, interval)?;
            log::debug!(
                "{instance}: refreshing in {}",
                humantime::format_duration(interval)
            );
            Ok(PollOutcome::Refreshing)
        }
    }

    /// Push `icon` to the host unless it matches the last one sent for the instance.
    fn send_icon(&mut self, instance: &InstanceId, icon: &IconImage) -> Result<bool> {
        let crc = checksum_icon(icon);
        let unchanged = self
            .instances
            .get(instance)
            .map(|state| state.last_icon_crc == Some(crc))
            .unwrap_or(false);
        if unchanged {
            log::trace!("{instance}: icon unchanged, skipping update");
            return Ok(false);
        }
        self.host.set_icon(instance, icon)?;
        if let Some(state) = self.instances.get_mut(instance) {
            state.last_icon_crc = Some(crc);
        }
        Ok(true)
    }
}

fn checksum_icon(icon: &IconImage) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(icon.to_svg().as_bytes());
    hasher.finalize()
}
