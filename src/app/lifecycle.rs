use calloop::LoopSignal;

use crate::{Error, Result};

/// Install a ctrl-c handler that stops the event loop instead of exiting immediately.
pub(super) fn install_shutdown_handler(signal: LoopSignal) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("interrupt received, stopping");
        signal.stop();
        signal.wakeup();
    })
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
}
