//! Log plumbing for hosts that want engine diagnostics delivered as messages rather than printed.
//!
//! The engine itself only talks to the [`log`](::log) facade. A host decides where records go;
//! [`init_channel`] installs a [`ChannelLogger`] so records can be drained from a receiver on
//! whatever thread owns the output.

mod channel;

pub use channel::{ChannelLogger, LogMessage};

use crossbeam::channel::Receiver;

/// Install a [`ChannelLogger`] as the global logger, forwarding records at or above `level`.
///
/// Returns the receiving end of the channel, or the facade's error if a logger was already
/// installed for this process.
pub fn init_channel(
    level: ::log::LevelFilter,
) -> Result<Receiver<LogMessage>, ::log::SetLoggerError> {
    let (logger, receiver) = ChannelLogger::with_receiver(level);
    ::log::set_boxed_logger(Box::new(logger))?;
    ::log::set_max_level(level);
    Ok(receiver)
}
