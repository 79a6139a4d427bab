use ::log::{Level, LevelFilter, Metadata, Record};
use crossbeam::channel::{Receiver, Sender, unbounded};

/// A single formatted log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// A [`log::Log`](::log::Log) implementation that forwards records over a crossbeam channel.
///
/// Sending never blocks. If the receiver has been dropped the record is discarded.
pub struct ChannelLogger {
    sender: Sender<LogMessage>,
    level: LevelFilter,
}

impl ::log::Log for ChannelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = self.sender.try_send(LogMessage {
                level: record.metadata().level(),
                target: record.target().to_string(),
                message: format!("{}", record.args()),
            });
        }
    }

    fn flush(&self) {}
}

impl ChannelLogger {
    pub fn new(sender: Sender<LogMessage>, level: LevelFilter) -> Self {
        Self { sender, level }
    }

    pub fn with_receiver(level: LevelFilter) -> (Self, Receiver<LogMessage>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender, level), receiver)
    }
}
