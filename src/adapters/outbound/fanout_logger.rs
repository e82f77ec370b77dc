use crate::domains::logger::{DomainLogger, DynLogger};
use std::sync::Arc;

/// Forwards every line to each attached sink in order.
pub struct FanoutLogger {
    sinks: Vec<DynLogger>,
}

impl FanoutLogger {
    pub fn new(sinks: Vec<DynLogger>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: DynLogger) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl DomainLogger for FanoutLogger {
    fn debug(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.debug(msg));
    }

    fn info(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.info(msg));
    }

    fn warn(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.warn(msg));
    }

    fn error(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.error(msg));
    }
}

struct NoOp;

impl DomainLogger for NoOp {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

/// No-op logger useful as default in unit tests
pub fn init_noop_logger() -> DynLogger {
    Arc::new(NoOp {})
}

/// Console sink, plus a fast_log file sink when `file` is given and can be opened.
/// A file that cannot be initialized is reported on the console and skipped.
pub fn init_combined_logger(mount: &str, file: Option<&str>, level: &str) -> DynLogger {
    let console = super::init_console_logger(mount);
    let mut fanout = FanoutLogger::new(vec![console.clone()]);
    if let Some(path) = file {
        match super::file_logger::init_file_logger(path, level) {
            Ok(file_logger) => fanout = fanout.with(file_logger),
            Err(e) => console.warn(&e),
        }
    }
    Arc::new(fanout)
}
