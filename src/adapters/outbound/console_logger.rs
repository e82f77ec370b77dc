use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Forwards domain log lines to `tracing`; the subscriber installed by the binary
/// decides where they end up.
struct TracingBridge {
    mount: String,
}

impl DomainLogger for TracingBridge {
    fn debug(&self, msg: &str) { tracing::debug!(mount = %self.mount, "{}", msg); }
    fn info(&self, msg: &str) { tracing::info!(mount = %self.mount, "{}", msg); }
    fn warn(&self, msg: &str) { tracing::warn!(mount = %self.mount, "{}", msg); }
    fn error(&self, msg: &str) { tracing::error!(mount = %self.mount, "{}", msg); }
}

/// Initialize a console-backed DomainLogger tagged with the mount name.
pub fn init_console_logger(mount: &str) -> Arc<dyn DomainLogger> {
    Arc::new(TracingBridge { mount: mount.to_string() })
}
