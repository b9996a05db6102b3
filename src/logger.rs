use std::io::Write;

/// Log sink used by the server and its connections.
///
/// The default forwards to the `tracing` macros so the host application's
/// subscriber decides where lines end up; [`PrintLogger`] is the forced
/// fallback that writes straight to stderr.
pub trait Logger: Send + Sync {
    fn log_info(&self, message: &str);
    fn log_error(&self, message: &str);
    fn log_critical(&self, message: &str);
}

/// Default logger forwarding to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log_info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn log_error(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn log_critical(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Line-buffered stderr logger, used when no tracing subscriber should be
/// involved.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintLogger;

impl PrintLogger {
    fn print(&self, level: &str, message: &str) {
        let stderr = std::io::stderr();
        let mut out = stderr.lock();
        let _ = writeln!(out, "[{level}] {message}");
    }
}

impl Logger for PrintLogger {
    fn log_info(&self, message: &str) {
        self.print("info", message);
    }

    fn log_error(&self, message: &str) {
        self.print("error", message);
    }

    fn log_critical(&self, message: &str) {
        self.print("critical", message);
    }
}

/// Formats the per-connection log lines: `<peer> open connection`,
/// `<peer> request: GET /path`, and so on.
pub fn connection_message(id: &str, event: &str) -> String {
    format!("<{id}> {event}")
}
