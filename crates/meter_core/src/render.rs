use std::sync::Arc;

/// Where the renderer draws its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSink {
    /// Standard error, the default so bars survive stdout redirection.
    #[default]
    Stderr,
    Stdout,
}

/// Factory for per-meter render handles.
///
/// Core defines this trait; the app implements it with `indicatif`.
/// Tests use [`SilentRenderer`] (no-op).
pub trait MeterRenderer: Send + Sync {
    /// Create a meter line. `display_offset` is the fixed slot the line
    /// occupies in the output; 0 is reserved for the aggregate meter.
    fn create(
        &self,
        total_steps: u64,
        description: &str,
        sink: OutputSink,
        display_offset: usize,
    ) -> Arc<dyn MeterHandle>;
}

/// Handle for a single meter line.
pub trait MeterHandle: Send + Sync {
    /// Advance by `amount` steps and refresh the auxiliary label.
    /// `amount` may be 0 to re-render at the current value.
    fn advance(&self, amount: u64, label: &str);
    /// Force the meter to its terminal/100% state, whatever its position.
    fn force_complete(&self, label: &str);
}

/// No-op renderer for tests and non-interactive use.
pub struct SilentRenderer;

impl MeterRenderer for SilentRenderer {
    fn create(
        &self,
        _total_steps: u64,
        _description: &str,
        _sink: OutputSink,
        _display_offset: usize,
    ) -> Arc<dyn MeterHandle> {
        Arc::new(SilentHandle)
    }
}

struct SilentHandle;

impl MeterHandle for SilentHandle {
    fn advance(&self, _amount: u64, _label: &str) {}
    fn force_complete(&self, _label: &str) {}
}
