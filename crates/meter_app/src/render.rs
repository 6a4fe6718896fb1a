//! indicatif-backed implementation of the core renderer traits.

use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use meter_core::{MeterHandle, MeterRenderer, OutputSink};

pub struct IndicatifRenderer {
    multi: MultiProgress,
}

impl IndicatifRenderer {
    pub fn new(sink: OutputSink) -> Self {
        let target = match sink {
            OutputSink::Stderr => ProgressDrawTarget::stderr(),
            OutputSink::Stdout => ProgressDrawTarget::stdout(),
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
        }
    }
}

impl MeterRenderer for IndicatifRenderer {
    fn create(
        &self,
        total_steps: u64,
        description: &str,
        _sink: OutputSink,
        display_offset: usize,
    ) -> Arc<dyn MeterHandle> {
        // The draw target is fixed when the renderer is built; the per-meter
        // sink argument is accepted for contract parity.
        let style =
            ProgressStyle::with_template("{prefix:>16} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("valid progress template")
                .progress_chars("=>-");
        let bar = ProgressBar::new(total_steps)
            .with_style(style)
            .with_prefix(description.to_string());
        let bar = self.multi.insert(display_offset, bar);
        Arc::new(IndicatifHandle { bar })
    }
}

struct IndicatifHandle {
    bar: ProgressBar,
}

impl MeterHandle for IndicatifHandle {
    fn advance(&self, amount: u64, label: &str) {
        self.bar.inc(amount);
        self.bar.set_message(label.to_string());
    }

    fn force_complete(&self, label: &str) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
        self.bar.finish_with_message(label.to_string());
    }
}
