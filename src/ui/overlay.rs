//! Status overlay and error reporter
//!
//! The single user-facing failure surface: a banner drawn over the scene,
//! plus a progress readout while the asset streams in. Reporting also goes
//! to the diagnostic log and never panics.

use imgui::Condition;

/// On-screen status state, drawn every frame by the overlay pass
pub struct StatusOverlay {
    banner: Option<String>,
    progress: Option<f32>,
}

impl StatusOverlay {
    pub fn new() -> Self {
        Self {
            banner: None,
            progress: None,
        }
    }

    /// Reports a failure: stores the banner text and logs it
    pub fn report(&mut self, message: &str) {
        log::error!("{}", message);
        self.banner = Some(message.to_string());
    }

    /// The currently displayed failure message, if any
    pub fn message(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Updates the load-progress readout, clamped to [0, 1]
    pub fn set_progress(&mut self, fraction: f32) {
        self.progress = Some(fraction.clamp(0.0, 1.0));
    }

    pub fn clear_progress(&mut self) {
        self.progress = None;
    }

    pub fn progress(&self) -> Option<f32> {
        self.progress
    }

    /// Draws the banner and progress readout
    pub fn draw(&self, ui: &imgui::Ui) {
        if let Some(message) = &self.banner {
            ui.window("status")
                .position([16.0, 16.0], Condition::Always)
                .size([520.0, 0.0], Condition::Always)
                .no_decoration()
                .bg_alpha(0.85)
                .build(|| {
                    ui.text_colored([1.0, 0.35, 0.3, 1.0], message);
                });
        }

        if let Some(fraction) = self.progress {
            ui.window("progress")
                .position([16.0, 64.0], Condition::Always)
                .size([220.0, 0.0], Condition::Always)
                .no_decoration()
                .bg_alpha(0.6)
                .build(|| {
                    ui.text(format!("loading model... {:.0}%", fraction * 100.0));
                });
        }
    }
}

impl Default for StatusOverlay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_stores_the_message() {
        let mut overlay = StatusOverlay::new();
        assert!(overlay.message().is_none());
        overlay.report("asset load failed: decode error");
        assert_eq!(
            overlay.message(),
            Some("asset load failed: decode error")
        );
    }

    #[test]
    fn report_never_panics_on_odd_input() {
        let mut overlay = StatusOverlay::new();
        overlay.report("");
        overlay.report("multi\nline\nmessage");
        overlay.report(&"x".repeat(10_000));
        assert!(overlay.message().is_some());
    }

    #[test]
    fn progress_is_clamped() {
        let mut overlay = StatusOverlay::new();
        overlay.set_progress(1.7);
        assert_eq!(overlay.progress(), Some(1.0));
        overlay.set_progress(-0.2);
        assert_eq!(overlay.progress(), Some(0.0));
        overlay.clear_progress();
        assert!(overlay.progress().is_none());
    }
}
