use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_red, bright_yellow};

/// Spinner shown while a one-shot refresh runs
pub struct RefreshProgress {
    pb: ProgressBar,
}

impl RefreshProgress {
    pub fn start(project: &str) -> Self {
        let pb = create_spinner(
            bright_yellow(format!("Fetching merge requests for {project}")).to_string(),
        );
        Self { pb }
    }

    pub fn finish(self, merge_requests: usize) {
        self.pb.finish_with_message(
            bright_green(format!("Fetched {merge_requests} merge requests ✓")).to_string(),
        );
        eprintln!();
    }

    pub fn fail(self) {
        self.pb
            .finish_with_message(bright_red("Could not fetch merge requests ✗").to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
