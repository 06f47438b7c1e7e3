mod dashboard;
mod progress;
mod styling;
mod tables;

pub use dashboard::{print_dashboard, DashboardView};
pub use progress::RefreshProgress;
pub use styling::{dim, magenta_bold};

/// Prints the `mrwatch` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔀 mrwatch"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("GitLab Merge Request Monitor")
    );
}
