use log::debug;
use tokio::process::Command;

use crate::error::{MonitorError, Result};

/// Program and leading arguments that open a URL on `target_os`.
fn opener_for_os(target_os: &str) -> Result<(&'static str, &'static [&'static str])> {
    match target_os {
        "macos" => Ok(("open", &[])),
        "linux" => Ok(("xdg-open", &[])),
        "windows" => Ok(("cmd", &["/C", "start", ""])),
        _ => Err(MonitorError::Browser(format!(
            "opening URLs is unsupported on `{target_os}`"
        ))),
    }
}

/// Hands `url` to the platform opener without waiting for it to exit.
pub fn open_url(url: &str) -> Result<()> {
    let (program, prefix_args) = opener_for_os(std::env::consts::OS)?;
    debug!("Opening {url} with {program}");

    Command::new(program)
        .args(prefix_args)
        .arg(url)
        .spawn()
        .map(drop)
        .map_err(|e| MonitorError::Browser(format!("failed to run `{program}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_supported_commands() {
        let (program, args) = opener_for_os("macos").unwrap();
        assert_eq!(program, "open");
        assert!(args.is_empty());

        let (program, args) = opener_for_os("linux").unwrap();
        assert_eq!(program, "xdg-open");
        assert!(args.is_empty());

        let (program, args) = opener_for_os("windows").unwrap();
        assert_eq!(program, "cmd");
        assert_eq!(args, ["/C", "start", ""]);
    }

    #[test]
    fn test_rejects_unsupported_os() {
        let err = opener_for_os("freebsd").unwrap_err();
        assert!(matches!(err, MonitorError::Browser(message) if message.contains("unsupported")));
    }
}
