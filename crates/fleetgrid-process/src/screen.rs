//! GNU screen backed process controller.
//!
//! Workers run inside detached screen sessions named after their instance,
//! so operators can `screen -r <instance>` into any worker for an
//! interactive console.

use std::path::Path;
use std::process::Command;

use tracing::{debug, error};

use crate::ProcessController;

/// Controls workers through detached `screen` sessions.
#[derive(Debug, Default, Clone)]
pub struct ScreenController;

impl ScreenController {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessController for ScreenController {
    fn start(&self, name: &str, argv: &[String], working_dir: &Path) {
        debug!(%name, ?argv, "starting screen session");
        let status = Command::new("screen")
            .args(["-S", name, "-dm"])
            .args(argv)
            .current_dir(working_dir)
            .status();
        if let Err(e) = status {
            error!(%name, error = %e, "failed to start screen session");
        }
    }

    fn stop(&self, name: &str) {
        debug!(%name, "stopping screen session");
        let status = Command::new("screen")
            .args(["-S", name, "-X", "quit"])
            .status();
        if let Err(e) = status {
            error!(%name, error = %e, "failed to stop screen session");
        }
    }

    fn list(&self) -> Vec<String> {
        let output = match Command::new("screen").arg("-ls").output() {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "failed to list screen sessions");
                return Vec::new();
            }
        };
        parse_session_list(&String::from_utf8_lossy(&output.stdout))
    }

    fn attach(&self, name: &str) {
        if let Err(e) = Command::new("screen").args(["-r", name]).status() {
            error!(%name, error = %e, "failed to attach to screen session");
        }
    }
}

/// Parse `screen -ls` output into session names.
///
/// Session lines look like `\t12345.lobby-1\t(Detached)`; the name is the
/// token after the first `.`, up to the next whitespace.
fn parse_session_list(output: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim();
        let Some(dot) = trimmed.find('.') else {
            continue;
        };
        if dot == 0 {
            continue;
        }
        let rest = &trimmed[dot + 1..];
        let name = rest
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typical_screen_ls_output() {
        let output = "There are screens on:\n\
                      \t31337.lobby-1\t(Detached)\n\
                      \t31338.arena-2\t(Attached)\n\
                      2 Sockets in /run/screen/S-root.\n";
        assert_eq!(parse_session_list(output), vec!["lobby-1", "arena-2"]);
    }

    #[test]
    fn skips_lines_without_a_dot() {
        let output = "No Sockets found in /run/screen/S-root\n";
        assert!(parse_session_list(output).is_empty());
    }

    #[test]
    fn skips_lines_starting_with_a_dot() {
        assert!(parse_session_list(".hidden\n").is_empty());
    }

    #[test]
    fn empty_output_yields_no_names() {
        assert!(parse_session_list("").is_empty());
    }

    #[test]
    fn name_ends_at_whitespace() {
        let output = "\t999.lobby-10 (Detached) extra";
        assert_eq!(parse_session_list(output), vec!["lobby-10"]);
    }
}
