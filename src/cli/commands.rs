//! Command definitions for the breather CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::settings::{SettingsPatch, NOTICE_SECONDS_RANGE, REST_SECONDS_RANGE, WORK_SECONDS_RANGE};

// ============================================================================
// CLI Structure
// ============================================================================

/// breather - work/rest interval timer
#[derive(Parser, Debug)]
#[command(
    name = "breather",
    version,
    about = "Work/rest interval timer that reminds you to look away from the screen",
    long_about = "Alternates a working interval with a short resting interval.\n\
                  The timer runs in a background daemon; this CLI controls it over a Unix socket.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Daemon socket path (defaults to ~/.breather/breather.sock)
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a working phase
    Start,

    /// Start a resting phase now
    Rest,

    /// Pause the current phase
    Pause,

    /// Resume the paused phase
    Resume,

    /// End the current phase immediately
    Skip {
        /// Only skip if this phase (the `#N` shown by status) is still running
        #[arg(short, long, value_name = "N")]
        generation: Option<u64>,
    },

    /// Stop the timer and return to idle
    Reset,

    /// Show current timer status
    Status {
        /// Keep refreshing once per second
        #[arg(short, long)]
        watch: bool,
    },

    /// Show current settings
    Settings,

    /// Change settings (applied from the next phase)
    Configure(ConfigureArgs),

    /// Run the timer daemon in the foreground
    Daemon,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Configure Command Arguments
// ============================================================================

/// Arguments for the configure command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigureArgs {
    /// Working phase length in minutes (1-240, 0 keeps the current value)
    #[arg(short, long, value_parser = minutes_parser(WORK_SECONDS_RANGE))]
    pub work: Option<u32>,

    /// Resting phase length in seconds (1-3600, 0 keeps the current value)
    #[arg(short, long, value_parser = seconds_parser(REST_SECONDS_RANGE))]
    pub rest: Option<u32>,

    /// Start a new working phase after each rest
    #[arg(short, long)]
    pub cycle: Option<bool>,

    /// Notify before the rest starts
    #[arg(long)]
    pub notify_before: Option<bool>,

    /// How many seconds before the rest the notice is sent (0 keeps the current value)
    #[arg(long, value_parser = seconds_parser(NOTICE_SECONDS_RANGE))]
    pub notice: Option<u32>,

    /// Send notifications at all
    #[arg(long)]
    pub notifications: Option<bool>,

    /// Allow skipping the rest (false enables strict mode)
    #[arg(long)]
    pub skip_allowed: Option<bool>,

    /// Message shown when the rest starts
    #[arg(long, value_parser = validate_prompt)]
    pub rest_prompt: Option<String>,

    /// Message shown when the rest ends
    #[arg(long, value_parser = validate_prompt)]
    pub rest_end_prompt: Option<String>,
}

impl ConfigureArgs {
    /// Converts the arguments into a settings patch.
    pub fn to_patch(&self) -> SettingsPatch {
        SettingsPatch {
            work_seconds: self.work.map(|minutes| minutes * 60),
            rest_seconds: self.rest,
            cycle_enabled: self.cycle,
            notify_before_rest: self.notify_before,
            notice_seconds: self.notice,
            notifications_enabled: self.notifications,
            skip_allowed: self.skip_allowed,
            rest_prompt: self.rest_prompt.clone(),
            rest_end_prompt: self.rest_end_prompt.clone(),
        }
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

// Durations accept 0 like the daemon does: a zero keeps the previous value.

fn seconds_parser((_, max): (u32, u32)) -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(0..=i64::from(max))
}

fn minutes_parser((_, max): (u32, u32)) -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(0..=i64::from(max / 60))
}

/// Validates a notification prompt.
///
/// - Must not be empty
/// - Must not exceed 200 characters
fn validate_prompt(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("prompt cannot be empty".to_string());
    }
    if s.chars().count() > 200 {
        return Err("prompt must be at most 200 characters".to_string());
    }
    Ok(s.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["breather"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
            assert!(cli.socket.is_none());
        }

        #[test]
        fn test_parse_verbose_flag() {
            let cli = Cli::parse_from(["breather", "-v", "status"]);
            assert!(cli.verbose);
        }

        #[test]
        fn test_parse_socket_flag() {
            let cli = Cli::parse_from(["breather", "start", "--socket", "/tmp/b.sock"]);
            assert_eq!(cli.socket, Some(PathBuf::from("/tmp/b.sock")));
            assert!(matches!(cli.command, Some(Commands::Start)));
        }

        #[test]
        fn test_parse_simple_commands() {
            let cases = [
                ("rest", "Rest"),
                ("pause", "Pause"),
                ("resume", "Resume"),
                ("reset", "Reset"),
                ("settings", "Settings"),
                ("daemon", "Daemon"),
            ];
            for (arg, expected) in cases {
                let cli = Cli::parse_from(["breather", arg]);
                assert_eq!(format!("{:?}", cli.command.unwrap()), expected);
            }
        }

        #[test]
        fn test_parse_skip_generation() {
            let cli = Cli::parse_from(["breather", "skip"]);
            assert!(matches!(cli.command, Some(Commands::Skip { generation: None })));

            let cli = Cli::parse_from(["breather", "skip", "--generation", "7"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Skip {
                    generation: Some(7)
                })
            ));

            assert!(Cli::try_parse_from(["breather", "skip", "-g", "x"]).is_err());
        }

        #[test]
        fn test_parse_status_watch() {
            let cli = Cli::parse_from(["breather", "status"]);
            assert!(matches!(cli.command, Some(Commands::Status { watch: false })));

            let cli = Cli::parse_from(["breather", "status", "--watch"]);
            assert!(matches!(cli.command, Some(Commands::Status { watch: true })));
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["breather", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }

        #[test]
        fn test_unknown_command_rejected() {
            assert!(Cli::try_parse_from(["breather", "stop"]).is_err());
        }
    }

    mod configure_tests {
        use super::*;

        fn parse(args: &[&str]) -> Result<ConfigureArgs, clap::Error> {
            let mut argv = vec!["breather", "configure"];
            argv.extend_from_slice(args);
            match Cli::try_parse_from(argv)?.command {
                Some(Commands::Configure(args)) => Ok(args),
                other => panic!("Expected Configure command, got {:?}", other),
            }
        }

        #[test]
        fn test_configure_to_patch() {
            let args = parse(&["--work", "25", "--rest", "30", "--cycle", "true"]).unwrap();
            let patch = args.to_patch();

            assert_eq!(patch.work_seconds, Some(1500));
            assert_eq!(patch.rest_seconds, Some(30));
            assert_eq!(patch.cycle_enabled, Some(true));
            assert_eq!(patch.skip_allowed, None);
        }

        #[test]
        fn test_configure_empty_patch() {
            let args = parse(&[]).unwrap();
            assert!(args.to_patch().is_empty());
        }

        #[test]
        fn test_configure_strict_mode_and_prompts() {
            let args = parse(&[
                "--skip-allowed",
                "false",
                "--rest-prompt",
                "Stretch your legs",
            ])
            .unwrap();
            let patch = args.to_patch();

            assert_eq!(patch.skip_allowed, Some(false));
            assert_eq!(patch.rest_prompt, Some("Stretch your legs".to_string()));
        }

        #[test]
        fn test_configure_out_of_range() {
            assert!(parse(&["--work", "241"]).is_err());
            assert!(parse(&["--rest", "3601"]).is_err());
            assert!(parse(&["--notice", "3601"]).is_err());
            assert!(parse(&["--rest", "-1"]).is_err());
        }

        #[test]
        fn test_configure_zero_is_passed_through() {
            let patch = parse(&["--work", "0", "--rest", "0", "--notice", "0"])
                .unwrap()
                .to_patch();

            assert_eq!(patch.work_seconds, Some(0));
            assert_eq!(patch.rest_seconds, Some(0));
            assert_eq!(patch.notice_seconds, Some(0));
        }

        #[test]
        fn test_configure_invalid_bool() {
            assert!(parse(&["--cycle", "maybe"]).is_err());
        }

        #[test]
        fn test_validate_prompt() {
            assert!(validate_prompt("Look away").is_ok());
            assert!(validate_prompt("   ").is_err());
            assert!(validate_prompt(&"a".repeat(201)).is_err());
        }
    }
}
