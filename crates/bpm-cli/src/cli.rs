//! Argument surface of the `bpm` binary

use bpm_pipeline::LogFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bpm",
    version,
    about = "Reparent Blueprint assets onto native classes without losing their defaults",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Configuration file (default: ./bpm.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,

    /// Asset-store directory, overriding the configuration
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) store: Option<PathBuf>,

    /// Where to write the phase report
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) report: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub(crate) log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    /// Record pre-migration defaults into a cache file
    Extract {
        /// Migration plan (.yaml, .yml or .json)
        plan: PathBuf,
        /// Cache file to write
        cache: PathBuf,
    },
    /// Clear, reparent, rename, compile and save every plan entry
    Migrate {
        /// Migration plan
        plan: PathBuf,
    },
    /// Restore cached defaults onto migrated assets
    Apply {
        /// Migration plan
        plan: PathBuf,
        /// Cache file written by `extract`
        cache: PathBuf,
    },
    /// Check migrated assets against the plan
    Verify {
        /// Migration plan
        plan: PathBuf,
    },
    /// Compare two cache files; exits 0 only when they match
    Diff {
        /// First cache file
        left: PathBuf,
        /// Second cache file
        right: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "bpm",
            "apply",
            "plan.yaml",
            "cache.json",
            "--store",
            "store",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::Apply {
                plan: "plan.yaml".into(),
                cache: "cache.json".into()
            }
        );
        assert_eq!(cli.store, Some(PathBuf::from("store")));
        assert_eq!(cli.log_format.map(LogFormat::from), Some(LogFormat::Json));
        assert!(cli.report.is_none());
    }

    #[test]
    fn extract_needs_a_cache_path() {
        assert!(Cli::try_parse_from(["bpm", "extract", "plan.yaml"]).is_err());
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["bpm", "verify", "plan.yaml", "--log-format", "xml"]).is_err());
    }
}
