use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use solu_engine::{Subject, YearCode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "solu",
    about = "Solu - audit question video availability in the JAMB CBT solutions archive",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (overrides the configured default)
    #[arg(short, long, global = true)]
    pub output: Option<OutputFormat>,

    /// Request timeout in seconds, applied to probes and page fetches
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Cache directory
    #[arg(long, global = true, env = "SOLU_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Disable the page and audit cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Verify the archive host's TLS certificates
    #[arg(long, global = true)]
    pub verify_certs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the subjects in the archive
    Subjects,

    /// List the exam years of a subject, most recent first
    Years {
        /// Subject code, e.g. MAT
        subject: Subject,
    },

    /// List every subject with its exam years
    Catalog,

    /// Check which question videos of a subject/year are uploaded
    Audit {
        /// Subject code, e.g. MAT
        subject: Subject,

        /// Year code, e.g. MAT2020
        year: YearCode,

        /// Ignore cached results and probe each question in turn
        #[arg(long)]
        fresh: bool,

        /// Also run a diagnostic probe of question 1
        #[arg(long)]
        test: bool,
    },

    /// Answer a page query string such as `subject=MAT&year=MAT2020&test=1`
    Query {
        /// The query string, with or without a leading `?`
        query: String,
    },

    /// Check whether a single URL exists
    Probe {
        /// The URL to probe
        url: String,

        /// Only accept a 200 response, not redirects
        #[arg(long)]
        strict: bool,
    },

    /// Manage the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Remove every cached page and audit
    Clear,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonCompact => write!(f, "json-compact"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_audit() {
        let args =
            Args::try_parse_from(["solu", "audit", "MAT", "MAT2020", "--fresh", "-o", "json"])
                .unwrap();
        assert_eq!(args.output, Some(OutputFormat::Json));
        match args.command {
            Commands::Audit {
                subject,
                year,
                fresh,
                test,
            } => {
                assert_eq!(subject.as_str(), "MAT");
                assert_eq!(year.as_str(), "MAT2020");
                assert!(fresh);
                assert!(!test);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_codes_rejected_at_parse_time() {
        assert!(Args::try_parse_from(["solu", "years", "math"]).is_err());
        assert!(Args::try_parse_from(["solu", "audit", "MAT", "2020"]).is_err());
    }
}
