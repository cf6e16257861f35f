use anyhow::bail;
use clap::{Parser, Subcommand};
use flakeid::{DEFAULT_EPOCH, Layout};

/// Command line and environment configuration for the `flakeid` binary.
///
/// The layout options must match across every process that generates or
/// decodes the same ids. They are usually fixed once in the environment (or a
/// `.env` file) rather than passed on each invocation.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "flakeid",
    version,
    about = "Generate and decode Snowflake-style 64-bit IDs"
)]
pub struct CliArgs {
    /// Worker id encoded into every generated ID.
    ///
    /// Must be unique among all processes generating IDs concurrently with
    /// the same layout.
    ///
    /// Environment variable: `FLAKEID_WORKER_ID`
    #[arg(
        long,
        env = "FLAKEID_WORKER_ID",
        default_value_t = 0,
        global = true,
        allow_negative_numbers = true
    )]
    pub worker_id: i64,

    /// Custom epoch in milliseconds since the Unix epoch.
    ///
    /// Environment variable: `FLAKEID_EPOCH_MS`
    #[arg(long, env = "FLAKEID_EPOCH_MS", default_value_t = DEFAULT_EPOCH, global = true)]
    pub epoch_ms: i64,

    /// Bits reserved for the worker id.
    ///
    /// Environment variable: `FLAKEID_WORKER_ID_BITS`
    #[arg(long, env = "FLAKEID_WORKER_ID_BITS", default_value_t = 10, global = true)]
    pub worker_id_bits: u8,

    /// Bits reserved for the per-millisecond sequence.
    ///
    /// Environment variable: `FLAKEID_SEQUENCE_BITS`
    #[arg(long, env = "FLAKEID_SEQUENCE_BITS", default_value_t = 12, global = true)]
    pub sequence_bits: u8,

    /// Print JSON instead of plain text.
    #[arg(long, default_value_t = false, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate new IDs, one per line.
    Generate {
        /// Number of IDs to generate.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u64,

        /// Use a clock that ignores system time adjustments after startup.
        #[arg(long, default_value_t = false)]
        monotonic: bool,

        /// How many times to retry after the clock moved backwards before
        /// giving up.
        #[arg(long, default_value_t = 3)]
        max_retries: u32,
    },
    /// Decompose IDs into timestamp, worker id and sequence.
    Parse {
        /// IDs to decode.
        #[arg(required = true, allow_negative_numbers = true)]
        ids: Vec<i64>,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub worker_id: i64,
    pub layout: Layout,
    pub json: bool,
    pub command: Command,
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let layout = Layout::new(args.epoch_ms, args.worker_id_bits, args.sequence_bits)?;

        if let Command::Generate { count, .. } = args.command {
            if !layout.is_valid_worker_id(args.worker_id) {
                bail!(
                    "FLAKEID_WORKER_ID ({}) is outside the worker id space of the layout (0..={})",
                    args.worker_id,
                    layout.max_worker_id()
                );
            }
            if count == 0 {
                bail!("--count must be greater than 0");
            }
        }

        Ok(Self {
            worker_id: args.worker_id,
            layout,
            json: args.json,
            command: args.command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> anyhow::Result<Config> {
        let args = CliArgs::try_parse_from(std::iter::once("flakeid").chain(args.iter().copied()))?;
        Config::try_from(args)
    }

    #[test]
    fn defaults_to_default_layout() {
        let config = config(&["generate"]).unwrap();
        assert_eq!(config.layout, Layout::DEFAULT);
        assert_eq!(config.worker_id, 0);
        assert!(!config.json);
        assert_eq!(
            config.command,
            Command::Generate {
                count: 1,
                monotonic: false,
                max_retries: 3
            }
        );
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let config = config(&["generate", "-n", "5", "--worker-id", "7", "--json"]).unwrap();
        assert_eq!(config.worker_id, 7);
        assert!(config.json);
        assert!(matches!(config.command, Command::Generate { count: 5, .. }));
    }

    #[test]
    fn rejects_worker_id_outside_layout() {
        let err = config(&["--worker-id", "1024", "generate"]).unwrap_err();
        assert!(err.to_string().contains("0..=1023"));

        assert!(config(&["--worker-id", "-1", "generate"]).is_err());
        assert!(config(&["--worker-id-bits", "4", "--worker-id", "15", "generate"]).is_ok());
        assert!(config(&["--worker-id-bits", "4", "--worker-id", "16", "generate"]).is_err());
    }

    #[test]
    fn rejects_invalid_layout() {
        let err = config(&["--worker-id-bits", "40", "--sequence-bits", "30", "generate"])
            .unwrap_err();
        assert!(err.to_string().contains("invalid layout"));
    }

    #[test]
    fn rejects_zero_count() {
        assert!(config(&["generate", "--count", "0"]).is_err());
    }

    #[test]
    fn parse_accepts_negative_ids() {
        let parsed = config(&["parse", "-1", "42"]).unwrap();
        assert_eq!(parsed.command, Command::Parse { ids: vec![-1, 42] });
        assert!(config(&["parse"]).is_err());
    }

    #[test]
    fn parse_ignores_worker_id() {
        let parsed = config(&["--worker-id", "5000", "parse", "1"]).unwrap();
        assert_eq!(parsed.command, Command::Parse { ids: vec![1] });
        assert!(config(&["--worker-id", "5000", "generate"]).is_err());
    }
}
