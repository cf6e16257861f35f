//! Log output for the `flakeid` binary.
//!
//! Events go to stderr through `tracing_subscriber::fmt` so stdout carries
//! only IDs. The level is read from `RUST_LOG` and defaults to `warn`, which
//! still surfaces clock regressions reported by the generator.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()?;

    Ok(())
}
