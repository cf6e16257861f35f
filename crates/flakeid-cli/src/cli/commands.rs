use std::{io::Write, thread, time::Duration};

use anyhow::{Context, bail};
use flakeid::{Error, ParsedId, SnowflakeGenerator, SnowflakeId, TimeSource};
use serde::Serialize;

use crate::cli::config::Config;

#[derive(Serialize)]
struct ParseOutput {
    id: SnowflakeId,
    #[serde(flatten)]
    parsed: ParsedId,
}

/// Longest single sleep before retrying after a clock regression.
const MAX_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Writes `count` new ids to `out`.
///
/// A clock regression is retried after sleeping for the reported gap (capped
/// at one second), at most `max_retries` times in a row.
pub fn generate<T, W>(
    config: &Config,
    time: T,
    count: u64,
    max_retries: u32,
    out: &mut W,
) -> anyhow::Result<()>
where
    T: TimeSource,
    W: Write,
{
    let generator = SnowflakeGenerator::with_layout(config.worker_id, config.layout, time)?;
    tracing::debug!(worker_id = config.worker_id, count, "generating ids");

    let mut ids = Vec::new();
    for _ in 0..count {
        let id = next_id_with_retry(&generator, max_retries)?;
        if config.json {
            ids.push(id);
        } else {
            writeln!(out, "{id}")?;
        }
    }

    if config.json {
        serde_json::to_writer(&mut *out, &ids)?;
        writeln!(out)?;
    }
    Ok(())
}

fn next_id_with_retry<T: TimeSource>(
    generator: &SnowflakeGenerator<T>,
    max_retries: u32,
) -> anyhow::Result<SnowflakeId> {
    let mut retries = 0;
    loop {
        match generator.next_id() {
            Ok(id) => return Ok(id),
            Err(Error::ClockMovedBackwards { behind_by_millis }) if retries < max_retries => {
                retries += 1;
                tracing::warn!(behind_by_millis, retries, "clock moved backwards, retrying");
                thread::sleep(retry_wait(behind_by_millis));
            }
            Err(err) => {
                return Err(err).context(format!("failed after {retries} retries"));
            }
        }
    }
}

fn retry_wait(behind_by_millis: i64) -> Duration {
    let millis = u64::try_from(behind_by_millis).unwrap_or(0);
    Duration::from_millis(millis).min(MAX_RETRY_WAIT)
}

/// Writes the decomposition of each id to `out`.
pub fn parse<W: Write>(config: &Config, ids: &[i64], out: &mut W) -> anyhow::Result<()> {
    if ids.is_empty() {
        bail!("no ids given");
    }

    for &raw in ids {
        let parsed = config.layout.parse(raw);
        if config.json {
            let output = ParseOutput {
                id: SnowflakeId::from_raw(raw),
                parsed,
            };
            serde_json::to_writer(&mut *out, &output)?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "{raw}\ttimestamp={} worker_id={} sequence={} time={}",
                parsed.timestamp_millis,
                parsed.worker_id,
                parsed.sequence,
                parsed.time.to_rfc3339()
            )?;
        }
    }
    Ok(())
}
