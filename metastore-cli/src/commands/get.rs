//! Get command: fetch records by id and print them.

use anyhow::{Context, Result};
use futures::future::join_all;
use metastore_storage::{Record, RecordStorage};
use std::io::Write;
use std::sync::Arc;

/// How fetched records are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetOutput {
    /// Id followed by one `name: value` line per derived field
    Fields,
    /// Stored content, unmodified
    Raw,
    /// One JSON object per record
    Json,
}

/// Fetch every id concurrently on the blocking pool, then print in request order.
///
/// Fails if any id could not be fetched, after printing the ones that could.
pub async fn run_get(
    storage: Arc<dyn RecordStorage>,
    ids: Vec<String>,
    output: GetOutput,
) -> Result<()> {
    let lookups = ids.iter().cloned().map(|id| {
        let storage = Arc::clone(&storage);
        tokio::task::spawn_blocking(move || storage.record(&id))
    });
    let results = join_all(lookups).await;

    let mut failed = 0;
    let mut stdout = std::io::stdout().lock();
    for (id, joined) in ids.iter().zip(results) {
        match joined.context("Lookup task panicked")? {
            Ok(record) => print_record(&mut stdout, &record, output)?,
            Err(e) => {
                eprintln!("{}: {}", id, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} records could not be fetched", failed, ids.len());
    }
    Ok(())
}

fn print_record(out: &mut impl Write, record: &Record, output: GetOutput) -> Result<()> {
    match output {
        GetOutput::Raw => out.write_all(record.content())?,
        GetOutput::Json => {
            let value = serde_json::json!({
                "id": record.id(),
                "size": record.len(),
                "derived": record.derived_fields(),
                "available_from": record.available_from().map(|d| d.to_string()),
            });
            writeln!(out, "{}", value)?;
        }
        GetOutput::Fields => {
            writeln!(out, "{} ({} bytes)", record.id(), record.len())?;
            if record.derived_fields().is_empty() {
                writeln!(out, "  (no derived fields)")?;
            }
            for (name, value) in record.derived_fields() {
                writeln!(out, "  {}: {}", name, value)?;
            }
        }
    }
    Ok(())
}
