use anyhow::{Context, Result};
use metastore_storage::RecordStorage;

/// Print every record id the configured storage can enumerate.
pub fn run_list(storage: &dyn RecordStorage) -> Result<()> {
    let ids = storage
        .record_ids()
        .with_context(|| format!("Failed to list records in '{}'", storage.instance_id()))?;

    for id in &ids {
        println!("{}", id);
    }
    tracing::info!("{} records in '{}'", ids.len(), storage.instance_id());
    Ok(())
}
