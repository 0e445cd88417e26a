//! Engine metadata reset
//!
//! An explicit, idempotent alternative to "re-run setup by reloading the
//! whole session": clears only the engine-owned metadata fields on every
//! record, so a fresh guided setup starts from a clean slate without
//! destroying any host data.

use lore_stores::{LocalStore, list_all};

use crate::Result;

/// Clear the sync metadata block on every record that has one.
///
/// Returns the number of records touched. Running it twice is safe: the
/// second pass finds nothing to clear and returns zero.
pub async fn reset_sync_metadata(store: &dyn LocalStore) -> Result<usize> {
    let mut touched = 0;
    for record in list_all(store).await? {
        if record.metadata.is_empty() {
            continue;
        }
        store.reset_sync_metadata(&record.id).await?;
        touched += 1;
    }
    tracing::info!(touched, "Cleared sync metadata");
    Ok(touched)
}
