use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use supper_club::error::AppError;
use supper_club::import::RatingCsvImporter;
use supper_club::store::{InMemoryRecordStore, RecordStore, SnapshotFile};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Builds the in-memory store from an optional snapshot file, then appends
/// ratings from an optional CSV export. A rating id present in both, or a
/// member rating the snapshot already holds for that restaurant, is an error
/// rather than a silent overwrite.
pub(crate) fn load_store(
    snapshot: Option<&Path>,
    ratings_csv: Option<&Path>,
) -> Result<InMemoryRecordStore, AppError> {
    let store = match snapshot {
        Some(path) => {
            let store = SnapshotFile::from_path(path)?.into_store()?;
            info!(path = %path.display(), "store seeded from snapshot");
            store
        }
        None => InMemoryRecordStore::new(),
    };

    if let Some(path) = ratings_csv {
        let records = RatingCsvImporter::from_path(path)?;
        let imported = records.len();
        for record in records {
            store.insert_rating(record)?;
        }
        info!(path = %path.display(), imported, "ratings imported from csv");
    }

    Ok(store)
}
