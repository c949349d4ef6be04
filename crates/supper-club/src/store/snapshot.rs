use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{InMemoryRecordStore, InviteToken, RecordStore, StoreError};
use crate::domain::{Criterion, RatingId, RatingRecord, Restaurant, User};

/// JSON export of a whole club, used to seed the in-memory store and to run
/// offline reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub ratings: Vec<RatingRecord>,
    #[serde(default)]
    pub invites: Vec<InviteToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_leaderboard: Option<bool>,
}

impl SnapshotFile {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotFileError> {
        serde_json::from_reader(reader).map_err(SnapshotFileError::Parse)
    }

    pub fn from_path(path: &Path) -> Result<Self, SnapshotFileError> {
        let file = File::open(path).map_err(|source| SnapshotFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Seeds a store, rejecting ratings the store itself would refuse: a
    /// repeated id or a second member rating for the same restaurant.
    pub fn into_store(self) -> Result<InMemoryRecordStore, SnapshotFileError> {
        let store = InMemoryRecordStore::new()
            .with_restaurants(self.restaurants)
            .with_criteria(self.criteria)
            .with_users(self.users)
            .with_invites(self.invites);

        for record in self.ratings {
            let id = record.id().clone();
            store
                .insert_rating(record)
                .map_err(|source| SnapshotFileError::Rating { id, source })?;
        }

        Ok(match self.show_leaderboard {
            Some(visible) => store.with_visibility(visible),
            None => store,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotFileError {
    #[error("unable to read snapshot {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("snapshot rating {id} rejected: {source}")]
    Rating {
        id: RatingId,
        #[source]
        source: StoreError,
    },
}
