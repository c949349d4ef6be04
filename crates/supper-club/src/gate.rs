use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::store::{RecordStore, StoreError};

/// Whether the public leaderboard may be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub const fn from_flag(show_leaderboard: bool) -> Self {
        if show_leaderboard {
            Self::Public
        } else {
            Self::Private
        }
    }

    pub const fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
        }
    }
}

/// Admin switch over the store's `showLeaderboard` flag.
pub struct VisibilityGate<S> {
    store: Arc<S>,
}

impl<S> VisibilityGate<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn visibility(&self) -> Result<Visibility, StoreError> {
        self.store.visibility_flag().map(Visibility::from_flag)
    }

    pub fn set(&self, visible: bool) -> Result<Visibility, StoreError> {
        self.store.set_visibility_flag(visible)?;
        let visibility = Visibility::from_flag(visible);
        info!(visibility = visibility.label(), "leaderboard visibility updated");
        Ok(visibility)
    }

    pub fn toggle(&self) -> Result<Visibility, StoreError> {
        let current = self.store.visibility_flag()?;
        self.set(!current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;

    #[test]
    fn starts_private_and_toggles() {
        let gate = VisibilityGate::new(Arc::new(InMemoryRecordStore::new()));
        assert_eq!(gate.visibility().expect("reads"), Visibility::Private);
        assert_eq!(gate.toggle().expect("toggles"), Visibility::Public);
        assert_eq!(gate.toggle().expect("toggles"), Visibility::Private);
        assert_eq!(gate.set(true).expect("sets"), Visibility::Public);
        assert!(gate.visibility().expect("reads").is_public());
    }
}
