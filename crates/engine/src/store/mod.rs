//! Persistence of ledger entries.
//!
//! Every operation is scoped to one owner: entries belonging to someone else
//! behave exactly like entries that do not exist.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Entry, EntryPatch, NewEntry, ResultEngine};

mod sql;

pub use sql::{SqlStore, SqlStoreBuilder};

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Owner-scoped CRUD over entries.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Persist `entry` with a fresh id and timestamps.
    async fn create(&self, user_id: &str, entry: NewEntry) -> ResultEngine<Entry>;

    /// Every entry of `user_id`, newest date first.
    async fn get_all(&self, user_id: &str) -> ResultEngine<Vec<Entry>>;

    async fn get(&self, user_id: &str, id: &str) -> ResultEngine<Entry>;

    /// Apply `patch`; `updated_at` is refreshed, `created_at` never moves.
    async fn update(&self, user_id: &str, id: &str, patch: &EntryPatch) -> ResultEngine<()>;

    async fn delete(&self, user_id: &str, id: &str) -> ResultEngine<()>;

    /// Delete all of `ids` or none of them.
    async fn bulk_delete(&self, user_id: &str, ids: &[String]) -> ResultEngine<()>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: u64,
    /// Opaque token from a previous [`Page::next_cursor`].
    pub cursor: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            cursor: None,
        }
    }
}

impl PageRequest {
    pub fn first(limit: u64) -> Self {
        Self {
            limit,
            cursor: None,
        }
    }

    pub fn after(limit: u64, cursor: impl Into<String>) -> Self {
        Self {
            limit,
            cursor: Some(cursor.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}
