//! Implements `DocStore` with in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that
//! the whole app can run, top-to-bottom, without a remote document backend.

use crate::store::{DocStore, TallyFeed};
use crate::vote::{TallyCounts, UserVoteRecord, VoteKind};
use crate::Result;
use anyhow::bail;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use tokio::sync::watch;

/// Process-wide store state, keyed by project id so that concurrently running
/// tests get isolated backends.
static REGISTRY: OnceLock<Mutex<HashMap<String, ProjectState>>> = OnceLock::new();

struct ProjectState {
    user_votes: HashMap<String, UserVoteRecord>,
    tally: Option<TallyCounts>,
    tx: watch::Sender<TallyCounts>,
    fail_next_increment: bool,
}

impl Default for ProjectState {
    fn default() -> Self {
        let (tx, _) = watch::channel(TallyCounts::default());
        Self {
            user_votes: HashMap::new(),
            tally: None,
            tx,
            fail_next_increment: false,
        }
    }
}

fn with_state<R>(project_id: &str, f: impl FnOnce(&mut ProjectState) -> R) -> R {
    let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = registry.lock().unwrap_or_else(|e| e.into_inner());
    f(map.entry(project_id.to_string()).or_default())
}

/// An implementation of `DocStore` that holds all documents in memory. Two
/// instances created with the same project id share state, which is what lets
/// tests exercise the multi-viewer behavior.
pub(crate) struct TestStore {
    project_id: String,
}

impl TestStore {
    pub(crate) fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }

    /// Makes the next `increment_tally` call fail, for exercising the
    /// partial-write path of the vote state machine.
    pub(crate) fn fail_next_increment(&self) {
        with_state(&self.project_id, |state| state.fail_next_increment = true);
    }

    /// Current counter contents, bypassing the trait. Test convenience.
    pub(crate) fn tally_counts(&self) -> Option<TallyCounts> {
        with_state(&self.project_id, |state| state.tally.clone())
    }

    /// Drops all documents for this project.
    pub(crate) fn clear(&self) {
        with_state(&self.project_id, |state| {
            state.user_votes.clear();
            state.tally = None;
            state.fail_next_increment = false;
        });
    }
}

#[async_trait::async_trait]
impl DocStore for TestStore {
    async fn user_vote(&mut self, uid: &str) -> Result<Option<UserVoteRecord>> {
        Ok(with_state(&self.project_id, |state| {
            state.user_votes.get(uid).cloned()
        }))
    }

    async fn put_user_vote(&mut self, uid: &str, record: &UserVoteRecord) -> Result<()> {
        with_state(&self.project_id, |state| {
            state.user_votes.insert(uid.to_string(), record.clone());
        });
        Ok(())
    }

    async fn tally(&mut self) -> Result<Option<TallyCounts>> {
        Ok(with_state(&self.project_id, |state| state.tally.clone()))
    }

    async fn increment_tally(&mut self, kind: VoteKind) -> Result<()> {
        let updated = with_state(&self.project_id, |state| {
            if state.fail_next_increment {
                state.fail_next_increment = false;
                return None;
            }
            let counts = state.tally.get_or_insert_with(TallyCounts::default);
            match kind {
                VoteKind::Support => counts.support += 1,
                VoteKind::Against => counts.against += 1,
            }
            let counts = counts.clone();
            state.tx.send_replace(counts.clone());
            Some(counts)
        });
        match updated {
            Some(_) => Ok(()),
            None => bail!("Injected counter write failure"),
        }
    }

    async fn subscribe_tally(&mut self) -> Result<TallyFeed> {
        let rx = with_state(&self.project_id, |state| state.tx.subscribe());
        Ok(TallyFeed::new(rx, None))
    }
}
