//! The seam to the remote document store.
//!
//! All vote persistence goes through the [`DocStore`] trait so that the whole
//! app can run, top-to-bottom, against either the real document backend or an
//! in-memory store.

mod rest;
mod test_store;

use crate::auth::TokenProvider;
use crate::vote::{TallyCounts, UserVoteRecord, VoteKind};
use crate::{Config, Result};
use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub(crate) use test_store::TestStore;

/// Collection of per-identity vote documents.
pub(crate) const USER_VOTES: &str = "userVotes";
/// Collection holding the singleton counter document.
pub(crate) const VOTES: &str = "votes";
/// Id of the singleton counter document.
pub(crate) const TALLY_DOC: &str = "salesData";

const TEST_MODE_ENV: &str = "SALESPULSE_IN_TEST_MODE";

/// Selects the store implementation. When `SALESPULSE_IN_TEST_MODE` is set and
/// non-zero in length, the in-memory store is used and no network is touched.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    Remote,
    Test,
}

impl Mode {
    pub fn from_env() -> Mode {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Remote,
        }
    }
}

/// The document operations the poll needs: point reads, point writes, an
/// atomic per-field increment, and a live subscription to the counter.
#[async_trait::async_trait]
pub(crate) trait DocStore {
    /// Point read of one identity's vote record.
    async fn user_vote(&mut self, uid: &str) -> Result<Option<UserVoteRecord>>;

    /// Point write of one identity's vote record. Idempotent.
    async fn put_user_vote(&mut self, uid: &str, record: &UserVoteRecord) -> Result<()>;

    /// Point read of the shared counter. `None` when nobody has voted yet.
    async fn tally(&mut self) -> Result<Option<TallyCounts>>;

    /// Adds exactly 1 to the matching bucket using a store-side atomic
    /// increment. When the counter document does not exist yet, it is created
    /// with the chosen bucket at 1 and the other at 0.
    async fn increment_tally(&mut self, kind: VoteKind) -> Result<()>;

    /// Subscribes to counter changes. The feed is released when the returned
    /// handle is dropped or cancelled.
    async fn subscribe_tally(&mut self) -> Result<TallyFeed>;
}

/// Creates the `DocStore` appropriate for `mode`.
pub(crate) async fn store(config: &Config, mode: Mode) -> Result<Box<dyn DocStore + Send>> {
    match mode {
        Mode::Test => Ok(Box::new(TestStore::new(config.project_id()))),
        Mode::Remote => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Ok(Box::new(rest::RestStore::new(config, token_provider)?))
        }
    }
}

/// A live view of the shared counter, backed by a watch channel. Dropping the
/// feed releases the subscription (and stops any delivery task behind it).
pub struct TallyFeed {
    rx: watch::Receiver<TallyCounts>,
    _guard: FeedGuard,
}

impl TallyFeed {
    pub(crate) fn new(rx: watch::Receiver<TallyCounts>, task: Option<JoinHandle<()>>) -> Self {
        Self {
            rx,
            _guard: FeedGuard(task),
        }
    }

    /// The most recently delivered counts.
    pub fn latest(&self) -> TallyCounts {
        self.rx.borrow().clone()
    }

    /// Waits for the next counter change and returns the new counts. Errors
    /// when the feed has been closed by the store side.
    pub async fn changed(&mut self) -> Result<TallyCounts> {
        self.rx
            .changed()
            .await
            .context("The tally subscription has closed")?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Explicitly releases the subscription.
    pub fn cancel(self) {}
}

struct FeedGuard(Option<JoinHandle<()>>);

impl Drop for FeedGuard {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_env() {
        // Runs serially within this test only; restore afterwards.
        let previous = std::env::var(TEST_MODE_ENV).ok();
        std::env::remove_var(TEST_MODE_ENV);
        assert_eq!(Mode::from_env(), Mode::Remote);
        std::env::set_var(TEST_MODE_ENV, "");
        assert_eq!(Mode::from_env(), Mode::Remote);
        std::env::set_var(TEST_MODE_ENV, "1");
        assert_eq!(Mode::from_env(), Mode::Test);
        match previous {
            Some(value) => std::env::set_var(TEST_MODE_ENV, value),
            None => std::env::remove_var(TEST_MODE_ENV),
        }
    }
}
