//! The reader poll: a per-viewer vote state machine over the shared counter.
//!
//! Each authenticated identity may hold at most one vote record for its
//! lifetime. The shared counter is advanced only by the store's atomic
//! per-field increment, never by read-modify-write.

use crate::auth::Session;
use crate::store::DocStore;
use crate::Result;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The two counter buckets a viewer can vote into.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Support,
    Against,
}

serde_plain::derive_display_from_serialize!(VoteKind);
serde_plain::derive_fromstr_from_deserialize!(VoteKind);

/// The shared two-bucket counter, one document for all viewers.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TallyCounts {
    pub support: i64,
    pub against: i64,
}

impl TallyCounts {
    /// Fraction of supporting votes, or the neutral 0.5 midpoint when nobody
    /// has voted yet. Display default only, never stored.
    pub fn support_fraction(&self) -> f64 {
        let total = self.support + self.against;
        if total == 0 {
            0.5
        } else {
            self.support as f64 / total as f64
        }
    }
}

/// The write-once vote document held per identity.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserVoteRecord {
    pub vote: VoteKind,
    pub timestamp: DateTime<Utc>,
}

/// Viewer-local states. `Voted` is terminal for that identity.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum VoteStage {
    Unauthenticated,
    NoVote,
    Voted(VoteKind),
}

/// Drives one viewer's voting against a [`DocStore`].
pub struct VoteTally {
    store: Box<dyn DocStore + Send>,
    session: Option<Session>,
    stage: VoteStage,
}

impl VoteTally {
    pub(crate) fn new(store: Box<dyn DocStore + Send>) -> Self {
        Self {
            store,
            session: None,
            stage: VoteStage::Unauthenticated,
        }
    }

    pub fn stage(&self) -> VoteStage {
        self.stage
    }

    /// Enters an authenticated state, reading the identity's existing vote
    /// record (if any) to decide between `NoVote` and `Voted`.
    pub async fn resolve_session(&mut self, session: Session) -> Result<()> {
        let existing = self
            .store
            .user_vote(&session.uid)
            .await
            .with_context(|| format!("Failed to read the vote record for {}", session.uid))?;
        self.stage = match existing {
            Some(record) => VoteStage::Voted(record.vote),
            None => VoteStage::NoVote,
        };
        self.session = Some(session);
        Ok(())
    }

    /// Drops back to `Unauthenticated`. A later sign-in under a different
    /// identity starts its own single-vote lifetime.
    pub fn signed_out(&mut self) {
        self.session = None;
        self.stage = VoteStage::Unauthenticated;
    }

    /// Casts this viewer's vote. The vote record write must succeed before the
    /// counter increment is issued; the stage advances to `Voted` only when
    /// both writes succeed, so a failed cast can be retried from `NoVote`.
    ///
    /// When already `Voted` this is a no-op: the counter is incremented at
    /// most once per identity.
    pub async fn cast(&mut self, kind: VoteKind) -> Result<()> {
        match self.stage {
            VoteStage::Unauthenticated => bail!("Cannot vote without a signed-in session"),
            VoteStage::Voted(existing) => {
                debug!("Ignoring repeat vote; this identity already voted {existing}");
                return Ok(());
            }
            VoteStage::NoVote => {}
        }
        let session = self
            .session
            .as_ref()
            .context("No session while in the NoVote state")?;
        let record = UserVoteRecord {
            vote: kind,
            timestamp: Utc::now(),
        };

        // The record's existence is the gate against double voting, so it is
        // confirmed before the counter moves.
        self.store
            .put_user_vote(&session.uid, &record)
            .await
            .context("Failed to write the vote record")?;
        self.store
            .increment_tally(kind)
            .await
            .context("Failed to increment the shared counter")?;

        self.stage = VoteStage::Voted(kind);
        Ok(())
    }

    /// Reads the shared counter, treating a missing document as all zeroes.
    pub async fn counts(&mut self) -> Result<TallyCounts> {
        Ok(self.store.tally().await?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TestStore;
    use uuid::Uuid;

    fn session(uid: &str) -> Session {
        Session {
            uid: uid.to_string(),
            display_name: format!("Viewer {uid}"),
            photo_url: None,
        }
    }

    fn store(project: &str) -> Box<dyn DocStore + Send> {
        Box::new(TestStore::new(project))
    }

    fn project() -> String {
        Uuid::new_v4().to_string()
    }

    #[tokio::test]
    async fn test_first_vote_initializes_counter() {
        let project = project();
        let mut tally = VoteTally::new(store(&project));
        tally.resolve_session(session("u1")).await.unwrap();
        assert_eq!(tally.stage(), VoteStage::NoVote);

        tally.cast(VoteKind::Support).await.unwrap();
        assert_eq!(tally.stage(), VoteStage::Voted(VoteKind::Support));
        assert_eq!(
            tally.counts().await.unwrap(),
            TallyCounts {
                support: 1,
                against: 0
            }
        );
    }

    #[tokio::test]
    async fn test_repeat_cast_is_a_noop() {
        let project = project();
        let mut tally = VoteTally::new(store(&project));
        tally.resolve_session(session("u1")).await.unwrap();
        tally.cast(VoteKind::Against).await.unwrap();
        tally.cast(VoteKind::Against).await.unwrap();
        tally.cast(VoteKind::Support).await.unwrap();
        assert_eq!(tally.stage(), VoteStage::Voted(VoteKind::Against));
        assert_eq!(
            tally.counts().await.unwrap(),
            TallyCounts {
                support: 0,
                against: 1
            }
        );
    }

    #[tokio::test]
    async fn test_existing_record_resolves_to_voted() {
        let project = project();
        let mut first = VoteTally::new(store(&project));
        first.resolve_session(session("u1")).await.unwrap();
        first.cast(VoteKind::Support).await.unwrap();

        // A fresh viewer for the same identity starts out already voted.
        let mut second = VoteTally::new(store(&project));
        second.resolve_session(session("u1")).await.unwrap();
        assert_eq!(second.stage(), VoteStage::Voted(VoteKind::Support));
        second.cast(VoteKind::Support).await.unwrap();
        assert_eq!(
            second.counts().await.unwrap(),
            TallyCounts {
                support: 1,
                against: 0
            }
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_cannot_vote() {
        let mut tally = VoteTally::new(store(&project()));
        assert!(tally.cast(VoteKind::Support).await.is_err());
        assert_eq!(tally.stage(), VoteStage::Unauthenticated);
    }

    #[tokio::test]
    async fn test_sign_out_then_different_identity_may_vote() {
        let project = project();
        let mut tally = VoteTally::new(store(&project));
        tally.resolve_session(session("u1")).await.unwrap();
        tally.cast(VoteKind::Support).await.unwrap();

        tally.signed_out();
        assert_eq!(tally.stage(), VoteStage::Unauthenticated);

        // The single-vote constraint is per identity, not per device.
        tally.resolve_session(session("u2")).await.unwrap();
        assert_eq!(tally.stage(), VoteStage::NoVote);
        tally.cast(VoteKind::Against).await.unwrap();
        assert_eq!(
            tally.counts().await.unwrap(),
            TallyCounts {
                support: 1,
                against: 1
            }
        );
    }

    #[tokio::test]
    async fn test_failed_increment_keeps_no_vote_and_allows_retry() {
        let project = project();
        TestStore::new(&project).fail_next_increment();

        let mut tally = VoteTally::new(store(&project));
        tally.resolve_session(session("u1")).await.unwrap();
        assert!(tally.cast(VoteKind::Support).await.is_err());
        assert_eq!(tally.stage(), VoteStage::NoVote);
        assert_eq!(tally.counts().await.unwrap(), TallyCounts::default());

        // Retry succeeds and lands exactly one increment.
        tally.cast(VoteKind::Support).await.unwrap();
        assert_eq!(tally.stage(), VoteStage::Voted(VoteKind::Support));
        assert_eq!(
            tally.counts().await.unwrap(),
            TallyCounts {
                support: 1,
                against: 0
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_votes_both_land() {
        let project = project();
        let mut handles = Vec::new();
        for uid in ["u1", "u2"] {
            let project = project.clone();
            handles.push(tokio::spawn(async move {
                let mut tally = VoteTally::new(Box::new(TestStore::new(&project)));
                tally.resolve_session(session(uid)).await.unwrap();
                tally.cast(VoteKind::Support).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let mut tally = VoteTally::new(store(&project));
        assert_eq!(
            tally.counts().await.unwrap(),
            TallyCounts {
                support: 2,
                against: 0
            }
        );
    }

    #[test]
    fn test_support_fraction() {
        assert_eq!(TallyCounts::default().support_fraction(), 0.5);
        let counts = TallyCounts {
            support: 3,
            against: 1,
        };
        assert_eq!(counts.support_fraction(), 0.75);
    }
}
