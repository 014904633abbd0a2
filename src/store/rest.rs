//! Implements `DocStore` against a Firestore-style document REST API.
//!
//! The backend exposes point reads (`GET`), merge writes (`PATCH` with an
//! update mask), and a `:commit` endpoint whose field transforms provide the
//! atomic per-field increment. The live subscription is realized client-side
//! as a polling task feeding a watch channel; the backend's streaming endpoint
//! is not consumed.

use crate::auth::TokenProvider;
use crate::store::{DocStore, TallyFeed, TALLY_DOC, USER_VOTES, VOTES};
use crate::vote::{TallyCounts, UserVoteRecord, VoteKind};
use crate::{Config, Result};
use anyhow::Context;
use chrono::DateTime;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub(super) struct RestStore {
    http: reqwest::Client,
    base: String,
    project_id: String,
    token_provider: TokenProvider,
}

impl RestStore {
    pub(super) fn new(config: &Config, token_provider: TokenProvider) -> Result<Self> {
        // Parse once so a malformed backend URL fails here, not per request.
        let base = Url::parse(config.backend_url())
            .with_context(|| format!("Invalid backend URL '{}'", config.backend_url()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base: base.as_str().trim_end_matches('/').to_string(),
            project_id: config.project_id().to_string(),
            token_provider,
        })
    }

    /// The fully-qualified document resource name used in transforms.
    fn doc_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{collection}/{doc_id}",
            self.project_id
        )
    }

    fn doc_url(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}", self.base, self.doc_name(collection, doc_id))
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents:commit",
            self.base, self.project_id
        )
    }

    async fn get_doc(&mut self, collection: &str, doc_id: &str) -> Result<Option<Value>> {
        let url = self.doc_url(collection, doc_id);
        let token = self.token_provider.token_with_refresh().await?;
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to read document {collection}/{doc_id}"))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Value = response
            .error_for_status()
            .with_context(|| format!("Read of {collection}/{doc_id} was rejected"))?
            .json()
            .await
            .with_context(|| format!("Malformed document body for {collection}/{doc_id}"))?;
        Ok(Some(doc))
    }

    /// Merge-writes `fields` into the document, creating it if absent.
    async fn patch_doc(&mut self, collection: &str, doc_id: &str, fields: Value) -> Result<()> {
        let mask: Vec<(String, String)> = fields
            .as_object()
            .map(|o| o.keys().cloned())
            .into_iter()
            .flatten()
            .map(|k| ("updateMask.fieldPaths".to_string(), k))
            .collect();
        let url = self.doc_url(collection, doc_id);
        let token = self.token_provider.token_with_refresh().await?;
        self.http
            .patch(&url)
            .query(&mask)
            .bearer_auth(token)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .with_context(|| format!("Failed to write document {collection}/{doc_id}"))?
            .error_for_status()
            .with_context(|| format!("Write of {collection}/{doc_id} was rejected"))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocStore for RestStore {
    async fn user_vote(&mut self, uid: &str) -> Result<Option<UserVoteRecord>> {
        let Some(doc) = self.get_doc(USER_VOTES, uid).await? else {
            return Ok(None);
        };
        let vote = str_field(&doc, "vote")
            .and_then(|s| VoteKind::from_str(s).ok())
            .with_context(|| format!("Vote record for {uid} has no usable vote field"))?;
        let timestamp = str_value(&doc, "timestamp", "timestampValue")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.to_utc())
            .unwrap_or_default();
        Ok(Some(UserVoteRecord { vote, timestamp }))
    }

    async fn put_user_vote(&mut self, uid: &str, record: &UserVoteRecord) -> Result<()> {
        let fields = json!({
            "vote": { "stringValue": record.vote.to_string() },
            "timestamp": { "timestampValue": record.timestamp.to_rfc3339() },
        });
        self.patch_doc(USER_VOTES, uid, fields).await
    }

    async fn tally(&mut self) -> Result<Option<TallyCounts>> {
        Ok(self.get_doc(VOTES, TALLY_DOC).await?.map(|doc| decode_tally(&doc)))
    }

    async fn increment_tally(&mut self, kind: VoteKind) -> Result<()> {
        // A transform against a missing document fails, so the first vote
        // creates the counter with a merge write instead.
        if self.tally().await?.is_none() {
            debug!("Counter document is absent; initializing it");
            let (support, against) = match kind {
                VoteKind::Support => (1, 0),
                VoteKind::Against => (0, 1),
            };
            let fields = json!({
                "support": { "integerValue": support.to_string() },
                "against": { "integerValue": against.to_string() },
            });
            return self.patch_doc(VOTES, TALLY_DOC, fields).await;
        }

        let body = json!({
            "writes": [{
                "transform": {
                    "document": self.doc_name(VOTES, TALLY_DOC),
                    "fieldTransforms": [{
                        "fieldPath": kind.to_string(),
                        "increment": { "integerValue": "1" },
                    }],
                },
            }],
        });
        let url = self.commit_url();
        let token = self.token_provider.token_with_refresh().await?;
        self.http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("Failed to send the counter increment")?
            .error_for_status()
            .context("The counter increment was rejected")?;
        Ok(())
    }

    async fn subscribe_tally(&mut self) -> Result<TallyFeed> {
        let initial = self.tally().await?.unwrap_or_default();
        let (tx, rx) = watch::channel(initial.clone());

        let http = self.http.clone();
        let url = self.doc_url(VOTES, TALLY_DOC);
        let mut token_provider = self.token_provider.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last = initial;
            loop {
                interval.tick().await;
                if tx.is_closed() {
                    break;
                }
                match poll_tally(&http, &url, &mut token_provider).await {
                    Ok(Some(counts)) if counts != last => {
                        last = counts.clone();
                        let _ = tx.send(counts);
                    }
                    Ok(_) => {}
                    // Best effort: a failed poll is logged, never retried early.
                    Err(e) => warn!("Tally poll failed: {e:#}"),
                }
            }
        });
        Ok(TallyFeed::new(rx, Some(task)))
    }
}

async fn poll_tally(
    http: &reqwest::Client,
    url: &str,
    token_provider: &mut TokenProvider,
) -> Result<Option<TallyCounts>> {
    let token = token_provider.token_with_refresh().await?;
    let response = http
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .context("Failed to poll the counter document")?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let doc: Value = response
        .error_for_status()
        .context("Counter poll was rejected")?
        .json()
        .await
        .context("Malformed counter document body")?;
    Ok(Some(decode_tally(&doc)))
}

fn decode_tally(doc: &Value) -> TallyCounts {
    TallyCounts {
        support: int_field(doc, "support"),
        against: int_field(doc, "against"),
    }
}

/// Reads a typed scalar from the document's `fields` map.
fn str_value<'a>(doc: &'a Value, name: &str, value_type: &str) -> Option<&'a str> {
    doc.pointer(&format!("/fields/{name}/{value_type}"))
        .and_then(Value::as_str)
}

fn str_field<'a>(doc: &'a Value, name: &str) -> Option<&'a str> {
    str_value(doc, name, "stringValue")
}

/// Integer fields arrive as strings; absent or malformed values read as zero.
fn int_field(doc: &Value, name: &str) -> i64 {
    str_value(doc, name, "integerValue")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tally() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/votes/salesData",
            "fields": {
                "support": { "integerValue": "3" },
                "against": { "integerValue": "1" },
            },
        });
        assert_eq!(
            decode_tally(&doc),
            TallyCounts {
                support: 3,
                against: 1
            }
        );
    }

    #[test]
    fn test_decode_tally_missing_fields_read_as_zero() {
        let doc = json!({ "fields": {} });
        assert_eq!(decode_tally(&doc), TallyCounts::default());
    }

    #[test]
    fn test_str_field() {
        let doc = json!({ "fields": { "vote": { "stringValue": "support" } } });
        assert_eq!(str_field(&doc, "vote"), Some("support"));
        assert_eq!(str_field(&doc, "missing"), None);
    }
}
