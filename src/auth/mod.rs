//! Identity provider integration: OAuth sign-in, the persisted session, and
//! the test-mode session substitute.

mod files;
mod oauth;

use crate::store::Mode;
use crate::{utils, Config, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub(crate) use files::{ClientSecretFile, TokenFile};
pub(crate) use oauth::TokenProvider;

const USERINFO_URI: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const TEST_UID_ENV: &str = "SALESPULSE_TEST_UID";

/// The authenticated identity, as reported by the provider's userinfo
/// endpoint. The core only reads it; the provider owns its lifecycle.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    pub uid: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Session {
    pub(crate) async fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize session")?;
        utils::write(path, data).await
    }

    /// Loads the persisted session, or `None` when the viewer is anonymous.
    pub(crate) async fn load_if_exists(path: &Path) -> Result<Option<Session>> {
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(utils::deserialize(path).await?))
    }
}

/// What the provider's userinfo endpoint returns. Only the fields we keep.
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
    picture: Option<String>,
}

/// Resolves the signed-in identity from an access token.
pub(crate) async fn fetch_session(access_token: &str) -> Result<Session> {
    let info: UserInfo = reqwest::Client::new()
        .get(USERINFO_URI)
        .bearer_auth(access_token)
        .send()
        .await
        .context("Failed to reach the userinfo endpoint")?
        .error_for_status()
        .context("The userinfo request was rejected")?
        .json()
        .await
        .context("Malformed userinfo response")?;
    Ok(Session {
        display_name: info.name.unwrap_or_else(|| info.sub.clone()),
        uid: info.sub,
        photo_url: info.picture,
    })
}

/// The current viewer, or `None` when anonymous. In test mode a fixed session
/// is substituted so the whole app can run without the identity provider;
/// `SALESPULSE_TEST_UID` selects the identity.
pub(crate) async fn current_session(config: &Config, mode: Mode) -> Result<Option<Session>> {
    match mode {
        Mode::Test => {
            let uid = std::env::var(TEST_UID_ENV).unwrap_or_else(|_| "viewer-1".to_string());
            debug!("Test mode session for uid {uid}");
            Ok(Some(Session {
                display_name: format!("Test Viewer ({uid})"),
                uid,
                photo_url: None,
            }))
        }
        Mode::Remote => Session::load_if_exists(&config.session_path()).await,
    }
}

/// Discards the cached tokens and session, reverting to anonymous. Failures
/// here are logged and surfaced; the session files are simply gone or not.
pub(crate) async fn sign_out(config: &Config) -> Result<()> {
    let removed_token = utils::remove_if_exists(&config.token_path()).await?;
    let removed_session = utils::remove_if_exists(&config.session_path()).await?;
    debug!("Sign-out removed token={removed_token} session={removed_session}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_session_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let session = Session {
            uid: "abc123".to_string(),
            display_name: "Ada".to_string(),
            photo_url: Some("https://example.com/ada.png".to_string()),
        };
        session.save(&path).await.unwrap();
        let loaded = Session::load_if_exists(&path).await.unwrap();
        assert_eq!(loaded, Some(session));
    }

    #[tokio::test]
    async fn test_missing_session_is_anonymous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        assert_eq!(Session::load_if_exists(&path).await.unwrap(), None);
    }
}
