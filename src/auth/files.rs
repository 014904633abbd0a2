//! The credential files kept under `.secrets/`: the downloaded OAuth client
//! secret and the cached token.

use crate::{utils, Result};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The OAuth 2.0 client credentials JSON as downloaded from the identity
/// provider's console ("installed application" shape).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub(crate) struct ClientSecretFile {
    installed: InstalledSecret,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct InstalledSecret {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl ClientSecretFile {
    pub(crate) async fn load(path: &Path) -> Result<Self> {
        utils::deserialize(path).await.with_context(|| {
            format!(
                "Failed to load the OAuth client secret from {}. \
                 Run 'pulse init' with --client-secret first.",
                path.display()
            )
        })
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(crate) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(crate) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

/// The cached OAuth tokens, persisted across runs so that sign-in happens
/// once and refresh happens silently.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub(crate) struct TokenFile {
    pub(crate) access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) refresh_token: Option<String>,
    pub(crate) expiry: DateTime<Utc>,
}

impl TokenFile {
    pub(crate) async fn load(path: &Path) -> Result<Self> {
        utils::deserialize(path).await.with_context(|| {
            format!(
                "Failed to load cached tokens from {}. Run 'pulse auth' first.",
                path.display()
            )
        })
    }

    /// Saves with restrictive file permissions (0600 on Unix).
    pub(crate) async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize token")?;
        utils::write(path, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, permissions)
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }

    /// True when the access token has expired or is about to (within
    /// `slack_seconds`).
    pub(crate) fn expires_within(&self, slack_seconds: i64) -> bool {
        self.expiry - Utc::now() < Duration::seconds(slack_seconds)
    }
}
