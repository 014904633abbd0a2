//! Authentication command handlers for the OAuth flow.
//!
//! This module implements the CLI commands for:
//! - `pulse auth` - Initial OAuth consent flow
//! - `pulse auth --verify` - Verify and refresh authentication
//! - `pulse auth --sign-out` - Discard cached credentials

use crate::auth::{self, TokenProvider};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result, Session};
use anyhow::Context;

/// Handles the `pulse auth` command, running the OAuth consent flow.
///
/// This is the ONLY command that should open a browser. After the consent
/// flow completes, the signed-in identity is fetched from the provider's
/// userinfo endpoint and persisted as the session, so later commands know who
/// the viewer is without touching the network.
///
/// # Errors
/// Returns an error if the OAuth flow fails or if the client secret file is
/// missing.
pub async fn auth(config: &Config) -> Result<Out<Session>> {
    let provider = TokenProvider::initialize(&config.client_secret_path(), &config.token_path())
        .await
        .classify(ErrorType::Auth)?;
    let session = auth::fetch_session(provider.token())
        .await
        .classify(ErrorType::Auth)?;
    session.save(&config.session_path()).await?;
    Ok(Out::new(
        format!("Signed in as {}", session.display_name),
        session,
    ))
}

/// Handles the `pulse auth --verify` command.
///
/// This command NEVER opens a browser or triggers an interactive OAuth flow.
/// It loads the cached tokens, refreshes them if they are close to expiry, and
/// confirms the identity provider still accepts them. If the token is missing
/// or unusable the error directs the user to run `pulse auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<Session>> {
    let mut provider = TokenProvider::load(config.client_secret_path(), config.token_path())
        .await
        .context(
            "Unable to use the existing tokens found in the token JSON file. \n\n\
            You should run 'pulse auth' (without the --verify flag).",
        )
        .classify(ErrorType::Auth)?;
    let token = provider
        .token_with_refresh()
        .await
        .context("Unable to refresh the token")
        .classify(ErrorType::Auth)?;
    let session = auth::fetch_session(&token).await.classify(ErrorType::Auth)?;
    session.save(&config.session_path()).await?;
    Ok(Out::new(
        format!("Your sign-in is valid. You are {}", session.display_name),
        session,
    ))
}

/// Handles the `pulse auth --sign-out` command. Removes the cached tokens and
/// session so subsequent commands run anonymously.
pub async fn sign_out(config: &Config) -> Result<Out<()>> {
    auth::sign_out(config).await.classify(ErrorType::Auth)?;
    Ok("Signed out. Viewing is anonymous until the next 'pulse auth'.".into())
}
