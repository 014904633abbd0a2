//! OAuth 2.0 authorization-code flow for the identity provider.
//!
//! Sign-in opens the provider's consent page in a browser and catches the
//! redirect on a local callback server. Tokens persist to `token.json` and
//! refresh silently when close to expiry; only `pulse auth` ever requires the
//! browser.

use crate::auth::{ClientSecretFile, TokenFile};
use crate::Result;
use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info};

const OAUTH_SCOPES: &[&str] = &["openid", "profile"];
const OAUTH_CALLBACK_PORT: u16 = 3030;
/// Refresh when the access token is within this many seconds of expiry.
const EXPIRY_SLACK_SECONDS: i64 = 60;

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Holds the client secret and cached tokens, refreshing as needed. Cloneable
/// so background tasks can carry their own copy.
#[derive(Clone)]
pub(crate) struct TokenProvider {
    secret: ClientSecretFile,
    token_path: PathBuf,
    token: TokenFile,
}

impl TokenProvider {
    /// Runs the full consent flow: opens the consent URL, waits for the local
    /// callback, exchanges the code, and persists the tokens. The only entry
    /// point that requires a browser.
    pub(crate) async fn initialize(secret_path: &Path, token_path: &Path) -> Result<Self> {
        info!("Starting the sign-in flow");
        let secret = ClientSecretFile::load(secret_path).await?;
        let client = oauth_client(&secret)?;

        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in OAUTH_SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (authorize_url, csrf_state) = request.url();

        info!("Open this URL in your browser to sign in:\n\n{authorize_url}\n");
        info!("Waiting for the callback on http://localhost:{OAUTH_CALLBACK_PORT}");
        let code = wait_for_callback(csrf_state.secret().clone()).await?;

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&http_client()?)
            .await
            .map_err(|e| anyhow!("Failed to exchange the authorization code: {e}"))?;
        let token = token_file(&response, None);
        token.save(token_path).await?;
        info!("Sign-in successful; tokens saved to {}", token_path.display());

        Ok(Self {
            secret,
            token_path: token_path.to_path_buf(),
            token,
        })
    }

    /// Loads previously cached tokens. Never opens a browser; errors when the
    /// token file is missing so the caller can direct the user to
    /// `pulse auth`.
    pub(crate) async fn load(secret_path: PathBuf, token_path: PathBuf) -> Result<Self> {
        let secret = ClientSecretFile::load(&secret_path).await?;
        let token = TokenFile::load(&token_path).await?;
        Ok(Self {
            secret,
            token_path,
            token,
        })
    }

    pub(crate) fn token(&self) -> &str {
        &self.token.access_token
    }

    /// Silently refreshes the access token when it is expired or about to
    /// expire. A no-op otherwise.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        if !self.token.expires_within(EXPIRY_SLACK_SECONDS) {
            return Ok(());
        }
        let Some(refresh_token) = self.token.refresh_token.clone() else {
            bail!("The cached token has expired and no refresh token exists. Run 'pulse auth'.");
        };
        debug!("Refreshing the access token");
        let client = oauth_client(&self.secret)?;
        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(&http_client()?)
            .await
            .map_err(|e| anyhow!("Failed to refresh the access token: {e}"))?;

        // Refresh responses may omit the refresh token; keep the old one.
        self.token = token_file(&response, self.token.refresh_token.clone());
        self.token.save(&self.token_path).await?;
        Ok(())
    }

    /// A valid access token, refreshed first if needed.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<String> {
        self.refresh().await?;
        Ok(self.token.access_token.clone())
    }
}

fn oauth_client(secret: &ClientSecretFile) -> Result<ConfiguredClient> {
    Ok(
        BasicClient::new(ClientId::new(secret.client_id().to_string()))
            .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
            .set_auth_uri(
                AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth URI")?,
            )
            .set_token_uri(
                TokenUrl::new(secret.token_uri().to_string()).context("Invalid token URI")?,
            )
            .set_redirect_uri(
                RedirectUrl::new(format!("http://localhost:{OAUTH_CALLBACK_PORT}"))
                    .context("Invalid redirect URI")?,
            ),
    )
}

/// The token endpoint client. Redirects must stay disabled here.
fn http_client() -> Result<oauth2::reqwest::Client> {
    oauth2::reqwest::ClientBuilder::new()
        .redirect(oauth2::reqwest::redirect::Policy::none())
        .build()
        .context("Failed to build the OAuth HTTP client")
}

fn token_file(response: &BasicTokenResponse, fallback_refresh: Option<String>) -> TokenFile {
    let expires_in = response
        .expires_in()
        .unwrap_or(std::time::Duration::from_secs(3600));
    let expiry = Utc::now()
        + chrono::Duration::from_std(expires_in).unwrap_or_else(|_| chrono::Duration::hours(1));
    TokenFile {
        access_token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(fallback_refresh),
        expiry,
    }
}

/// Serves the local redirect endpoint until a callback with a matching state
/// and an authorization code arrives.
async fn wait_for_callback(expected_state: String) -> Result<String> {
    let listener = TcpListener::bind(("127.0.0.1", OAUTH_CALLBACK_PORT))
        .await
        .with_context(|| format!("Unable to listen on localhost:{OAUTH_CALLBACK_PORT}"))?;
    let (tx, mut rx) = mpsc::channel::<String>(1);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = accepted.context("Failed to accept the callback connection")?;
                let io = TokioIo::new(stream);
                let tx = tx.clone();
                let expected = expected_state.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let tx = tx.clone();
                        let expected = expected.clone();
                        async move {
                            Ok::<_, Infallible>(handle_callback(req, &expected, &tx).await)
                        }
                    });
                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Callback connection error: {e}");
                    }
                });
            }
            code = rx.recv() => {
                return code.context("The OAuth callback channel closed unexpectedly");
            }
        }
    }
}

async fn handle_callback(
    req: Request<Incoming>,
    expected_state: &str,
    tx: &mpsc::Sender<String>,
) -> Response<Full<Bytes>> {
    let query = req.uri().query().unwrap_or("");
    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    let message = if params.get("state").map(String::as_str) != Some(expected_state) {
        "Sign-in state mismatch. Please retry from the terminal."
    } else if let Some(code) = params.get("code") {
        let _ = tx.send(code.clone()).await;
        "Sign-in received. You can close this window and return to the terminal."
    } else {
        "The sign-in response carried no authorization code."
    };
    Response::new(Full::new(Bytes::from(message)))
}
