//! Configuration file handling.
//!
//! The configuration file is stored at `$SALESPULSE_HOME/config.json` and
//! holds the dataset resource, the document backend connection parameters,
//! and presentation tunables. Credentials live under `.secrets/`.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "salespulse";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const SESSION_JSON: &str = "session.json";
const CONFIG_JSON: &str = "config.json";
/// Bounds the supplier facet list for presentation. A shortcut, not a domain
/// rule, hence configurable.
const DEFAULT_SUPPLIER_FACET_CAP: usize = 50;

/// The `Config` object represents the data directory. You instantiate it with
/// the path to `$SALESPULSE_HOME` and from there it loads
/// `$SALESPULSE_HOME/config.json` and resolves the paths of everything else
/// the directory is expected to contain.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the data directory and its `.secrets/` subdirectory, moves the
    /// OAuth client credentials into place, and writes an initial
    /// `config.json`.
    pub async fn create(
        dir: impl Into<PathBuf>,
        secret_file: &Path,
        dataset: &str,
        backend_url: &str,
        project_id: &str,
    ) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the salespulse home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;
        let secret_destination = secrets_dir.join(CLIENT_SECRET_JSON);
        utils::rename(secret_file, secret_destination).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            dataset: dataset.to_string(),
            backend_url: backend_url.to_string(),
            project_id: project_id.to_string(),
            supplier_facet_cap: DEFAULT_SUPPLIER_FACET_CAP,
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
        })
    }

    /// Validates that the home directory, config file, and secrets directory
    /// exist, then returns the loaded configuration.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Salespulse home is missing. Run 'pulse init' first.")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display());
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            );
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    /// The dataset resource: a local CSV path or an `http(s)` URL.
    pub fn dataset(&self) -> &str {
        &self.config_file.dataset
    }

    /// Base URL of the document store REST API.
    pub fn backend_url(&self) -> &str {
        &self.config_file.backend_url
    }

    /// The backend project identifier used in document resource names.
    pub fn project_id(&self) -> &str {
        &self.config_file.project_id
    }

    pub fn supplier_facet_cap(&self) -> usize {
        self.config_file.supplier_facet_cap
    }

    pub fn client_secret_path(&self) -> PathBuf {
        self.secrets.join(CLIENT_SECRET_JSON)
    }

    pub fn token_path(&self) -> PathBuf {
        self.secrets.join(TOKEN_JSON)
    }

    pub fn session_path(&self) -> PathBuf {
        self.secrets.join(SESSION_JSON)
    }
}

/// The serialization format of the configuration file.
///
/// Example:
/// ```json
/// {
///   "app_name": "salespulse",
///   "config_version": 1,
///   "dataset": "https://example.com/warehouse_and_retail_sales.csv",
///   "backend_url": "https://firestore.googleapis.com/v1",
///   "project_id": "sales-pulse-demo",
///   "supplier_facet_cap": 50
/// }
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct ConfigFile {
    /// Application name, should always be "salespulse".
    app_name: String,

    /// Configuration file version.
    config_version: u8,

    /// Path or URL of the sales CSV dataset.
    dataset: String,

    /// Base URL of the document store REST API.
    backend_url: String,

    /// Backend project identifier.
    project_id: String,

    /// Maximum number of suppliers offered as facet values.
    #[serde(default = "default_supplier_facet_cap")]
    supplier_facet_cap: usize,
}

fn default_supplier_facet_cap() -> usize {
    DEFAULT_SUPPLIER_FACET_CAP
}

impl ConfigFile {
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path.as_ref(), data)
            .await
            .context("Unable to write config file")
    }
}
