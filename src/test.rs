//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::store::TestStore;
use crate::vote::TallyCounts;
use crate::Config;
use tempfile::TempDir;
use uuid::Uuid;

/// A dataset small enough to eyeball but wide enough to exercise filtering and
/// aggregation: two years, several suppliers, one row per category, and a few
/// rows that the loader must drop.
pub const SAMPLE_DATASET: &str = "\
YEAR,MONTH,ITEM TYPE,ITEM DESCRIPTION,SUPPLIER,RETAIL SALES,WAREHOUSE SALES
2019,12,BEER,Winter Lager 6pk,Crown Imports,3,2
2020,1,BEER,Lager 6pk,Crown Imports,10,5
2020,1,WINE,Red Blend,Santa Vittoria,20,0
2020,2,LIQUOR,Rye Whiskey,Highline Spirits,7,1
2020,2,KEGS,Pale Ale Keg,Crown Imports,0,15
2020,3,NON-ALCOHOL,Ginger Brew,Acme Beverage,4,0
2020,2,SODA,Cola 12pk,Acme Beverage,5,5
,3,BEER,No Year Ale,Crown Imports,1,1
";

/// Test environment that sets up a salespulse home directory with a Config, a
/// sample dataset file, and an isolated in-memory document store project.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment whose dataset is [`SAMPLE_DATASET`] and
    /// whose project id is unique, so each test gets its own store state.
    pub async fn new() -> Self {
        Self::with_dataset(SAMPLE_DATASET).await
    }

    /// Creates a test environment with the given CSV text as the dataset.
    pub async fn with_dataset(dataset_csv: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("salespulse");
        let secret_path = temp_dir.path().join("client_secret.json");

        // Create minimal client_secret.json
        let secret_content = r#"{
            "installed": {
                "client_id": "test-client-id",
                "client_secret": "test-secret",
                "redirect_uris": ["http://localhost"],
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;
        std::fs::write(&secret_path, secret_content).unwrap();

        let dataset_path = temp_dir.path().join("sales.csv");
        std::fs::write(&dataset_path, dataset_csv).unwrap();

        let project_id = format!("test-{}", Uuid::new_v4());
        let config = Config::create(
            &root,
            &secret_path,
            &dataset_path.to_string_lossy(),
            "https://docstore.invalid/v1",
            &project_id,
        )
        .await
        .unwrap();

        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// A handle on the in-memory store state for this environment's project.
    pub fn test_store(&self) -> TestStore {
        TestStore::new(self.config.project_id())
    }

    /// The current shared counter in this environment's store.
    pub fn tally_counts(&self) -> TallyCounts {
        self.test_store().tally_counts().unwrap_or_default()
    }
}
