use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file holding the dataset resource and
///   the document store connection settings
/// - Moves `secret_file` into its default location in the data dir.
///
/// # Arguments
/// - `salespulse_home` - The directory that will be the root of the data
///   directory, e.g. `$HOME/salespulse`
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed
///   to start the sign-in workflow.
/// - `dataset` - The sales CSV: a local path or an http(s) URL.
/// - `backend_url` - The base URL of the document store's REST API.
/// - `project_id` - The document store project identifier.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(
    salespulse_home: &Path,
    secret_file: &Path,
    dataset: &str,
    backend_url: &str,
    project_id: &str,
) -> Result<Out<()>> {
    let _config = Config::create(salespulse_home, secret_file, dataset, backend_url, project_id)
        .await
        .context("Unable to create the data directory and configs")
        .classify(ErrorType::Config)?;
    Ok("Successfully created the salespulse directory and config".into())
}
