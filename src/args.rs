//! These structs provide the CLI interface for the pulse CLI.

use crate::filter::FilterSelection;
use crate::model::ItemType;
use crate::vote::VoteKind;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// pulse: A command-line dashboard for warehouse and retail sales data.
///
/// The purpose of this program is to load a public warehouse-and-retail sales
/// dataset (CSV, local or over HTTP), slice it by item type, year, and
/// supplier, and summarize monthly and per-category sales. It also keeps a
/// small shared "was this helpful?" tally in a remote document store, with
/// sign-in through the store's identity provider.
///
/// You will need OAuth client credentials for the document store's identity
/// provider. Download them from the provider's console and pass the file to
/// `pulse init --client-secret`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command you should run when setting up the pulse CLI.
    /// You need a few things ready beforehand.
    ///
    /// - Decide what directory you want to store configuration in and pass it
    ///   as --salespulse-home. By default it will be $HOME/salespulse.
    ///
    /// - Have the dataset at hand: a local CSV path or an http(s) URL, passed
    ///   as --dataset.
    ///
    /// - Know your document store's REST base URL and project id, passed as
    ///   --backend-url and --project-id.
    ///
    /// - Download your OAuth client credentials to a file and pass it as
    ///   --client-secret. The file is moved into the data directory.
    ///
    Init(InitArgs),
    /// Sign in to the document store's identity provider via OAuth.
    Auth(AuthArgs),
    /// List the filter facets the dataset offers: years and suppliers.
    Facets,
    /// Summarize the dataset: totals, monthly trend, category breakdown.
    Stats(FilterArgs),
    /// Show the filtered records as a table (capped preview).
    Table(FilterArgs),
    /// Record your vote on whether the dashboard is helpful.
    Vote(VoteArgs),
    /// Show the current vote tally, optionally watching for live updates.
    Tally(TallyArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate
    /// for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where pulse configuration and secrets are held.
    /// Defaults to ~/salespulse
    #[arg(long, env = "SALESPULSE_HOME", default_value_t = default_salespulse_home())]
    salespulse_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, salespulse_home: PathBuf) -> Self {
        Self {
            log_level,
            salespulse_home: salespulse_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn salespulse_home(&self) -> &DisplayPath {
        &self.salespulse_home
    }
}

/// Args for the `pulse init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The sales dataset: a local CSV file path or an http(s) URL.
    #[arg(long)]
    dataset: String,

    /// The base URL of the document store's REST API.
    #[arg(long)]
    backend_url: String,

    /// The document store project identifier.
    #[arg(long)]
    project_id: String,

    /// The path to your downloaded OAuth client credentials. This file will be
    /// moved to the secrets location in the main data directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(
        dataset: impl Into<String>,
        backend_url: impl Into<String>,
        project_id: impl Into<String>,
        client_secret: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            backend_url: backend_url.into(),
            project_id: project_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// Args for the `pulse auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh authentication instead of signing in.
    #[arg(long, conflicts_with = "sign_out")]
    verify: bool,

    /// Discard the cached credentials and return to anonymous viewing.
    #[arg(long)]
    sign_out: bool,
}

impl AuthArgs {
    pub fn new(verify: bool, sign_out: bool) -> Self {
        Self { verify, sign_out }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }

    pub fn sign_out(&self) -> bool {
        self.sign_out
    }
}

/// The filter facets shared by the dataset-viewing subcommands. Absent flags
/// mean "all".
#[derive(Debug, Default, Parser, Clone)]
pub struct FilterArgs {
    /// Restrict to a single item type, e.g. BEER or WINE.
    #[arg(long)]
    item_type: Option<ItemType>,

    /// Restrict to a single year, e.g. 2020.
    #[arg(long)]
    year: Option<String>,

    /// Restrict to a single supplier (exact name).
    #[arg(long)]
    supplier: Option<String>,
}

impl FilterArgs {
    pub fn new(
        item_type: Option<ItemType>,
        year: Option<String>,
        supplier: Option<String>,
    ) -> Self {
        Self {
            item_type,
            year,
            supplier,
        }
    }

    pub fn to_selection(&self) -> FilterSelection {
        FilterSelection {
            item_type: self.item_type.into(),
            year: self.year.clone().into(),
            supplier: self.supplier.clone().into(),
        }
    }
}

/// Args for the `pulse vote` command.
#[derive(Debug, Parser, Clone)]
pub struct VoteArgs {
    /// Your verdict: "support" or "against".
    vote: VoteKind,
}

impl VoteArgs {
    pub fn new(vote: VoteKind) -> Self {
        Self { vote }
    }

    pub fn vote(&self) -> VoteKind {
        self.vote
    }
}

/// Args for the `pulse tally` command.
#[derive(Debug, Parser, Clone)]
pub struct TallyArgs {
    /// Keep watching and print the tally whenever it changes. Ctrl-C to stop.
    #[arg(long)]
    watch: bool,
}

impl TallyArgs {
    pub fn new(watch: bool) -> Self {
        Self { watch }
    }

    pub fn watch(&self) -> bool {
        self.watch
    }
}

fn default_salespulse_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("salespulse"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --salespulse-home or SALESPULSE_HOME instead of relying on the \
                default data directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("salespulse")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
