use clap::Parser;
use sales_pulse::args::{Args, Command};
use sales_pulse::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().salespulse_home().path();

    // This allows for testing the program without hitting the remote document
    // store or the identity provider. When SALESPULSE_IN_TEST_MODE is set and
    // non-zero in length, then the mode will be Mode::Test, otherwise it will
    // be Mode::Remote.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(
            home,
            init_args.client_secret(),
            init_args.dataset(),
            init_args.backend_url(),
            init_args.project_id(),
        )
        .await?
        .print(),

        Command::Auth(auth_args) => {
            let config = Config::load(home).await?;
            if auth_args.sign_out() {
                commands::sign_out(&config).await?.print()
            } else if auth_args.verify() {
                commands::auth_verify(&config).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Facets => {
            let config = Config::load(home).await?;
            commands::facets(&config).await?.print()
        }

        Command::Stats(filter_args) => {
            let config = Config::load(home).await?;
            commands::stats(&config, &filter_args.to_selection())
                .await?
                .print()
        }

        Command::Table(filter_args) => {
            let config = Config::load(home).await?;
            commands::table(&config, &filter_args.to_selection())
                .await?
                .print()
        }

        Command::Vote(vote_args) => {
            let config = Config::load(home).await?;
            commands::vote(&config, mode, vote_args.vote()).await?.print()
        }

        Command::Tally(tally_args) => {
            let config = Config::load(home).await?;
            if tally_args.watch() {
                commands::tally_watch(&config, mode).await?.print()
            } else {
                commands::tally(&config, mode).await?.print()
            }
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
