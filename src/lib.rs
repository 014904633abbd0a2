pub mod aggregate;
pub mod args;
mod auth;
pub mod commands;
mod config;
mod error;
pub mod filter;
mod load;
pub mod model;
mod render;
mod store;
#[cfg(test)]
mod test;
mod utils;
pub mod vote;

pub use auth::Session;
pub use config::Config;
pub use error::Error;
pub use error::ErrorType;
pub use error::Result;
pub use store::Mode;
