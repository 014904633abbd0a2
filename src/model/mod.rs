//! Typed representations of the sales dataset.
//!
//! The CSV parser hands us loosely-typed string rows; everything downstream of
//! the loader consumes the fixed-shape [`SalesRecord`] instead.

mod record;

pub use record::{ItemType, SalesColumn, SalesRecord};
pub(crate) use record::RowBuilder;
