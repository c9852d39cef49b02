//! Ingestion of nanopore base-modification data into one record type,
//! and interval-level differential testing between groups of samples.

pub mod common;
pub mod config;
pub mod differential;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod format;
pub mod frequency;
pub mod modtags;
pub mod parsers;
pub mod phase;
pub mod record;
pub mod smoothing;
pub mod snapshot;

pub use error::{MethError, Result};
