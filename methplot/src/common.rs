#![allow(unused)]

pub use genomic_data::common_io as io;
pub use genomic_data::region::Region;
pub use genomic_data::sam::Strand;

pub use crate::error::{MethError, Result};

pub use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
pub use env_logger;

pub use log::{debug, info, warn};
pub use std::path::Path;

pub use fnv::FnvHashMap as HashMap;
pub use std::collections::BTreeMap;
