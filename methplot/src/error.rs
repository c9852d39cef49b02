//! Errors raised while ingesting and testing modification data.
//!
//! Library functions return [`Result`]; only the command line driver
//! turns these into process exit codes.

use genomic_data::region::RegionError;
use thiserror::Error;

const SUPPORTED_FORMATS: &str = "nanopolish calls (phased or not), nanopolish frequencies, \
     nanocompore results, bedgraph, bedMethyl (ENCODE or modkit) and BAM/CRAM with MM/ML tags";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MethError {
    /// A path given on the command line does not exist
    #[error("input file not found: {0}")]
    InputNotFound(Box<str>),

    /// The sniffer could not classify the file
    #[error("unrecognized format: {path}\nsupported inputs are {}", SUPPORTED_FORMATS)]
    UnrecognizedFormat { path: Box<str> },

    #[error("failed to parse {path}: required column `{column}` is missing")]
    MissingColumn { path: Box<str>, column: Box<str> },

    #[error("failed to parse {path}: {message}")]
    Parse { path: Box<str>, message: Box<str> },

    #[error("no records found in {path} for region {region}")]
    EmptyRegion { path: Box<str>, region: Box<str> },

    /// Requested modification codes left nothing to report
    #[error("{path}: none of the requested modification codes [{requested}] were found; available: [{found}]")]
    ModCodesNotFound {
        path: Box<str>,
        requested: Box<str>,
        found: Box<str>,
    },

    #[error("not supported yet: {0}")]
    UnsupportedFeature(Box<str>),

    /// The index sidecar exists but the tool to query it could not be run
    #[error("could not run `{tool}` for indexed retrieval: {source}\n\
             install it, or remove the index file to fall back to a slower full scan")]
    ExternalToolUnavailable {
        tool: Box<str>,
        #[source]
        source: std::io::Error,
    },

    /// MM/ML tags are inconsistent with the read they are attached to
    #[error("corrupt modification tags in read {read_id}: {message}")]
    CorruptModTags { read_id: Box<str>, message: Box<str> },

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("rust_htslib error: `{0}`")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("snapshot (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MethError>;

impl MethError {
    pub fn parse(path: &str, message: impl std::fmt::Display) -> Self {
        MethError::Parse {
            path: path.into(),
            message: message.to_string().into_boxed_str(),
        }
    }
}
