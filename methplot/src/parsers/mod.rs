//! One parser per input format, all producing [`ModificationRecord`]s.
//!
//! [`parse_file`] sniffs the format and dispatches; the format enum is
//! closed, so adding a format means adding a parser here.

pub mod alignment;
pub mod bedfiles;
pub mod nanocompore;
pub mod nanopolish;

use crate::common::*;
use crate::config::ParseConfig;
use crate::format::{sniff, Format};
use crate::record::ModificationRecord;

pub trait ModParser {
    /// Read `path` and normalise it into one or more records
    fn parse(&self, path: &str, cfg: &ParseConfig) -> Result<Vec<ModificationRecord>>;
}

impl Format {
    pub fn parser(&self) -> Box<dyn ModParser> {
        match *self {
            Format::NanopolishCall => Box::new(nanopolish::CallParser { phased: false }),
            Format::NanopolishPhased => Box::new(nanopolish::CallParser { phased: true }),
            Format::NanopolishFreq => Box::new(nanopolish::FrequencyParser),
            Format::Nanocompore => Box::new(nanocompore::NanocomporeParser),
            Format::Bedgraph => Box::new(bedfiles::BedGraphParser),
            Format::Bedmethyl(flavor) => Box::new(bedfiles::BedMethylParser { flavor }),
            Format::CramLike => Box::new(alignment::AlignmentParser),
        }
    }
}

///
/// Sniff the format of `path` and parse it
///
/// * `path` - input file
/// * `cfg` - display name, region and parsing options
///
pub fn parse_file(path: &str, cfg: &ParseConfig) -> Result<Vec<ModificationRecord>> {
    let format = sniff(path)?;
    info!(
        "parsing {} as {} [{}] for {}",
        path,
        format,
        cfg.name,
        cfg.region_label()
    );
    let records = format.parser().parse(path, cfg)?;
    for rec in records.iter() {
        debug!(
            "{}: {} rows, {} called sites",
            rec.name,
            rec.table.len(),
            rec.called_sites
        );
    }
    Ok(records)
}

/// Comma-joined list for error messages
pub(crate) fn join_codes<'a>(codes: impl Iterator<Item = &'a str>) -> Box<str> {
    codes.collect::<Vec<_>>().join(",").into_boxed_str()
}
