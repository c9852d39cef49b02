use crate::common_io::read_lines;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

const ACCEPTED_REGION_FORMATS: &str = "`chrom:begin-end` (commas allowed, e.g. chr20:58,839,718-58,911,192) \
     or a contig/transcript name listed in the sequence index";

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("invalid region `{input}`: {reason}; accepted formats: {}", ACCEPTED_REGION_FORMATS)]
    InvalidRegion { input: Box<str>, reason: Box<str> },

    #[error("unknown contig `{0}`: not found in the sequence lengths; accepted formats: {formats}", formats = ACCEPTED_REGION_FORMATS)]
    UnknownContig(Box<str>),

    #[error("failed to read sequence index {path}: {source}")]
    SequenceIndex {
        path: Box<str>,
        #[source]
        source: std::io::Error,
    },
}

/// A half-open genomic interval `[start, stop)`
#[derive(Debug, Hash, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region {
    pub chr: Box<str>,
    pub start: i64,
    pub stop: i64,
}

/// lengths of contigs/transcripts keyed by name
pub type SeqLengths = HashMap<Box<str>, i64>;

impl Region {
    pub fn new(chr: &str, start: i64, stop: i64) -> Result<Self, RegionError> {
        if chr.is_empty() || start < 0 || start >= stop {
            return Err(RegionError::InvalidRegion {
                input: format!("{}:{}-{}", chr, start, stop).into(),
                reason: "need a chromosome name and 0 <= begin < end".into(),
            });
        }
        Ok(Self {
            chr: chr.into(),
            start,
            stop,
        })
    }

    pub fn size(&self) -> i64 {
        self.stop - self.start
    }

    /// file-name friendly identifier `{chr}_{start}_{stop}`
    pub fn key(&self) -> Box<str> {
        format!("{}_{}_{}", self.chr, self.start, self.stop).into_boxed_str()
    }

    pub fn contains(&self, chr: &str, pos: i64) -> bool {
        self.chr.as_ref() == chr && pos >= self.start && pos < self.stop
    }

    /// does `[start, stop)` on `chr` share at least one base with this region
    pub fn overlaps(&self, chr: &str, start: i64, stop: i64) -> bool {
        self.chr.as_ref() == chr && start < self.stop && stop > self.start
    }

    /// Resolve a region string, falling back to a contig name lookup
    /// (`[0, length)`) when there is no `:` in it.
    pub fn resolve(spec: &str, seq_lengths: Option<&SeqLengths>) -> Result<Self, RegionError> {
        let spec = spec.trim();
        if spec.contains(':') {
            return spec.parse();
        }
        let length = seq_lengths
            .and_then(|lengths| lengths.get(spec))
            .ok_or_else(|| RegionError::UnknownContig(spec.into()))?;
        Region::new(spec, 0, *length)
    }

    /// Split into abutting chunks of at most `max_size` bases.
    ///
    /// `count = ceil(size / max_size)` chunks of `ceil(size / count)`
    /// bases each; only the last one may be shorter.
    pub fn split(&self, max_size: i64) -> Vec<Region> {
        if max_size <= 0 || self.size() <= max_size {
            return vec![self.clone()];
        }
        let size = self.size();
        let count = size.div_euclid(max_size) + i64::from(size % max_size != 0);
        let chunk = size.div_euclid(count) + i64::from(size % count != 0);

        let mut ret = Vec::with_capacity(count as usize);
        let mut lb = self.start;
        while lb < self.stop {
            let ub = (lb + chunk).min(self.stop);
            ret.push(Region {
                chr: self.chr.clone(),
                start: lb,
                stop: ub,
            });
            lb = ub;
        }
        ret
    }
}

impl FromStr for Region {
    type Err = RegionError;

    /// `chrom:begin-end`, thousands separators allowed
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RegionError::InvalidRegion {
            input: s.into(),
            reason: reason.into(),
        };

        let cleaned = s.trim().replace(',', "");
        let (chr, range) = cleaned
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing `:` between chromosome and range"))?;
        let (begin, end) = range
            .split_once('-')
            .ok_or_else(|| invalid("missing `-` between begin and end"))?;
        let start = begin
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid("begin is not an integer"))?;
        let stop = end
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid("end is not an integer"))?;

        if chr.is_empty() {
            return Err(invalid("empty chromosome name"));
        }
        if start < 0 || start >= stop {
            return Err(invalid("need 0 <= begin < end"));
        }

        Ok(Region {
            chr: chr.into(),
            start,
            stop,
        })
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chr, self.start, self.stop)
    }
}

///
/// Read contig lengths from a samtools faidx index (`name\tlength\t...`)
/// * `fai_file` - usually `{fasta}.fai`
///
pub fn read_fasta_index(fai_file: &str) -> Result<SeqLengths, RegionError> {
    let lines = read_lines(fai_file).map_err(|source| RegionError::SequenceIndex {
        path: fai_file.into(),
        source,
    })?;

    let mut ret = SeqLengths::new();
    for line in lines.iter() {
        let mut words = line.split('\t');
        if let (Some(name), Some(length)) = (words.next(), words.next()) {
            if let Ok(length) = length.trim().parse::<i64>() {
                ret.insert(name.into(), length);
            }
        }
    }
    Ok(ret)
}

///
/// Turn a user-supplied window into the list of regions to process
///
/// * `spec` - `chrom:begin-end` or a contig name
/// * `seq_lengths` - contig lengths for name-only windows
/// * `max_size` - split windows larger than this
///
pub fn make_windows(
    spec: &str,
    seq_lengths: Option<&SeqLengths>,
    max_size: Option<i64>,
) -> Result<Vec<Region>, RegionError> {
    let region = Region::resolve(spec, seq_lengths)?;
    let windows = match max_size {
        Some(max_size) => region.split(max_size),
        None => vec![region],
    };
    if windows.len() > 1 {
        log::info!("split {} into {} windows", spec, windows.len());
    }
    Ok(windows)
}
