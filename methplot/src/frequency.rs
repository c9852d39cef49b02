//! Aggregate per-read nanopolish calls into per-site methylation
//! frequencies, in the layout [`crate::parsers::nanopolish::FrequencyParser`]
//! reads back.

use crate::common::*;
use crate::fetch::{field, parse_field, ColumnIndex};

use std::io::BufRead;

pub const DEFAULT_CALL_THRESHOLD: f64 = 2.0;

pub const FREQUENCY_HEADER: &str = "chromosome\tstart\tend\tnum_motifs_in_group\tcalled_sites\tcalled_sites_methylated\tmethylated_frequency\tgroup_sequence";

/// column names assumed for files without a header line
const CALL_COLUMNS: &str = "chromosome\tstrand\tstart\tend\tread_name\tlog_lik_ratio\tlog_lik_methylated\tlog_lik_unmethylated\tnum_calling_strands\tnum_motifs\tsequence\tPS\tHP";

const SPLIT_GROUP_SEQUENCE: &str = "split-group";

#[derive(Debug, Clone)]
pub struct FrequencyOptions {
    /// skip calls with `|llr| < call_threshold * num_motifs`
    pub call_threshold: f64,
    /// report each CpG of a multi-CpG group separately
    pub split_groups: bool,
    pub no_header: bool,
}

impl Default for FrequencyOptions {
    fn default() -> Self {
        Self {
            call_threshold: DEFAULT_CALL_THRESHOLD,
            split_groups: false,
            no_header: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteStats {
    pub num_reads: usize,
    pub called_sites: usize,
    pub called_sites_methylated: usize,
    pub group_size: usize,
    pub sequence: Box<str>,
}

impl SiteStats {
    fn new(group_size: usize, sequence: &str) -> Self {
        Self {
            num_reads: 0,
            called_sites: 0,
            called_sites_methylated: 0,
            group_size,
            sequence: sequence.into(),
        }
    }

    fn update(&mut self, num_called: usize, is_methylated: bool) {
        self.num_reads += 1;
        self.called_sites += num_called;
        if is_methylated {
            self.called_sites_methylated += num_called;
        }
    }

    pub fn frequency(&self) -> f64 {
        self.called_sites_methylated as f64 / self.called_sites as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteFrequency {
    pub chr: Box<str>,
    pub start: i64,
    pub end: i64,
    pub stats: SiteStats,
}

impl std::fmt::Display for SiteFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.3}\t{}",
            self.chr,
            self.start,
            self.end,
            self.stats.group_size,
            self.stats.called_sites,
            self.stats.called_sites_methylated,
            self.stats.frequency(),
            self.stats.sequence
        )
    }
}

/// offsets of every `CG` relative to the first one
fn cpg_offsets(sequence: &str) -> Vec<i64> {
    let hits: Vec<i64> = sequence
        .match_indices("CG")
        .map(|(i, _)| i as i64)
        .collect();
    match hits.first() {
        Some(&first) => hits.iter().map(|i| i - first).collect(),
        None => vec![],
    }
}

///
/// Calculate per-site methylation frequencies from a call file
///
/// * `path` - nanopolish `call-methylation` output, gzipped or not
/// * `opts` - call threshold, group splitting, header presence
///
pub fn calculate_frequency(path: &str, opts: &FrequencyOptions) -> Result<Vec<SiteFrequency>> {
    if !Path::new(path).exists() {
        return Err(MethError::InputNotFound(path.into()));
    }

    let mut lines = io::open_buf_reader(path)?.lines();

    let header = if opts.no_header {
        ColumnIndex::from_line(path, CALL_COLUMNS)
    } else {
        let line = lines
            .next()
            .transpose()?
            .ok_or_else(|| MethError::parse(path, "empty file; expected a header line"))?;
        ColumnIndex::from_line(path, &line)
    };

    let chr_col = header.require("chromosome")?;
    let start_col = header.require("start")?;
    let end_col = header.require("end")?;
    let llr_col = header.require("log_lik_ratio")?;
    let motifs_col = header.require("num_motifs")?;
    let seq_col = header.require("sequence")?;

    let mut sites: BTreeMap<(Box<str>, i64, i64), SiteStats> = BTreeMap::new();
    let mut nambiguous = 0;

    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let w: Vec<&str> = line.split('\t').collect();

        let num_sites: usize = parse_field(&w, motifs_col, path)?;
        let llr: f64 = parse_field(&w, llr_col, path)?;
        if llr.abs() < opts.call_threshold * num_sites as f64 {
            nambiguous += 1;
            continue;
        }
        let is_methylated = llr > 0.0;

        let chr: Box<str> = field(&w, chr_col, path)?.into();
        let start: i64 = parse_field(&w, start_col, path)?;
        let sequence = field(&w, seq_col, path)?;

        if opts.split_groups && num_sites > 1 {
            for offset in cpg_offsets(sequence) {
                let key = (chr.clone(), start + offset, start + offset);
                sites
                    .entry(key)
                    .or_insert_with(|| SiteStats::new(1, SPLIT_GROUP_SEQUENCE))
                    .update(1, is_methylated);
            }
        } else {
            let end: i64 = parse_field(&w, end_col, path)?;
            sites
                .entry((chr, start, end))
                .or_insert_with(|| SiteStats::new(num_sites, sequence))
                .update(num_sites, is_methylated);
        }
    }

    if sites.is_empty() {
        return Err(MethError::parse(
            path,
            "no sites found for calculating frequencies",
        ));
    }
    debug!("{}: {} ambiguous calls skipped", path, nambiguous);

    Ok(sites
        .into_iter()
        .filter(|(_, stats)| stats.called_sites > 0)
        .map(|((chr, start, end), stats)| SiteFrequency {
            chr,
            start,
            end,
            stats,
        })
        .collect())
}
