//! Interval-level testing of methylation between two groups.
//!
//! Site-level counts are summed over target intervals, the two groups
//! are outer-joined on the interval, and each interval gets a Fisher's
//! exact test. Multiple testing is corrected with Benjamini-Hochberg.

use crate::common::*;
use crate::hypothesis_tests::*;

use coitrees::{COITree, Interval, IntervalTree};
use genomic_data::bed::{merge_overlapping, read_bed, Bed};
use std::io::BufRead;

pub const DEFAULT_PSEUDOCOUNT: f64 = 0.01;

pub const DIFF_TEST_HEADER: &str = "chromosome\tbegin\tend\todds_ratio\tp-value\tpadj";

const SITE_CHR_COL: usize = 0;
const SITE_START_COL: usize = 1;
const SITE_END_COL: usize = 2;
const SITE_CALLS_COL: usize = 4;
const SITE_METHYLATED_COL: usize = 5;

#[derive(Debug, Clone)]
pub struct DiffTestConfig {
    /// added to each cell of the 2x2 table for the odds ratio only
    pub pseudocount: f64,
}

impl Default for DiffTestConfig {
    fn default() -> Self {
        Self {
            pseudocount: DEFAULT_PSEUDOCOUNT,
        }
    }
}

/// Coverage of one site, or one group of sites
#[derive(Debug, Clone, PartialEq)]
pub struct SiteCounts {
    pub chr: Box<str>,
    pub start: i64,
    pub stop: i64,
    pub counts: MethylationCounts,
}

/// A merged bed interval with a stable id
#[derive(Debug, Clone, PartialEq)]
pub struct TargetInterval {
    pub id: usize,
    pub bed: Bed,
}

#[derive(Debug, Clone)]
pub struct DiffTestRow {
    pub id: usize,
    pub bed: Bed,
    pub a: MethylationCounts,
    pub b: MethylationCounts,
    pub odds_ratio: f64,
    pub pvalue: f64,
    pub fdr: f64,
}

impl std::fmt::Display for DiffTestRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.bed.chr, self.bed.start, self.bed.stop, self.odds_ratio, self.pvalue, self.fdr
        )
    }
}

///
/// Read a frequency-like site table: chromosome, start, end, (skipped),
/// called sites, methylated sites, ... A header line is skipped.
///
/// * `path` - nanopolish frequency output or anything with that layout
///
pub fn read_site_counts(path: &str) -> Result<Vec<SiteCounts>> {
    if !Path::new(path).exists() {
        return Err(MethError::InputNotFound(path.into()));
    }

    let buf = io::open_buf_reader(path)?;
    let mut ret = vec![];

    for (line_no, line) in buf.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let words: Vec<&str> = line.split('\t').collect();
        if words.len() <= SITE_METHYLATED_COL {
            return Err(MethError::parse(
                path,
                format!(
                    "line {}: expected at least {} columns",
                    line_no + 1,
                    SITE_METHYLATED_COL + 1
                ),
            ));
        }

        let start = words[SITE_START_COL].trim().parse::<i64>();
        if start.is_err() && ret.is_empty() {
            // header
            continue;
        }

        let parse_int = |j: usize| -> Result<i64> {
            words[j].trim().parse::<i64>().map_err(|e| {
                MethError::parse(path, format!("line {}, column {}: {}", line_no + 1, j + 1, e))
            })
        };

        let calls = parse_int(SITE_CALLS_COL)?.max(0) as u64;
        let methylated = parse_int(SITE_METHYLATED_COL)?.max(0) as u64;

        ret.push(SiteCounts {
            chr: words[SITE_CHR_COL].into(),
            start: parse_int(SITE_START_COL)?,
            stop: parse_int(SITE_END_COL)?,
            counts: MethylationCounts::from_calls(calls, methylated),
        });
    }

    info!("{}: {} sites", path, ret.len());
    Ok(ret)
}

/// Concatenate the site tables of every file in a group
pub fn read_group(paths: &[Box<str>]) -> Result<Vec<SiteCounts>> {
    let mut ret = vec![];
    for path in paths {
        ret.extend(read_site_counts(path)?);
    }
    Ok(ret)
}

/// Merge overlapping intervals, then number them
pub fn prepare_targets(beds: Vec<Bed>) -> Vec<TargetInterval> {
    merge_overlapping(beds)
        .into_iter()
        .enumerate()
        .map(|(id, bed)| TargetInterval { id, bed })
        .collect()
}

/// One interval tree per chromosome over the target intervals
pub struct IntervalIndex {
    trees: HashMap<Box<str>, COITree<usize, u32>>,
}

impl IntervalIndex {
    pub fn new(targets: &[TargetInterval]) -> Self {
        let mut chr_to_nodes: HashMap<Box<str>, Vec<Interval<usize>>> = HashMap::default();
        for t in targets {
            // coitrees intervals are closed
            chr_to_nodes
                .entry(t.bed.chr.clone())
                .or_default()
                .push(Interval::new(
                    t.bed.start as i32,
                    (t.bed.stop - 1) as i32,
                    t.id,
                ));
        }

        let trees = chr_to_nodes
            .into_iter()
            .map(|(chr, nodes)| (chr, COITree::new(&nodes)))
            .collect();

        Self { trees }
    }

    /// ids of targets sharing a base with `[start, stop)`; an empty
    /// site (`start == stop`) is treated as the single base at `start`
    pub fn overlapping(&self, chr: &str, start: i64, stop: i64) -> Vec<usize> {
        let mut ret = vec![];
        if let Some(tree) = self.trees.get(chr) {
            let last = (stop - 1).max(start);
            tree.query(start as i32, last as i32, |node| {
                ret.push(node.metadata.clone());
            });
        }
        ret
    }
}

///
/// Sum site counts over the targets they overlap. Only targets hit by at
/// least one site appear in the output.
///
pub fn sum_by_interval(
    index: &IntervalIndex,
    sites: &[SiteCounts],
) -> HashMap<usize, MethylationCounts> {
    let mut ret: HashMap<usize, MethylationCounts> = HashMap::default();
    for s in sites {
        for id in index.overlapping(&s.chr, s.start, s.stop) {
            ret.entry(id).or_default().add_assign(&s.counts);
        }
    }
    ret
}

///
/// Test every target interval covered by at least one of the groups.
/// A group without coverage of an interval contributes zero counts.
/// Intervals whose odds ratio is undefined are left out, and the
/// adjusted p-values are computed over the remaining ones.
///
pub fn test_intervals(
    targets: &[TargetInterval],
    group_a: &[SiteCounts],
    group_b: &[SiteCounts],
    cfg: &DiffTestConfig,
) -> Vec<DiffTestRow> {
    let index = IntervalIndex::new(targets);
    let sums_a = sum_by_interval(&index, group_a);
    let sums_b = sum_by_interval(&index, group_b);

    let mut rows = vec![];
    let mut nundefined = 0;

    for t in targets {
        if !sums_a.contains_key(&t.id) && !sums_b.contains_key(&t.id) {
            continue;
        }
        let test = FisherTest {
            a: sums_a.get(&t.id).copied().unwrap_or_default(),
            b: sums_b.get(&t.id).copied().unwrap_or_default(),
        };
        let odds_ratio = test.odds_ratio(cfg.pseudocount);
        if !odds_ratio.is_finite() {
            nundefined += 1;
            continue;
        }
        rows.push(DiffTestRow {
            id: t.id,
            bed: t.bed.clone(),
            a: test.a,
            b: test.b,
            odds_ratio,
            pvalue: test.pvalue_two_sided().unwrap_or(1.0),
            fdr: f64::NAN,
        });
    }

    if nundefined > 0 {
        debug!("{} interval(s) with an undefined odds ratio", nundefined);
    }

    let pvalues: Vec<f64> = rows.iter().map(|r| r.pvalue).collect();
    for (r, q) in rows.iter_mut().zip(benjamini_hochberg(&pvalues)) {
        r.fdr = q;
    }

    info!(
        "tested {} of {} target intervals",
        rows.len(),
        targets.len()
    );
    rows
}

///
/// Read the bed file and both groups, then test every interval
///
/// * `bed_file` - target intervals
/// * `files_a` - site tables of group A
/// * `files_b` - site tables of group B
///
pub fn run_differential(
    bed_file: &str,
    files_a: &[Box<str>],
    files_b: &[Box<str>],
    cfg: &DiffTestConfig,
) -> Result<Vec<DiffTestRow>> {
    if !Path::new(bed_file).exists() {
        return Err(MethError::InputNotFound(bed_file.into()));
    }
    let targets = prepare_targets(read_bed(bed_file)?);
    info!("{} target intervals after merging", targets.len());

    let group_a = read_group(files_a)?;
    let group_b = read_group(files_b)?;
    Ok(test_intervals(&targets, &group_a, &group_b, cfg))
}

///
/// Append a `padj` column to a tab-separated table with a header line and
/// sort its rows by increasing p-value. Missing or unparsable p-values
/// count as 1.
///
/// * `lines` - header line first
/// * `pvalue_column` - name of the p-value column in the header
///
pub fn correct_and_sort_table(
    path: &str,
    lines: &[Box<str>],
    pvalue_column: &str,
) -> Result<Vec<Box<str>>> {
    let Some((header, rows)) = lines.split_first() else {
        return Err(MethError::parse(path, "empty file; expected a header line"));
    };
    let col = header
        .split('\t')
        .position(|x| x.trim() == pvalue_column)
        .ok_or_else(|| MethError::MissingColumn {
            path: path.into(),
            column: pvalue_column.into(),
        })?;

    let rows: Vec<&Box<str>> = rows.iter().filter(|x| !x.trim().is_empty()).collect();
    let pvalues: Vec<f64> = rows
        .iter()
        .map(|line| {
            line.split('\t')
                .nth(col)
                .and_then(|x| x.trim().parse::<f64>().ok())
                .filter(|p| p.is_finite())
                .unwrap_or(1.0)
        })
        .collect();
    let padj = benjamini_hochberg(&pvalues);

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&i, &j| pvalues[i].total_cmp(&pvalues[j]));

    let mut ret = Vec::with_capacity(rows.len() + 1);
    ret.push(format!("{}\tpadj", header).into_boxed_str());
    ret.extend(
        order
            .into_iter()
            .map(|i| format!("{}\t{}", rows[i], padj[i]).into_boxed_str()),
    );
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_and_sort_table() {
        let lines: Vec<Box<str>> = [
            "name\tp-value",
            "x\t0.04",
            "y\tNA",
            "z\t0.01",
        ]
        .iter()
        .map(|&x| x.into())
        .collect();

        let out = correct_and_sort_table("t", &lines, "p-value").unwrap();
        assert_eq!(out[0].as_ref(), "name\tp-value\tpadj");
        assert!(out[1].starts_with("z\t0.01\t"));
        assert!(out[2].starts_with("x\t0.04\t"));
        assert!(out[3].starts_with("y\tNA\t1"));

        assert!(matches!(
            correct_and_sort_table("t", &lines, "pval"),
            Err(MethError::MissingColumn { .. })
        ));
    }

    fn site(chr: &str, pos: i64, calls: u64, methylated: u64) -> SiteCounts {
        SiteCounts {
            chr: chr.into(),
            start: pos,
            stop: pos + 1,
            counts: MethylationCounts::from_calls(calls, methylated),
        }
    }

    fn bed(chr: &str, start: i64, stop: i64) -> Bed {
        Bed {
            chr: chr.into(),
            start,
            stop,
        }
    }

    #[test]
    fn test_overlap_query_half_open() {
        let targets = prepare_targets(vec![bed("chr1", 100, 200), bed("chr1", 150, 300)]);
        assert_eq!(targets.len(), 1);
        let index = IntervalIndex::new(&targets);
        assert_eq!(index.overlapping("chr1", 299, 300), vec![0]);
        assert!(index.overlapping("chr1", 300, 301).is_empty());
        assert!(index.overlapping("chr1", 99, 100).is_empty());
        assert_eq!(index.overlapping("chr1", 100, 100), vec![0]);
        assert!(index.overlapping("chr2", 150, 151).is_empty());
    }

    #[test]
    fn test_zero_fill_and_exclusion() {
        let targets = prepare_targets(vec![
            bed("chr1", 0, 100),
            bed("chr1", 200, 300),
            bed("chr1", 400, 500),
        ]);
        let group_a = vec![site("chr1", 10, 10, 5), site("chr1", 20, 4, 1), site("chr1", 250, 6, 6)];
        let group_b = vec![site("chr1", 260, 8, 0)];

        let rows = test_intervals(&targets, &group_a, &group_b, &DiffTestConfig::default());
        // the third interval has no data in either group
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].id, 0);
        assert_eq!(rows[0].a, MethylationCounts::new(8, 6));
        assert_eq!(rows[0].b, MethylationCounts::default());

        assert_eq!(rows[1].a, MethylationCounts::new(0, 6));
        assert_eq!(rows[1].b, MethylationCounts::new(8, 0));
        assert!(rows.iter().all(|r| r.fdr >= r.pvalue && r.fdr <= 1.0));
    }
}
