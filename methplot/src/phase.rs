//! Split phased nanopolish calls (with `PS`/`HP` columns) into one file
//! per haplotype.

use crate::common::*;
use crate::fetch::ColumnIndex;

use std::collections::BTreeSet;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseGroup {
    Phase1,
    Phase2,
    Unphased,
    /// phase block that carries a single haplotype
    Homozygous,
}

impl std::fmt::Display for PhaseGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PhaseGroup::Phase1 => "phase1",
            PhaseGroup::Phase2 => "phase2",
            PhaseGroup::Unphased => "unphased",
            PhaseGroup::Homozygous => "homozygous",
        };
        write!(f, "{}", name)
    }
}

fn haplotype(x: &str) -> Option<u8> {
    match x.trim() {
        "1" | "1.0" => Some(1),
        "2" | "2.0" => Some(2),
        _ => None,
    }
}

fn from_haplotype(hp: Option<u8>) -> Option<PhaseGroup> {
    match hp {
        Some(1) => Some(PhaseGroup::Phase1),
        Some(2) => Some(PhaseGroup::Phase2),
        _ => None,
    }
}

///
/// Assign each data line to a group. `None` drops the line.
///
/// * `naive` - look only at the trailing value (the `HP` column) and
///   ignore phase blocks
///
pub fn classify_lines(
    header: &ColumnIndex,
    lines: &[Box<str>],
    naive: bool,
) -> Result<Vec<Option<PhaseGroup>>> {
    if naive {
        return Ok(lines
            .iter()
            .map(|line| {
                let last = line.rsplit('\t').next().unwrap_or_default();
                from_haplotype(haplotype(last)).or(Some(PhaseGroup::Unphased))
            })
            .collect());
    }

    let ps_col = header.require("PS")?;
    let hp_col = header.require("HP")?;

    let parsed: Vec<(Option<&str>, Option<u8>)> = lines
        .iter()
        .map(|line| {
            let w: Vec<&str> = line.split('\t').collect();
            (
                w.get(ps_col).copied(),
                w.get(hp_col).and_then(|x| haplotype(x)),
            )
        })
        .collect();

    let mut block_haplotypes: HashMap<&str, BTreeSet<u8>> = HashMap::default();
    for (ps, hp) in parsed.iter() {
        if let (Some(ps), Some(hp)) = (ps, hp) {
            block_haplotypes.entry(*ps).or_default().insert(*hp);
        }
    }

    Ok(parsed
        .iter()
        .map(|(ps, hp)| {
            let Some(hp) = hp else {
                return Some(PhaseGroup::Unphased);
            };
            let homozygous = ps
                .and_then(|ps| block_haplotypes.get(ps))
                .is_some_and(|set| set.len() == 1);
            if homozygous {
                Some(PhaseGroup::Homozygous)
            } else {
                from_haplotype(Some(*hp))
            }
        })
        .collect())
}

///
/// Write `{prefix}_calls_{group}.tsv.gz` (or `{prefix}_{group}.tsv.gz`
/// in naive mode), each with the input header, and return the number
/// of lines per group.
///
pub fn split_by_phase(
    path: &str,
    prefix: &str,
    naive: bool,
) -> Result<BTreeMap<PhaseGroup, usize>> {
    if !Path::new(path).exists() {
        return Err(MethError::InputNotFound(path.into()));
    }

    let mut lines = io::read_lines(path)?;
    if lines.is_empty() {
        return Err(MethError::parse(path, "empty file; expected a header line"));
    }
    let header_line = lines.remove(0);
    let header = ColumnIndex::from_line(path, &header_line);
    lines.retain(|x| !x.trim().is_empty());

    let groups = classify_lines(&header, &lines, naive)?;

    let outputs: Vec<PhaseGroup> = if naive {
        vec![PhaseGroup::Phase1, PhaseGroup::Phase2, PhaseGroup::Unphased]
    } else {
        vec![
            PhaseGroup::Phase1,
            PhaseGroup::Phase2,
            PhaseGroup::Unphased,
            PhaseGroup::Homozygous,
        ]
    };

    let mut counts = BTreeMap::new();
    for group in outputs {
        let out_file = if naive {
            format!("{}_{}.tsv.gz", prefix, group)
        } else {
            format!("{}_calls_{}.tsv.gz", prefix, group)
        };
        io::mkdir(&out_file)?;
        let mut buf = io::open_buf_writer(&out_file)?;
        writeln!(buf, "{}", header_line)?;
        let mut n = 0;
        for (line, g) in lines.iter().zip(groups.iter()) {
            if *g == Some(group) {
                writeln!(buf, "{}", line)?;
                n += 1;
            }
        }
        buf.flush()?;
        info!("{}: {} calls", out_file, n);
        counts.insert(group, n);
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homozygous_blocks() {
        let header = ColumnIndex::from_line("x", "chromosome\tstart\tread_name\tPS\tHP");
        let lines: Vec<Box<str>> = [
            "chr1\t10\tr1\t100\t1",
            "chr1\t20\tr2\t100\t2",
            "chr1\t30\tr3\t500\t1.0",
            "chr1\t40\tr4\t500\t1",
            "chr1\t50\tr5\tnan\tnan",
        ]
        .iter()
        .map(|&x| x.into())
        .collect();

        let groups = classify_lines(&header, &lines, false).unwrap();
        assert_eq!(
            groups,
            vec![
                Some(PhaseGroup::Phase1),
                Some(PhaseGroup::Phase2),
                Some(PhaseGroup::Homozygous),
                Some(PhaseGroup::Homozygous),
                Some(PhaseGroup::Unphased),
            ]
        );

        let naive = classify_lines(&header, &lines, true).unwrap();
        assert_eq!(naive[2], Some(PhaseGroup::Phase1));
        assert_eq!(naive[4], Some(PhaseGroup::Unphased));
    }
}
