use crate::common::*;
use crate::config::ParseConfig;
use crate::fetch::{fetch_rows, field, parse_field, ColumnIndex};
use crate::parsers::ModParser;
use crate::record::*;
use crate::smoothing::aggregate_and_smooth;

/// modification type reported when the file carries no motif column
const DEFAULT_MOD_TYPE: &str = "m";

/// Per-read calls of `nanopolish call-methylation`, optionally with the
/// `PS`/`HP` phasing columns
pub struct CallParser {
    pub phased: bool,
}

/// Per-site aggregates of `calculate_methylation_frequency`
pub struct FrequencyParser;

/// `floor((start + end) / 2)`
pub fn midpoint(start: i64, end: i64) -> i64 {
    (start + end).div_euclid(2)
}

fn parse_haplotype(x: &str) -> Option<u8> {
    let hp = x.trim().parse::<f64>().ok()?;
    if hp.is_finite() && hp >= 0.0 && hp < 256.0 {
        Some(hp as u8)
    } else {
        None
    }
}

/// first and last call position of every read
pub fn read_extents(rows: &[CallRow]) -> BTreeMap<Box<str>, (i64, i64)> {
    let mut ret: BTreeMap<Box<str>, (i64, i64)> = BTreeMap::new();
    for r in rows {
        let ext = ret
            .entry(r.read_id.clone())
            .or_insert((r.position, r.position));
        ext.0 = ext.0.min(r.position);
        ext.1 = ext.1.max(r.position);
    }
    ret
}

impl ModParser for CallParser {
    fn parse(&self, path: &str, cfg: &ParseConfig) -> Result<Vec<ModificationRecord>> {
        let header = ColumnIndex::from_file(path)?;
        let chr_col = header.require("chromosome")?;
        let start_col = header.require("start")?;
        let end_col = header.require("end")?;
        let read_col = header.require("read_name")?;
        let llr_col = header.require("log_lik_ratio")?;
        let strand_col = header.find("strand");
        let motif_col = header.find("motif");
        let hp_col = if self.phased {
            Some(header.require("HP")?)
        } else {
            None
        };

        let rows = fetch_rows(path, cfg, Some(&header), |w| {
            let chr = field(w, chr_col, path)?;
            let start: i64 = parse_field(w, start_col, path)?;
            let end: i64 = parse_field(w, end_col, path)?;
            let position = midpoint(start, end);

            if let Some(region) = &cfg.region {
                if !region.contains(chr, position) {
                    return Ok(None);
                }
            }

            let strand = match strand_col {
                Some(j) => Strand::from_symbol(field(w, j, path)?),
                None => Strand::Forward,
            };
            let mod_type: Box<str> = match motif_col {
                Some(j) => field(w, j, path)?.into(),
                None => DEFAULT_MOD_TYPE.into(),
            };
            let haplotype = match hp_col {
                Some(j) => w.get(j).and_then(|x| parse_haplotype(x)),
                None => None,
            };

            Ok(Some(CallRow {
                read_id: field(w, read_col, path)?.into(),
                chr: chr.into(),
                strand,
                position,
                value: parse_field(w, llr_col, path)?,
                mod_type,
                haplotype,
            }))
        })?;

        let data_type = if self.phased {
            DataType::NanopolishPhased
        } else {
            DataType::NanopolishCall
        };

        let groups: Vec<(Box<str>, Vec<CallRow>)> = if motif_col.is_some() {
            let mut by_motif: BTreeMap<Box<str>, Vec<CallRow>> = BTreeMap::new();
            for r in rows {
                by_motif.entry(r.mod_type.clone()).or_default().push(r);
            }
            by_motif
                .into_iter()
                .map(|(motif, rows)| (format!("{}_{}", cfg.name, motif).into_boxed_str(), rows))
                .collect()
        } else {
            vec![(cfg.name.clone(), rows)]
        };

        Ok(groups
            .into_iter()
            .map(|(name, mut rows)| {
                rows.sort_by(|a, b| {
                    a.read_id
                        .cmp(&b.read_id)
                        .then_with(|| a.chr.cmp(&b.chr))
                        .then_with(|| a.position.cmp(&b.position))
                });
                let called_sites = rows.len();
                let extents = read_extents(&rows);
                let mut rec =
                    ModificationRecord::new(&name, data_type, ModTable::Calls(rows), called_sites);
                rec.start_end_table = Some(extents);
                rec
            })
            .collect())
    }
}

impl ModParser for FrequencyParser {
    fn parse(&self, path: &str, cfg: &ParseConfig) -> Result<Vec<ModificationRecord>> {
        let header = ColumnIndex::from_file(path)?;
        let chr_col = header.require("chromosome")?;
        let start_col = header.require("start")?;
        let end_col = header.require("end")?;
        let called_col = header.require("called_sites")?;
        let freq_col = header.require("methylated_frequency")?;

        let rows = fetch_rows(path, cfg, Some(&header), |w| {
            let chr = field(w, chr_col, path)?;
            let start: i64 = parse_field(w, start_col, path)?;
            let end: i64 = parse_field(w, end_col, path)?;
            let position = midpoint(start, end);

            if let Some(region) = &cfg.region {
                if !region.contains(chr, position) {
                    return Ok(None);
                }
            }

            let called: usize = parse_field(w, called_col, path)?;
            let row = FreqRow {
                chr: chr.into(),
                start: position,
                stop: position + 1,
                value: parse_field(w, freq_col, path)?,
            };
            Ok(Some((row, called)))
        })?;

        let called_sites = rows.iter().map(|(_, n)| n).sum();
        let rows = aggregate_and_smooth(rows.into_iter().map(|(r, _)| r).collect(), cfg.smooth);

        Ok(vec![ModificationRecord::new(
            &cfg.name,
            DataType::NanopolishFreq,
            ModTable::Frequency(rows),
            called_sites,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CALL_HEADER: &str = "chromosome\tstrand\tstart\tend\tread_name\tlog_lik_ratio\tlog_lik_methylated\tlog_lik_unmethylated\tnum_calling_strands\tnum_motifs\tsequence";

    #[test]
    fn test_calls_sorted_and_filtered() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", CALL_HEADER).unwrap();
        writeln!(file, "chr1\t+\t110\t111\tread_b\t2.5\t-1\t-3\t1\t1\tCG").unwrap();
        writeln!(file, "chr1\t-\t100\t105\tread_b\t-1.5\t-1\t-3\t1\t2\tCGACG").unwrap();
        writeln!(file, "chr1\t+\t100\t101\tread_a\t4.0\t-1\t-3\t1\t1\tCG").unwrap();
        writeln!(file, "chr1\t+\t900\t901\tread_a\t4.0\t-1\t-3\t1\t1\tCG").unwrap();
        file.flush().unwrap();

        let cfg = ParseConfig::new("calls").with_region("chr1:0-500".parse().unwrap());
        let records = CallParser { phased: false }
            .parse(file.path().to_str().unwrap(), &cfg)
            .unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.called_sites, 3);
        let ModTable::Calls(rows) = &rec.table else {
            panic!("expected calls");
        };
        let order: Vec<(&str, i64)> = rows
            .iter()
            .map(|r| (r.read_id.as_ref(), r.position))
            .collect();
        assert_eq!(order, vec![("read_a", 100), ("read_b", 102), ("read_b", 110)]);
        assert_eq!(rows[1].strand, Strand::Backward);
        assert_eq!(
            rec.start_end_table.as_ref().unwrap().get("read_b"),
            Some(&(102, 110))
        );
    }

    #[test]
    fn test_motif_split_and_phase() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "chromosome\tstrand\tstart\tend\tread_name\tlog_lik_ratio\tmotif\tPS\tHP"
        )
        .unwrap();
        writeln!(file, "chr1\t+\t10\t10\tr1\t1.0\tCpG\t5\t1").unwrap();
        writeln!(file, "chr1\t+\t20\t20\tr1\t1.0\tGpC\t5\t1").unwrap();
        writeln!(file, "chr1\t+\t30\t30\tr2\t-2.0\tCpG\tnan\tnan").unwrap();
        file.flush().unwrap();

        let cfg = ParseConfig::new("s1");
        let records = CallParser { phased: true }
            .parse(file.path().to_str().unwrap(), &cfg)
            .unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_ref()).collect();
        assert_eq!(names, vec!["s1_CpG", "s1_GpC"]);
        assert!(records
            .iter()
            .all(|r| r.data_type == DataType::NanopolishPhased));
        let ModTable::Calls(rows) = &records[0].table else {
            panic!("expected calls");
        };
        assert_eq!(rows[0].haplotype, Some(1));
        assert_eq!(rows[1].haplotype, None);
    }

    #[test]
    fn test_frequency_smoothing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chromosome\tstart\tend\tnum_motifs_in_group\tcalled_sites\tcalled_sites_methylated\tmethylated_frequency\tgroup_sequence").unwrap();
        for (pos, freq) in [(1, 0.0), (2, 0.0), (3, 1.0), (4, 0.0), (5, 0.0)] {
            writeln!(file, "chr1\t{}\t{}\t1\t4\t{}\t{}\tCG", pos, pos, freq * 4.0, freq).unwrap();
        }
        file.flush().unwrap();

        let cfg = ParseConfig::new("f")
            .with_region("chr1:0-100".parse().unwrap())
            .with_smooth(3);
        let records = FrequencyParser
            .parse(file.path().to_str().unwrap(), &cfg)
            .unwrap();
        let rec = &records[0];
        assert_eq!(rec.called_sites, 20);
        let ModTable::Frequency(rows) = &rec.table else {
            panic!("expected frequencies");
        };
        assert_eq!(rows.len(), 5);
        assert!(rows[0].value.is_nan());
        assert!(rows[4].value.is_nan());
        assert_eq!(rows[2].start, 3);
        assert!((rows[2].value - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_genome_wide_frequency_per_chromosome() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chromosome\tstart\tend\tnum_motifs_in_group\tcalled_sites\tcalled_sites_methylated\tmethylated_frequency\tgroup_sequence").unwrap();
        writeln!(file, "chr1\t100\t100\t1\t4\t4\t1.0\tCG").unwrap();
        writeln!(file, "chr2\t100\t100\t1\t4\t0\t0.0\tCG").unwrap();
        file.flush().unwrap();

        let cfg = ParseConfig::new("f").with_smooth(1);
        let records = FrequencyParser
            .parse(file.path().to_str().unwrap(), &cfg)
            .unwrap();
        let ModTable::Frequency(rows) = &records[0].table else {
            panic!("expected frequencies");
        };
        let sites: Vec<(&str, i64, f64)> = rows
            .iter()
            .map(|r| (r.chr.as_ref(), r.start, r.value))
            .collect();
        assert_eq!(sites, vec![("chr1", 100, 1.0), ("chr2", 100, 0.0)]);
    }
}
