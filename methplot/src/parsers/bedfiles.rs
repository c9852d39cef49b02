use crate::common::*;
use crate::config::ParseConfig;
use crate::fetch::{fetch_rows, field, parse_field};
use crate::format::BedMethylFlavor;
use crate::parsers::{join_codes, ModParser};
use crate::record::*;
use crate::smoothing::aggregate_and_smooth;

/// `chrom start end value`
pub struct BedGraphParser;

/// ENCODE bedMethyl or modkit pileup
pub struct BedMethylParser {
    pub flavor: BedMethylFlavor,
}

const BEDMETHYL_CODE_COL: usize = 3;
const ENCODE_PERCENT_COL: usize = 10;
const MODKIT_NMOD_COL: usize = 11;
const MODKIT_NCANONICAL_COL: usize = 12;

impl ModParser for BedGraphParser {
    fn parse(&self, path: &str, cfg: &ParseConfig) -> Result<Vec<ModificationRecord>> {
        let rows = fetch_rows(path, cfg, None, |w| {
            let chr = field(w, 0, path)?;
            let mut start: i64 = parse_field(w, 1, path)?;
            let mut stop: i64 = parse_field(w, 2, path)?;

            if let Some(region) = &cfg.region {
                if !region.overlaps(chr, start, stop) {
                    return Ok(None);
                }
                start = start.max(region.start);
                stop = stop.min(region.stop);
            }

            Ok(Some(FreqRow {
                chr: chr.into(),
                start,
                stop,
                value: parse_field(w, 3, path)?,
            }))
        })?;

        let called_sites = rows.len();
        let rows = aggregate_and_smooth(rows, cfg.smooth);

        Ok(vec![ModificationRecord::new(
            &cfg.name,
            DataType::Bedgraph,
            ModTable::Frequency(rows),
            called_sites,
        )])
    }
}

impl BedMethylParser {
    fn fraction(&self, w: &[&str], path: &str) -> Result<Option<f64>> {
        match self.flavor {
            BedMethylFlavor::Percentage => {
                let percent: f64 = parse_field(w, ENCODE_PERCENT_COL, path)?;
                Ok(Some(percent / 100.0))
            }
            BedMethylFlavor::Counts => {
                let nmod: f64 = parse_field(w, MODKIT_NMOD_COL, path)?;
                let ncanonical: f64 = parse_field(w, MODKIT_NCANONICAL_COL, path)?;
                let denom = nmod + ncanonical;
                if denom > 0.0 {
                    Ok(Some(nmod / denom))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

impl ModParser for BedMethylParser {
    fn parse(&self, path: &str, cfg: &ParseConfig) -> Result<Vec<ModificationRecord>> {
        let rows = fetch_rows(path, cfg, None, |w| {
            let chr = field(w, 0, path)?;
            let start: i64 = parse_field(w, 1, path)?;
            let stop: i64 = parse_field(w, 2, path)?;

            if let Some(region) = &cfg.region {
                if !region.contains(chr, start) {
                    return Ok(None);
                }
            }

            let code: Box<str> = field(w, BEDMETHYL_CODE_COL, path)?.into();
            Ok(self
                .fraction(w, path)?
                .map(|value| {
                    let row = FreqRow {
                        chr: chr.into(),
                        start,
                        stop,
                        value,
                    };
                    (code, row)
                }))
        })?;

        let mut by_code: BTreeMap<Box<str>, Vec<FreqRow>> = BTreeMap::new();
        for (code, row) in rows {
            by_code.entry(code).or_default().push(row);
        }

        let found = join_codes(by_code.keys().map(|x| x.as_ref()));
        by_code.retain(|code, rows| cfg.keep_mod_code(code) && !rows.is_empty());

        if by_code.is_empty() {
            let requested = join_codes(cfg.mod_codes.iter().flatten().map(|x| x.as_ref()));
            return Err(MethError::ModCodesNotFound {
                path: path.into(),
                requested,
                found,
            });
        }

        let split_names = by_code.len() > 1;
        Ok(by_code
            .into_iter()
            .map(|(code, rows)| {
                let name = if split_names {
                    format!("{}_{}", cfg.name, code).into_boxed_str()
                } else {
                    cfg.name.clone()
                };
                let called_sites = rows.len();
                let rows = aggregate_and_smooth(rows, cfg.smooth);
                ModificationRecord::new(
                    &name,
                    DataType::Bedmethyl,
                    ModTable::Frequency(rows),
                    called_sites,
                )
            })
            .collect())
    }
}
