use crate::common::*;
use crate::config::ParseConfig;
use crate::fetch::{fetch_rows, field, parse_field, ColumnIndex};
use crate::parsers::ModParser;
use crate::record::*;

/// p-value used for missing entries and for the boundary row
const NULL_PVALUE: f64 = 1.0;

/// Per-position p-values of `nanocompore sampcomp`
pub struct NanocomporeParser;

fn parse_pvalue(x: Option<&&str>) -> f64 {
    x.and_then(|x| x.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite())
        .unwrap_or(NULL_PVALUE)
}

impl ModParser for NanocomporeParser {
    fn parse(&self, path: &str, cfg: &ParseConfig) -> Result<Vec<ModificationRecord>> {
        let header = ColumnIndex::from_file(path)?;
        let pos_col = header.require("pos")?;
        let ref_col = header.require("ref_id")?;

        let (pvalue_cols, columns): (Vec<usize>, Vec<Box<str>>) = header
            .names()
            .iter()
            .enumerate()
            .filter(|(_, name)| name.contains("pvalue"))
            .map(|(j, name)| (j, name.clone()))
            .unzip();

        if columns.is_empty() {
            return Err(MethError::MissingColumn {
                path: path.into(),
                column: "*pvalue*".into(),
            });
        }

        let mut rows = fetch_rows(path, cfg, Some(&header), |w| {
            let ref_id = field(w, ref_col, path)?;
            let position: i64 = parse_field(w, pos_col, path)?;
            if let Some(region) = &cfg.region {
                if !region.contains(ref_id, position) {
                    return Ok(None);
                }
            }
            Ok(Some(NanocomporeRow {
                chr: ref_id.into(),
                position,
                pvalues: pvalue_cols.iter().map(|&j| parse_pvalue(w.get(j))).collect(),
            }))
        })?;

        rows.sort_by(|a, b| a.chr.cmp(&b.chr).then_with(|| a.position.cmp(&b.position)));
        let called_sites = rows.len();

        // so that a line drawn through the p-values reaches the window end
        if let Some(region) = &cfg.region {
            rows.push(NanocomporeRow {
                chr: region.chr.clone(),
                position: region.stop,
                pvalues: vec![NULL_PVALUE; columns.len()],
            });
        }

        Ok(vec![ModificationRecord::new(
            &cfg.name,
            DataType::Nanocompore,
            ModTable::Nanocompore { columns, rows },
            called_sites,
        )])
    }
}
