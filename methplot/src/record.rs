use crate::common::*;
use serde::{Deserialize, Serialize};

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    NanopolishCall,
    NanopolishPhased,
    NanopolishFreq,
    Nanocompore,
    Bedgraph,
    Bedmethyl,
    CramLike,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NanopolishCall => "nanopolish_call",
            Self::NanopolishPhased => "nanopolish_phased",
            Self::NanopolishFreq => "nanopolish_freq",
            Self::Nanocompore => "nanocompore",
            Self::Bedgraph => "bedgraph",
            Self::Bedmethyl => "bedmethyl",
            Self::CramLike => "cram_like",
        };
        write!(f, "{}", name)
    }
}

/// One per-read call (nanopolish) or one decoded tag event (BAM/CRAM)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRow {
    pub read_id: Box<str>,
    pub chr: Box<str>,
    #[serde(with = "strand_symbol")]
    pub strand: Strand,
    pub position: i64,
    /// log-likelihood ratio or modification probability
    #[serde(with = "nan_as_null")]
    pub value: f64,
    pub mod_type: Box<str>,
    pub haplotype: Option<u8>,
}

/// Aggregated frequency of the site(s) `[start, stop)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreqRow {
    pub chr: Box<str>,
    pub start: i64,
    pub stop: i64,
    /// NaN where the moving average has no full window
    #[serde(with = "nan_as_null")]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NanocomporeRow {
    /// reference (transcript) id
    pub chr: Box<str>,
    pub position: i64,
    /// one value per column in `ModTable::Nanocompore::columns`
    pub pvalues: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModTable {
    Calls(Vec<CallRow>),
    Frequency(Vec<FreqRow>),
    Nanocompore {
        columns: Vec<Box<str>>,
        rows: Vec<NanocomporeRow>,
    },
}

impl ModTable {
    pub fn len(&self) -> usize {
        match self {
            ModTable::Calls(rows) => rows.len(),
            ModTable::Frequency(rows) => rows.len(),
            ModTable::Nanocompore { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalised modification data of one file (or one group within a file)
/// restricted to one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationRecord {
    pub table: ModTable,
    pub data_type: DataType,
    pub name: Box<str>,
    /// number of rows (or summed coverage for frequency files) before
    /// any aggregation or smoothing
    pub called_sites: usize,
    /// read id -> (first, last) aligned reference position
    pub start_end_table: Option<BTreeMap<Box<str>, (i64, i64)>>,
}

impl ModificationRecord {
    pub fn new(name: &str, data_type: DataType, table: ModTable, called_sites: usize) -> Self {
        Self {
            table,
            data_type,
            name: name.into(),
            called_sites,
            start_end_table: None,
        }
    }

    /// Tab-separated lines `name, data_type, ...row` for the tidy output
    pub fn to_tsv_lines(&self) -> Vec<Box<str>> {
        let prefix = format!("{}\t{}", self.name, self.data_type);
        match &self.table {
            ModTable::Calls(rows) => rows
                .iter()
                .map(|r| {
                    let hp = r.haplotype.map(|h| h.to_string());
                    format!(
                        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                        prefix,
                        r.read_id,
                        r.strand,
                        r.chr,
                        r.position,
                        r.value,
                        r.mod_type,
                        hp.as_deref().unwrap_or(".")
                    )
                    .into_boxed_str()
                })
                .collect(),
            ModTable::Frequency(rows) => rows
                .iter()
                .map(|r| {
                    format!("{}\t.\t.\t{}\t{}\t{}\t.\t.", prefix, r.chr, r.start, r.value)
                        .into_boxed_str()
                })
                .collect(),
            ModTable::Nanocompore { columns, rows } => rows
                .iter()
                .flat_map(|r| {
                    let prefix = &prefix;
                    columns.iter().zip(r.pvalues.iter()).map(move |(col, p)| {
                        format!(
                            "{}\t.\t.\t{}\t{}\t{}\t{}\t.",
                            prefix, r.chr, r.position, p, col
                        )
                        .into_boxed_str()
                    })
                })
                .collect(),
        }
    }
}

pub const TSV_HEADER: &str = "name\tdata_type\tread_id\tstrand\tchromosome\tposition\tvalue\tmod_type\thaplotype";

mod strand_symbol {
    use genomic_data::sam::Strand;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(strand: &Strand, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&strand.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Strand, D::Error> {
        let symbol = String::deserialize(d)?;
        Ok(Strand::from_symbol(&symbol))
    }
}

/// JSON has no NaN
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
        if x.is_nan() {
            s.serialize_none()
        } else {
            s.serialize_f64(*x)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsv_lines_carry_chromosome() {
        let rows = vec![
            FreqRow {
                chr: "chr1".into(),
                start: 100,
                stop: 101,
                value: 0.25,
            },
            FreqRow {
                chr: "chr2".into(),
                start: 100,
                stop: 101,
                value: f64::NAN,
            },
        ];
        let rec = ModificationRecord::new("s", DataType::Bedgraph, ModTable::Frequency(rows), 2);
        let lines = rec.to_tsv_lines();
        assert_eq!(lines[0].as_ref(), "s\tbedgraph\t.\t.\tchr1\t100\t0.25\t.\t.");
        assert!(lines[1].starts_with("s\tbedgraph\t.\t.\tchr2\t100\t"));
        assert_eq!(
            lines[0].split('\t').count(),
            TSV_HEADER.split('\t').count()
        );

        let calls = vec![CallRow {
            read_id: "r1".into(),
            chr: "chrX".into(),
            strand: Strand::Backward,
            position: 7,
            value: 2.5,
            mod_type: "m".into(),
            haplotype: Some(2),
        }];
        let rec = ModificationRecord::new("c", DataType::NanopolishPhased, ModTable::Calls(calls), 1);
        assert_eq!(
            rec.to_tsv_lines()[0].as_ref(),
            "c\tnanopolish_phased\tr1\t-\tchrX\t7\t2.5\tm\t2"
        );
    }
}
