use crate::common_io::open_buf_reader;
use std::collections::BTreeMap;
use std::io::{self, BufRead};

#[derive(Debug, Hash, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bed {
    pub chr: Box<str>,
    pub start: i64,
    pub stop: i64,
}

/// display interval name
impl std::fmt::Display for Bed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chr, self.start, self.stop)
    }
}

fn is_bed_header(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

///
/// Read the first three columns of a BED file. Strand and any other
/// columns are ignored.
///
/// * `bed_file` - file name--either gzipped or not
///
pub fn read_bed(bed_file: &str) -> io::Result<Vec<Bed>> {
    let buf = open_buf_reader(bed_file)?;
    let mut ret = vec![];

    for (line_no, line) in buf.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if is_bed_header(line) {
            continue;
        }
        let mut words = line.split('\t');
        let (chr, start, stop) = match (words.next(), words.next(), words.next()) {
            (Some(chr), Some(start), Some(stop)) => (chr, start, stop),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{}:{}: expected at least 3 columns", bed_file, line_no + 1),
                ))
            }
        };
        let parse = |x: &str| {
            x.trim().parse::<i64>().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{}:{}: {}", bed_file, line_no + 1, e),
                )
            })
        };
        ret.push(Bed {
            chr: chr.into(),
            start: parse(start)?,
            stop: parse(stop)?,
        });
    }
    Ok(ret)
}

///
/// Merge overlapping and book-ended intervals on each chromosome.
/// The output is sorted by chromosome and start.
///
pub fn merge_overlapping(beds: Vec<Bed>) -> Vec<Bed> {
    let mut chr_to_beds: BTreeMap<Box<str>, Vec<Bed>> = BTreeMap::new();
    for bed in beds {
        chr_to_beds.entry(bed.chr.clone()).or_default().push(bed);
    }

    let mut ret = vec![];
    for (_, mut beds) in chr_to_beds {
        beds.sort();
        let mut iter = beds.into_iter();
        let Some(mut current) = iter.next() else {
            continue;
        };
        for bed in iter {
            if bed.start <= current.stop {
                current.stop = current.stop.max(bed.stop);
            } else {
                ret.push(current);
                current = bed;
            }
        }
        ret.push(current);
    }
    ret
}
