use crate::common::*;
use crate::config::ParseConfig;
use crate::parsers::parse_file;
use crate::record::{ModificationRecord, TSV_HEADER};
use crate::snapshot;

use std::io::Write;

/// One input file and how to read it; the region is filled in per window
pub struct ExtractInput {
    pub path: Box<str>,
    pub cfg: ParseConfig,
}

/// Parse every input for each window and append the rows to `out`,
/// one window at a time. Rows of a window are written (and dropped)
/// before the next window is parsed.
///
/// * `windows` - `None` reads every row of every file
/// * `keep_going` - skip inputs that fail instead of stopping
/// * `store` - directory for per-window snapshots
///
/// Returns the number of windows written.
pub fn extract_windows<W>(
    inputs: &[ExtractInput],
    windows: &[Option<Region>],
    keep_going: bool,
    store: Option<&str>,
    out: &mut W,
) -> Result<usize>
where
    W: Write + ?Sized,
{
    if !io::append_lines(out, &[format!("window\t{}", TSV_HEADER)])? {
        return Ok(0);
    }

    let mut nwritten = 0;
    for region in windows.iter() {
        let label: Box<str> = match region {
            Some(r) => r.to_string().into_boxed_str(),
            None => ".".into(),
        };

        let mut records: Vec<ModificationRecord> = vec![];
        for input in inputs.iter() {
            let mut cfg = input.cfg.clone();
            cfg.region = region.clone();
            match parse_file(&input.path, &cfg) {
                Ok(recs) => records.extend(recs),
                Err(e) if keep_going => {
                    warn!("skipping {}: {}", input.path, e);
                }
                Err(e) => return Err(e),
            }
        }

        if records.is_empty() {
            warn!("no data for window {}", label);
            continue;
        }

        if let Some(dir) = store {
            let path = snapshot::snapshot_path(dir, region.as_ref());
            snapshot::store(&path, region.as_ref(), &records)?;
        }

        let lines: Vec<Box<str>> = records
            .iter()
            .flat_map(|rec| rec.to_tsv_lines())
            .map(|x| format!("{}\t{}", label, x).into_boxed_str())
            .collect();

        info!("window {}: {} record(s)", label, records.len());
        if !io::append_lines(out, &lines)? {
            return Ok(nwritten);
        }
        match out.flush() {
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(nwritten),
            res => res?,
        }
        nwritten += 1;
    }
    Ok(nwritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn bedgraph() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t0\t100\t0.2").unwrap();
        writeln!(file, "chr1\t100\t200\t0.4").unwrap();
        writeln!(file, "chr2\t0\t100\t0.8").unwrap();
        file.flush().unwrap();
        file
    }

    fn windows(specs: &[&str]) -> Vec<Option<Region>> {
        specs.iter().map(|w| Some(w.parse().unwrap())).collect()
    }

    #[test]
    fn test_windows_written_in_order() {
        let file = bedgraph();
        let inputs = vec![ExtractInput {
            path: file.path().to_str().unwrap().into(),
            cfg: ParseConfig::new("bg").with_smooth(1),
        }];

        let mut out: Vec<u8> = vec![];
        let nwin = extract_windows(
            &inputs,
            &windows(&["chr1:0-200", "chr2:0-100"]),
            false,
            None,
            &mut out,
        )
        .unwrap();
        assert_eq!(nwin, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("window\t{}", TSV_HEADER));
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("chr1:0-200\tbg\t"));
        assert!(lines[3].starts_with("chr2:0-100\tbg\t"));
        assert!(lines[3].contains("\tchr2\t"));
    }

    #[test]
    fn test_failed_window_after_written_ones() {
        let file = bedgraph();
        let inputs = vec![ExtractInput {
            path: file.path().to_str().unwrap().into(),
            cfg: ParseConfig::new("bg").with_smooth(1),
        }];
        let wins = windows(&["chr1:0-200", "chr3:0-100"]);

        // chr1 reaches the writer before chr3 fails
        let mut out: Vec<u8> = vec![];
        let res = extract_windows(&inputs, &wins, false, None, &mut out);
        assert!(matches!(res, Err(MethError::EmptyRegion { .. })));
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);

        let mut out: Vec<u8> = vec![];
        let nwin = extract_windows(&inputs, &wins, true, None, &mut out).unwrap();
        assert_eq!(nwin, 1);
    }
}
