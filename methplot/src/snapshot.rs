//! Gzipped JSON dump of the records of one window, for reuse by later
//! runs of the same version. Not meant as an exchange format.

use crate::common::*;
use crate::record::ModificationRecord;

use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub region: Option<Region>,
    pub records: Vec<ModificationRecord>,
}

/// `methplot-data-{region key}.json.gz` under `dir`
pub fn snapshot_path(dir: &str, region: Option<&Region>) -> Box<str> {
    let key = region
        .map(|r| r.key())
        .unwrap_or_else(|| "genome".into());
    Path::new(dir)
        .join(format!("methplot-data-{}.json.gz", key))
        .to_string_lossy()
        .into()
}

pub fn store(path: &str, region: Option<&Region>, records: &[ModificationRecord]) -> Result<()> {
    io::mkdir(path)?;
    let mut buf = io::open_buf_writer(path)?;
    let snapshot = SnapshotRef { region, records };
    serde_json::to_writer(&mut buf, &snapshot)?;
    buf.flush()?;
    info!("stored {} record(s) in {}", records.len(), path);
    Ok(())
}

pub fn load(path: &str) -> Result<Snapshot> {
    if !Path::new(path).exists() {
        return Err(MethError::InputNotFound(path.into()));
    }
    let buf = io::open_buf_reader(path)?;
    Ok(serde_json::from_reader(buf)?)
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    region: Option<&'a Region>,
    records: &'a [ModificationRecord],
}
