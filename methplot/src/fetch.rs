use crate::common::*;
use crate::config::ParseConfig;

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};

/// Header of a tab-separated table
pub struct ColumnIndex {
    path: Box<str>,
    names: Vec<Box<str>>,
}

impl ColumnIndex {
    /// Take the header from the first non-empty line of `path`
    pub fn from_file(path: &str) -> Result<Self> {
        let line = io::read_first_line(path)?
            .ok_or_else(|| MethError::parse(path, "empty file; expected a header line"))?;
        Ok(Self::from_line(path, &line))
    }

    pub fn from_line(path: &str, line: &str) -> Self {
        Self {
            path: path.into(),
            names: line.split('\t').map(|x| x.trim().into()).collect(),
        }
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|x| x.as_ref() == name)
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.find(name).ok_or_else(|| MethError::MissingColumn {
            path: self.path.clone(),
            column: name.into(),
        })
    }

    pub fn names(&self) -> &[Box<str>] {
        &self.names
    }

    fn is_header(&self, line: &str) -> bool {
        line.split('\t')
            .map(|x| x.trim())
            .eq(self.names.iter().map(|x| x.as_ref()))
    }
}

fn is_meta_line(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

/// A `.tbi` or `.csi` index next to the file
pub fn has_index_sidecar(path: &str) -> bool {
    ["tbi", "csi"]
        .iter()
        .any(|ext| Path::new(&format!("{}.{}", path, ext)).exists())
}

/// modkit `--mixed-delimiter` pileups: tabs up to here, spaces after
const MIXED_DELIMITER_TAB_FIELDS: usize = 10;

/// Split a data line on tabs; a trailing space-separated block after
/// the tenth tab field is split on spaces too
pub fn split_fields(line: &str) -> Vec<&str> {
    let mut words: Vec<&str> = line.split('\t').collect();
    if words.len() == MIXED_DELIMITER_TAB_FIELDS {
        if let Some(last) = words.pop() {
            words.extend(last.split_whitespace());
        }
    }
    words
}

/// Field accessor shared by the per-format row parsers
pub fn field<'a>(words: &[&'a str], idx: usize, path: &str) -> Result<&'a str> {
    words
        .get(idx)
        .copied()
        .ok_or_else(|| MethError::parse(path, format!("row has no column #{}", idx + 1)))
}

pub fn parse_field<T>(words: &[&str], idx: usize, path: &str) -> Result<T>
where
    T: std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    let x = field(words, idx, path)?;
    x.trim().parse::<T>().map_err(|e| {
        MethError::parse(path, format!("column #{} value `{}`: {}", idx + 1, x, e))
    })
}

///
/// Retrieve the rows of a tab-separated file, restricted to the region
/// of `cfg` when there is one.
///
/// * with a region and a `.tbi`/`.csi` sidecar, only the region is
///   pulled out through the external index tool
/// * with a region but no index, the file is scanned chunk by chunk
/// * without a region, every row is visited
///
/// `parse_row` receives the tab-split words of each data row and keeps
/// it by returning `Some`. It is responsible for the region test.
///
/// * `header` - header of the file, if it has one; its line is skipped
///
pub fn fetch_rows<T, F>(
    path: &str,
    cfg: &ParseConfig,
    header: Option<&ColumnIndex>,
    mut parse_row: F,
) -> Result<Vec<T>>
where
    F: FnMut(&[&str]) -> Result<Option<T>>,
{
    let mut ret = vec![];

    let mut visit = |line: &str| -> Result<()> {
        let line = line.trim_end_matches(['\n', '\r']);
        if is_meta_line(line) || header.is_some_and(|h| h.is_header(line)) {
            return Ok(());
        }
        let words = split_fields(line);
        if let Some(x) = parse_row(&words)? {
            ret.push(x);
        }
        Ok(())
    };

    match &cfg.region {
        Some(region) if has_index_sidecar(path) => {
            fetch_indexed(path, region, &cfg.index_tool, &mut visit)?;
        }
        Some(region) => {
            warn!(
                "{} has no index; scanning the whole file for {} (slower, consider bgzip + tabix)",
                path, region
            );
            scan_in_chunks(path, cfg.chunk_lines, &mut visit)?;
        }
        None => {
            let buf = io::open_buf_reader(path)?;
            for line in buf.lines() {
                visit(&line?)?;
            }
        }
    }

    if ret.is_empty() {
        return Err(match &cfg.region {
            Some(region) => MethError::EmptyRegion {
                path: path.into(),
                region: region.to_string().into_boxed_str(),
            },
            None => MethError::parse(path, "no data rows"),
        });
    }

    debug!("{}: {} rows for {}", path, ret.len(), cfg.region_label());
    Ok(ret)
}

fn fetch_indexed<V>(path: &str, region: &Region, tool: &str, visit: &mut V) -> Result<()>
where
    V: FnMut(&str) -> Result<()>,
{
    // 1-based, inclusive
    let query = format!("{}:{}-{}", region.chr, region.start + 1, region.stop);
    info!("{} {} {}", tool, path, query);

    let mut child = Command::new(tool)
        .arg(path)
        .arg(&query)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| MethError::ExternalToolUnavailable {
            tool: tool.into(),
            source,
        })?;

    // drained on its own thread so a chatty tool cannot block on a full pipe
    let stderr = child.stderr.take().map(|mut err| {
        std::thread::spawn(move || {
            let mut msg = String::new();
            let _ = err.read_to_string(&mut msg);
            msg
        })
    });

    let mut visit_all = || -> Result<()> {
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                visit(&line?)?;
            }
        }
        Ok(())
    };

    if let Err(e) = visit_all() {
        let _ = child.kill();
        let _ = child.wait();
        return Err(e);
    }

    let status = child.wait()?;
    let msg = stderr
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    if !status.success() {
        return Err(MethError::parse(
            path,
            format!("`{} {} {}` failed: {}", tool, path, query, msg.trim()),
        ));
    }
    Ok(())
}

fn scan_in_chunks<V>(path: &str, chunk_lines: usize, visit: &mut V) -> Result<()>
where
    V: FnMut(&str) -> Result<()>,
{
    let chunk_lines = chunk_lines.max(1);
    let mut lines = io::open_buf_reader(path)?.lines();
    let mut chunk: Vec<String> = Vec::with_capacity(chunk_lines);
    let mut nchunks = 0;

    loop {
        chunk.clear();
        for line in lines.by_ref().take(chunk_lines) {
            chunk.push(line?);
        }
        if chunk.is_empty() {
            break;
        }
        nchunks += 1;
        for line in chunk.iter() {
            visit(line)?;
        }
    }

    debug!("{}: scanned {} chunk(s)", path, nchunks);
    Ok(())
}
