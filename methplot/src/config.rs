use crate::common::*;

pub const DEFAULT_SMOOTH_WINDOW: usize = 5;
pub const DEFAULT_CHUNK_LINES: usize = 100_000;
pub const DEFAULT_INDEX_TOOL: &str = "tabix";

/// Everything a parser needs to know about one input file
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// display name; also the prefix of per-group record names
    pub name: Box<str>,
    /// restrict rows to this window; `None` reads everything
    pub region: Option<Region>,
    /// width of the centered moving average for frequency-like data
    pub smooth: usize,
    /// keep only these modification codes (bedMethyl, BAM/CRAM)
    pub mod_codes: Option<Vec<Box<str>>>,
    /// lines per chunk when scanning a file without an index
    pub chunk_lines: usize,
    /// external tool queried when a `.tbi`/`.csi` sidecar exists
    pub index_tool: Box<str>,
    /// reference fasta for CRAM decoding
    pub reference: Option<Box<str>>,
}

impl ParseConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            region: None,
            smooth: DEFAULT_SMOOTH_WINDOW,
            mod_codes: None,
            chunk_lines: DEFAULT_CHUNK_LINES,
            index_tool: DEFAULT_INDEX_TOOL.into(),
            reference: None,
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_smooth(mut self, smooth: usize) -> Self {
        self.smooth = smooth.max(1);
        self
    }

    pub fn with_mod_codes(mut self, mod_codes: Vec<Box<str>>) -> Self {
        self.mod_codes = if mod_codes.is_empty() {
            None
        } else {
            Some(mod_codes)
        };
        self
    }

    pub fn region_label(&self) -> Box<str> {
        match &self.region {
            Some(r) => r.to_string().into_boxed_str(),
            None => "genome-wide".into(),
        }
    }

    pub fn keep_mod_code(&self, code: &str) -> bool {
        match &self.mod_codes {
            Some(codes) => codes.iter().any(|c| c.as_ref() == code),
            None => true,
        }
    }
}
