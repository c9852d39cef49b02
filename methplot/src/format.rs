use crate::common::*;
use crate::fetch::split_fields;
use crate::record::DataType;

/// How a bedMethyl file reports the modified fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedMethylFlavor {
    /// ENCODE 11-column layout; column 11 is a percentage
    Percentage,
    /// modkit pileup 18-column layout; fraction from Nmod / (Nmod + Ncanonical)
    Counts,
}

/// Input formats recognised by [`sniff`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    NanopolishCall,
    NanopolishPhased,
    NanopolishFreq,
    Nanocompore,
    Bedgraph,
    Bedmethyl(BedMethylFlavor),
    CramLike,
}

impl Format {
    pub fn data_type(&self) -> DataType {
        match self {
            Format::NanopolishCall => DataType::NanopolishCall,
            Format::NanopolishPhased => DataType::NanopolishPhased,
            Format::NanopolishFreq => DataType::NanopolishFreq,
            Format::Nanocompore => DataType::Nanocompore,
            Format::Bedgraph => DataType::Bedgraph,
            Format::Bedmethyl(_) => DataType::Bedmethyl,
            Format::CramLike => DataType::CramLike,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Bedmethyl(BedMethylFlavor::Counts) => write!(f, "bedmethyl (modkit)"),
            _ => write!(f, "{}", self.data_type()),
        }
    }
}

const BAM_MAGIC: &[u8] = b"BAM\x01";
const CRAM_MAGIC: &[u8] = b"CRAM";

const NANOCOMPORE_COLUMN: &str = "ref_id";
const NANOPOLISH_CALL_COLUMN: &str = "log_lik_ratio";
const NANOPOLISH_PHASE_COLUMN: &str = "PS";
const NANOPOLISH_FREQ_COLUMN: &str = "called_sites";

const ENCODE_BEDMETHYL_FIELDS: usize = 11;
const MODKIT_BEDMETHYL_FIELDS: usize = 18;
const BEDGRAPH_FIELDS: usize = 4;

///
/// Decide the format of `path` from its leading bytes and first line.
/// Gzip is detected by content, so the extension does not matter.
///
pub fn sniff(path: &str) -> Result<Format> {
    if !Path::new(path).exists() {
        return Err(MethError::InputNotFound(path.into()));
    }

    if is_alignment_file(path)? {
        return Ok(Format::CramLike);
    }

    let first_line = io::read_first_line(path).map_err(|e| match e.kind() {
        // binary junk that does not decode as text
        std::io::ErrorKind::InvalidData => MethError::UnrecognizedFormat { path: path.into() },
        _ => MethError::Io(e),
    })?;

    let format = first_line
        .as_deref()
        .and_then(classify_first_line)
        .ok_or_else(|| MethError::UnrecognizedFormat { path: path.into() })?;

    debug!("{} looks like {}", path, format);
    Ok(format)
}

/// CRAM by its raw magic; BAM is BGZF so the magic sits behind gzip
fn is_alignment_file(path: &str) -> Result<bool> {
    let mut raw = [0u8; 4];
    let nread = io::read_up_to(&mut std::fs::File::open(path)?, &mut raw)?;
    let raw = &raw[..nread];

    if raw == CRAM_MAGIC {
        return Ok(true);
    }

    if io::is_gzipped(path)? {
        let inflated = io::peek_bytes(path, BAM_MAGIC.len()).unwrap_or_default();
        return Ok(inflated == BAM_MAGIC);
    }

    Ok(false)
}

fn is_number(x: &str) -> bool {
    x.trim().parse::<f64>().is_ok()
}

/// Classify by the header columns, then by the shape of a headerless line
pub fn classify_first_line(line: &str) -> Option<Format> {
    if line.starts_with("track") && line.contains("bedGraph") {
        return Some(Format::Bedgraph);
    }

    let fields: Vec<&str> = split_fields(line).into_iter().map(|x| x.trim()).collect();
    let has = |name: &str| fields.iter().any(|x| *x == name);

    if has(NANOCOMPORE_COLUMN) {
        return Some(Format::Nanocompore);
    }

    if has(NANOPOLISH_CALL_COLUMN) {
        return if has(NANOPOLISH_PHASE_COLUMN) {
            Some(Format::NanopolishPhased)
        } else {
            Some(Format::NanopolishCall)
        };
    }

    if has(NANOPOLISH_FREQ_COLUMN) {
        return Some(Format::NanopolishFreq);
    }

    let coordinates_numeric = fields.len() >= 3 && is_number(fields[1]) && is_number(fields[2]);
    if !coordinates_numeric {
        return None;
    }

    match fields.len() {
        ENCODE_BEDMETHYL_FIELDS => Some(Format::Bedmethyl(BedMethylFlavor::Percentage)),
        MODKIT_BEDMETHYL_FIELDS => Some(Format::Bedmethyl(BedMethylFlavor::Counts)),
        BEDGRAPH_FIELDS if is_number(fields[3]) => Some(Format::Bedgraph),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_columns() {
        assert_eq!(
            classify_first_line("ref_id\tpos\tGMM_logit_pvalue\tKS_intensity_pvalue"),
            Some(Format::Nanocompore)
        );
        assert_eq!(
            classify_first_line(
                "chromosome\tstrand\tstart\tend\tread_name\tlog_lik_ratio\tlog_lik_methylated\tlog_lik_unmethylated\tnum_calling_strands\tnum_motifs\tsequence"
            ),
            Some(Format::NanopolishCall)
        );
        assert_eq!(
            classify_first_line("chromosome\tstart\tend\tread_name\tlog_lik_ratio\tPS\tHP"),
            Some(Format::NanopolishPhased)
        );
        assert_eq!(
            classify_first_line(
                "chromosome\tstart\tend\tnum_motifs_in_group\tcalled_sites\tcalled_sites_methylated\tmethylated_frequency\tgroup_sequence"
            ),
            Some(Format::NanopolishFreq)
        );
    }

    #[test]
    fn test_headerless_shapes() {
        assert_eq!(
            classify_first_line("chr1\t100\t101\t0.5"),
            Some(Format::Bedgraph)
        );
        assert_eq!(
            classify_first_line("track type=bedGraph name=x"),
            Some(Format::Bedgraph)
        );
        assert_eq!(
            classify_first_line("chr1\t10\t11\tm\t12\t+\t10\t11\t255,0,0\t12\t75"),
            Some(Format::Bedmethyl(BedMethylFlavor::Percentage))
        );
        assert_eq!(
            classify_first_line(
                "chr1\t10\t11\tm\t12\t+\t10\t11\t255,0,0\t12\t75.00\t9\t3\t0\t0\t1\t0\t0"
            ),
            Some(Format::Bedmethyl(BedMethylFlavor::Counts))
        );
        assert_eq!(classify_first_line("chr1\t100\t101\t0.5\tx"), None);
        assert_eq!(classify_first_line("hello world"), None);
    }

    #[test]
    fn test_modkit_mixed_delimiter() {
        assert_eq!(
            classify_first_line("chr1\t10\t11\tm\t12\t+\t10\t11\t255,0,0\t12 75.00 9 3 0 0 1 0 0"),
            Some(Format::Bedmethyl(BedMethylFlavor::Counts))
        );
    }

    #[test]
    fn test_alignment_magic() {
        use std::io::Write;

        let mut cram = tempfile::NamedTempFile::new().unwrap();
        cram.write_all(b"CRAM\x03\x00rest-of-container").unwrap();
        cram.flush().unwrap();
        assert_eq!(sniff(cram.path().to_str().unwrap()).unwrap(), Format::CramLike);

        // shorter than the magic
        let mut tiny = tempfile::NamedTempFile::new().unwrap();
        tiny.write_all(b"CR").unwrap();
        tiny.flush().unwrap();
        assert!(matches!(
            sniff(tiny.path().to_str().unwrap()),
            Err(MethError::UnrecognizedFormat { .. })
        ));
    }
}
