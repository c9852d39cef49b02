//! Decoder for the SAM base-modification tags.
//!
//! `MM` lists, per context such as `C+m?`, how many bases of that kind to
//! skip before the next modified one, counted along the read as it came
//! off the sequencer. `ML` carries one 8-bit likelihood per listed
//! modification. Legacy `Mm`/`Ml` spellings are accepted.

use crate::common::*;

use rust_htslib::bam::{self, ext::BamRecordExtensions, record::Aux};

/// probability reported when a record has `MM` but no `ML`
pub const UNKNOWN_PROBABILITY: f64 = -1.0;

const ML_SCALE: f64 = 255.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ModTagEvent {
    pub read_id: Box<str>,
    pub strand: Strand,
    pub position: i64,
    pub probability: f64,
    pub mod_code: Box<str>,
}

/// One `;`-separated entry of an `MM` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModContext {
    pub base: u8,
    pub strand: char,
    pub codes: Vec<Box<str>>,
    pub deltas: Vec<usize>,
}

/// What the decoder needs from an alignment. `seq` and `ref_positions`
/// are in the orientation stored in the file (reference-forward).
pub struct AlignedRead<'a> {
    pub read_id: &'a str,
    pub is_reverse: bool,
    pub seq: &'a [u8],
    pub ref_positions: &'a [Option<i64>],
}

fn corrupt(read_id: &str, message: impl std::fmt::Display) -> MethError {
    MethError::CorruptModTags {
        read_id: read_id.into(),
        message: message.to_string().into_boxed_str(),
    }
}

///
/// Parse the contexts of an `MM` tag value
///
pub fn parse_mm(read_id: &str, mm: &str) -> Result<Vec<ModContext>> {
    let mut ret = vec![];

    for entry in mm.split(';').map(|x| x.trim()).filter(|x| !x.is_empty()) {
        let mut parts = entry.split(',');
        let head = parts.next().unwrap_or_default();
        let head = head.trim_end_matches(['?', '.']);
        let mut chars = head.chars();

        let (Some(base), Some(strand)) = (chars.next(), chars.next()) else {
            return Err(corrupt(read_id, format!("malformed MM entry `{}`", entry)));
        };
        let code_str = chars.as_str();
        if code_str.is_empty() {
            return Err(corrupt(read_id, format!("no modification code in `{}`", entry)));
        }

        if strand == '-' {
            return Err(MethError::UnsupportedFeature(
                format!("MM entry `{}` on the opposite strand (`-`)", entry).into(),
            ));
        }
        if strand != '+' {
            return Err(corrupt(read_id, format!("bad strand marker in `{}`", entry)));
        }
        if base.eq_ignore_ascii_case(&'N') {
            return Err(MethError::UnsupportedFeature(
                format!("MM entry `{}` on any base (`N`)", entry).into(),
            ));
        }

        // a ChEBI number is a single code; letters are one code each
        let codes: Vec<Box<str>> = if code_str.chars().all(|c| c.is_ascii_digit()) {
            vec![code_str.into()]
        } else {
            code_str.chars().map(|c| c.to_string().into_boxed_str()).collect()
        };

        let deltas = parts
            .map(|d| {
                d.trim()
                    .parse::<usize>()
                    .map_err(|_| corrupt(read_id, format!("bad skip count `{}` in MM", d)))
            })
            .collect::<Result<Vec<_>>>()?;

        ret.push(ModContext {
            base: base.to_ascii_uppercase() as u8,
            strand,
            codes,
            deltas,
        });
    }
    Ok(ret)
}

/// `p_i = d_0 + ... + d_i + i`: index among same-kind bases
pub fn occurrence_indices(deltas: &[usize]) -> Vec<usize> {
    let mut acc = 0;
    deltas
        .iter()
        .enumerate()
        .map(|(i, d)| {
            acc += d;
            acc + i
        })
        .collect()
}

fn complement(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}

/// The read as sequenced
pub fn original_orientation(seq: &[u8], is_reverse: bool) -> Vec<u8> {
    if is_reverse {
        seq.iter().rev().map(|&b| complement(b)).collect()
    } else {
        seq.iter().map(|b| b.to_ascii_uppercase()).collect()
    }
}

///
/// Decode `MM`/`ML` of one read into reference-anchored events. Bases
/// without a reference coordinate (insertions, soft clips) are dropped.
///
/// * `read` - sequence and reference map of the read
/// * `mm` - value of the `MM` tag
/// * `ml` - value of the `ML` tag if present
///
pub fn decode_mod_tags(
    read: &AlignedRead,
    mm: &str,
    ml: Option<&[u8]>,
) -> Result<Vec<ModTagEvent>> {
    let read_id = read.read_id;
    if read.ref_positions.len() != read.seq.len() {
        return Err(corrupt(
            read_id,
            format!(
                "{} reference positions for {} bases",
                read.ref_positions.len(),
                read.seq.len()
            ),
        ));
    }

    let contexts = parse_mm(read_id, mm)?;
    let seq = original_orientation(read.seq, read.is_reverse);
    let refs: Vec<Option<i64>> = if read.is_reverse {
        read.ref_positions.iter().rev().copied().collect()
    } else {
        read.ref_positions.to_vec()
    };
    let strand = Strand::from_is_reverse(read.is_reverse);

    let mut ret = vec![];
    let mut ml_offset = 0;

    for ctx in contexts.iter() {
        let stride = ctx.codes.len();
        let nprobs = ctx.deltas.len() * stride;

        let probs: Option<&[u8]> = match ml {
            Some(ml) => Some(ml.get(ml_offset..(ml_offset + nprobs)).ok_or_else(|| {
                corrupt(
                    read_id,
                    format!(
                        "ML has {} values, needed {} or more",
                        ml.len(),
                        ml_offset + nprobs
                    ),
                )
            })?),
            None => None,
        };
        ml_offset += nprobs;

        let base_index: Vec<usize> = seq
            .iter()
            .enumerate()
            .filter(|(_, &b)| b == ctx.base)
            .map(|(i, _)| i)
            .collect();

        for (k, occ) in occurrence_indices(&ctx.deltas).into_iter().enumerate() {
            let Some(&seq_idx) = base_index.get(occ) else {
                return Err(corrupt(
                    read_id,
                    format!(
                        "MM asks for {} #{} but the read has only {}",
                        ctx.base as char,
                        occ + 1,
                        base_index.len()
                    ),
                ));
            };

            let Some(position) = refs[seq_idx] else {
                continue;
            };

            for (c, code) in ctx.codes.iter().enumerate() {
                let probability = match probs {
                    Some(p) => p[k * stride + c] as f64 / ML_SCALE,
                    None => UNKNOWN_PROBABILITY,
                };
                ret.push(ModTagEvent {
                    read_id: read_id.into(),
                    strand,
                    position,
                    probability,
                    mod_code: code.clone(),
                });
            }
        }
    }

    Ok(ret)
}

///
/// Reference coordinate of every base of the stored sequence; `None`
/// for insertions and soft clips
///
pub fn reference_positions_full(rec: &bam::Record) -> Vec<Option<i64>> {
    rec.aligned_pairs_full()
        .filter_map(|[read_pos, ref_pos]| read_pos.map(|_| ref_pos))
        .collect()
}

fn string_aux<'a>(rec: &'a bam::Record, tags: [&[u8]; 2]) -> Option<&'a str> {
    tags.iter().find_map(|tag| match rec.aux(tag) {
        Ok(Aux::String(s)) => Some(s),
        _ => None,
    })
}

fn u8_array_aux(rec: &bam::Record, tags: [&[u8]; 2]) -> Option<Vec<u8>> {
    tags.iter().find_map(|tag| match rec.aux(tag) {
        Ok(Aux::ArrayU8(arr)) => Some(arr.iter().collect()),
        _ => None,
    })
}

///
/// Decode the modification tags of an alignment record. A record
/// without `MM` yields nothing.
///
pub fn events_from_record(rec: &bam::Record) -> Result<Vec<ModTagEvent>> {
    let Some(mm) = string_aux(rec, [b"MM", b"Mm"]) else {
        return Ok(vec![]);
    };
    let ml = u8_array_aux(rec, [b"ML", b"Ml"]);

    let read_id = std::str::from_utf8(rec.qname())
        .map_err(|e| corrupt("?", format!("read name is not UTF-8: {}", e)))?;
    let seq = rec.seq().as_bytes();
    let ref_positions = reference_positions_full(rec);

    let read = AlignedRead {
        read_id,
        is_reverse: rec.is_reverse(),
        seq: &seq,
        ref_positions: &ref_positions,
    };
    decode_mod_tags(&read, mm, ml.as_deref())
}
