use crate::common::*;
use crate::config::ParseConfig;
use crate::modtags::{events_from_record, ModTagEvent};
use crate::parsers::{join_codes, ModParser};
use crate::record::*;

use rust_htslib::bam::{self, Read};

/// BAM/CRAM alignments carrying `MM`/`ML` tags
pub struct AlignmentParser;

const INDEX_SUFFIXES: [&str; 3] = ["bai", "csi", "crai"];

/// Build a random-access index next to the alignment file if none is there
fn check_alignment_index(path: &str) -> Result<()> {
    let exists = INDEX_SUFFIXES
        .iter()
        .any(|ext| Path::new(&format!("{}.{}", path, ext)).exists());
    if !exists {
        info!("building an index for {}", path);
        bam::index::build(path, None, bam::index::Type::Bai, 1)?;
    }
    Ok(())
}

/// Gathers decoded events and read spans while visiting alignments
struct ModEventCollector<'a> {
    region: Option<&'a Region>,
    /// reference names indexed by tid
    target_names: Vec<Box<str>>,
    events: Vec<(Box<str>, ModTagEvent)>,
    extents: HashMap<Box<str>, (i64, i64)>,
    nskipped: usize,
}

impl<'a> ModEventCollector<'a> {
    fn new(region: Option<&'a Region>, header: &bam::HeaderView) -> Self {
        let target_names = header
            .target_names()
            .iter()
            .map(|x| String::from_utf8_lossy(x).into())
            .collect();
        Self {
            region,
            target_names,
            events: vec![],
            extents: HashMap::default(),
            nskipped: 0,
        }
    }

    fn update(&mut self, rec: &bam::Record) -> Result<()> {
        if rec.is_unmapped() || rec.is_secondary() || rec.is_supplementary() {
            self.nskipped += 1;
            return Ok(());
        }

        let events = events_from_record(rec)?;
        if events.is_empty() {
            return Ok(());
        }

        let Some(chr) = usize::try_from(rec.tid())
            .ok()
            .and_then(|tid| self.target_names.get(tid))
        else {
            self.nskipped += 1;
            return Ok(());
        };

        let first = rec.pos();
        let last = rec.cigar().end_pos();
        let mut any_kept = false;

        for ev in events {
            let inside = match self.region {
                Some(r) => r.contains(chr, ev.position),
                None => true,
            };
            if inside {
                any_kept = true;
                self.events.push((chr.clone(), ev));
            }
        }

        if any_kept {
            let read_id: Box<str> = String::from_utf8_lossy(rec.qname()).into();
            self.extents.insert(read_id, (first, last));
        }
        Ok(())
    }

    fn into_records(self, path: &str, cfg: &ParseConfig) -> Result<Vec<ModificationRecord>> {
        debug!(
            "{}: {} events; {} unmapped/secondary/supplementary alignments skipped",
            path,
            self.events.len(),
            self.nskipped
        );

        if self.events.is_empty() {
            return Err(match &cfg.region {
                Some(region) => MethError::EmptyRegion {
                    path: path.into(),
                    region: region.to_string().into_boxed_str(),
                },
                None => MethError::parse(path, "no alignments with modification tags"),
            });
        }

        let mut by_code: BTreeMap<Box<str>, Vec<CallRow>> = BTreeMap::new();
        for (chr, ev) in self.events {
            by_code.entry(ev.mod_code.clone()).or_default().push(CallRow {
                read_id: ev.read_id,
                chr,
                strand: ev.strand,
                position: ev.position,
                value: ev.probability,
                mod_type: ev.mod_code,
                haplotype: None,
            });
        }

        let found = join_codes(by_code.keys().map(|x| x.as_ref()));
        by_code.retain(|code, _| cfg.keep_mod_code(code));
        if by_code.is_empty() {
            return Err(MethError::ModCodesNotFound {
                path: path.into(),
                requested: join_codes(cfg.mod_codes.iter().flatten().map(|x| x.as_ref())),
                found,
            });
        }

        Ok(by_code
            .into_iter()
            .map(|(code, mut rows)| {
                rows.sort_by(|a, b| {
                    a.read_id
                        .cmp(&b.read_id)
                        .then_with(|| a.chr.cmp(&b.chr))
                        .then_with(|| a.position.cmp(&b.position))
                });
                let extents: BTreeMap<Box<str>, (i64, i64)> = rows
                    .iter()
                    .filter_map(|r| {
                        self.extents
                            .get(&r.read_id)
                            .map(|&ext| (r.read_id.clone(), ext))
                    })
                    .collect();
                let called_sites = rows.len();
                let name = format!("{}_{}", cfg.name, code);
                let mut rec = ModificationRecord::new(
                    &name,
                    DataType::CramLike,
                    ModTable::Calls(rows),
                    called_sites,
                );
                rec.start_end_table = Some(extents);
                rec
            })
            .collect())
    }
}

impl ModParser for AlignmentParser {
    fn parse(&self, path: &str, cfg: &ParseConfig) -> Result<Vec<ModificationRecord>> {
        match &cfg.region {
            Some(region) => {
                check_alignment_index(path)?;
                let mut reader = bam::IndexedReader::from_path(path)?;
                if let Some(fasta) = &cfg.reference {
                    reader.set_reference(fasta.as_ref())?;
                }
                reader.fetch((region.chr.as_ref(), region.start, region.stop))?;
                let mut collector = ModEventCollector::new(Some(region), reader.header());
                for rec in reader.records() {
                    collector.update(&rec?)?;
                }
                collector.into_records(path, cfg)
            }
            None => {
                let mut reader = bam::Reader::from_path(path)?;
                if let Some(fasta) = &cfg.reference {
                    reader.set_reference(fasta.as_ref())?;
                }
                let mut collector = ModEventCollector::new(None, reader.header());
                for rec in reader.records() {
                    collector.update(&rec?)?;
                }
                collector.into_records(path, cfg)
            }
        }
    }
}
