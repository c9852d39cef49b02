use genomic_data::sam::Strand;
use methplot::config::ParseConfig;
use methplot::modtags::events_from_record;
use methplot::parsers::parse_file;
use methplot::record::*;

use rust_htslib::bam::{self, header, Header, HeaderView};
use tempfile::TempDir;

const SAM_LINES: [&[u8]; 3] = [
    b"r1\t0\tchr1\t101\t60\t6M\t*\t0\t0\tCGCGCG\tIIIIII\tMM:Z:C+m,0,1;\tML:B:C,255,128",
    b"r2\t16\tchr1\t201\t60\t4M\t*\t0\t0\tCCGA\tIIII\tMM:Z:C+m?,0;\tML:B:C,200",
    b"r3\t4\t*\t0\t0\t*\t*\t0\t0\tCG\tII\tMM:Z:C+m,0;\tML:B:C,10",
];

fn test_header() -> Header {
    let mut hdr = Header::new();
    hdr.push_record(
        header::HeaderRecord::new(b"SQ")
            .push_tag(b"SN", "chr1")
            .push_tag(b"LN", 1000),
    );
    hdr
}

fn write_bam(dir: &TempDir) -> anyhow::Result<String> {
    let hdr = test_header();
    let view = HeaderView::from_header(&hdr);
    let path = dir.path().join("reads.bam").to_string_lossy().to_string();
    let mut writer = bam::Writer::from_path(&path, &hdr, bam::Format::Bam)?;
    for line in SAM_LINES {
        writer.write(&bam::Record::from_sam(&view, line)?)?;
    }
    drop(writer);
    Ok(path)
}

#[test]
fn decode_forward_and_reverse_records() -> anyhow::Result<()> {
    let view = HeaderView::from_header(&test_header());

    let fwd = bam::Record::from_sam(&view, SAM_LINES[0])?;
    let events = events_from_record(&fwd)?;
    let positions: Vec<i64> = events.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![100, 104]);
    assert!(events.iter().all(|e| e.strand == Strand::Forward));

    let rev = bam::Record::from_sam(&view, SAM_LINES[1])?;
    let events = events_from_record(&rev)?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].position, 202);
    assert_eq!(events[0].strand, Strand::Backward);
    assert!((events[0].probability - 200.0 / 255.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn reverse_record_with_several_sites() -> anyhow::Result<()> {
    let view = HeaderView::from_header(&test_header());
    let rec = bam::Record::from_sam(
        &view,
        b"r4\t16\tchr1\t301\t60\t2M1I3M\t*\t0\t0\tCGACGT\tIIIIII\tMM:Z:C+m,0,0;\tML:B:C,10,20",
    )?;
    // as sequenced: ACGTCG; its Cs are stored at indices 4 and 1
    let events = events_from_record(&rec)?;
    let positions: Vec<i64> = events.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![303, 301]);
    assert!((events[0].probability - 10.0 / 255.0).abs() < 1e-12);
    assert!((events[1].probability - 20.0 / 255.0).abs() < 1e-12);
    assert!(events.iter().all(|e| e.strand == Strand::Backward));
    Ok(())
}

#[test]
fn bam_genome_wide_and_windowed() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = write_bam(&dir)?;

    let records = parse_file(&path, &ParseConfig::new("bam"))?;
    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!(rec.name.as_ref(), "bam_m");
    assert_eq!(rec.data_type, DataType::CramLike);

    let ModTable::Calls(rows) = &rec.table else {
        panic!("expected calls");
    };
    let keys: Vec<(&str, i64)> = rows
        .iter()
        .map(|r| (r.read_id.as_ref(), r.position))
        .collect();
    // the unmapped read is skipped
    assert_eq!(keys, vec![("r1", 100), ("r1", 104), ("r2", 202)]);
    assert!(rows.iter().all(|r| r.chr.as_ref() == "chr1"));

    let extents = rec.start_end_table.as_ref().expect("read extents");
    assert_eq!(extents.get("r1"), Some(&(100, 106)));
    assert_eq!(extents.get("r2"), Some(&(200, 204)));

    let windowed = ParseConfig::new("bam").with_region("chr1:150-300".parse()?);
    let records = parse_file(&path, &windowed)?;
    let ModTable::Calls(rows) = &records[0].table else {
        panic!("expected calls");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].strand, Strand::Backward);
    assert!(std::path::Path::new(&format!("{}.bai", path)).exists());
    Ok(())
}
