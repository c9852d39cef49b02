use methplot::common::*;
use methplot::config::*;
use methplot::extract::{extract_windows, ExtractInput};

use genomic_data::region::{make_windows, read_fasta_index};

#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[arg(
        short = 'm',
        long = "methylation",
        value_delimiter = ',',
        required = true,
        help = "Modification data files",
        long_help = "Comma-separated list of modification data files. \n\
		     Supported: nanopolish calls (phased or not), nanopolish frequencies, \n\
		     nanocompore results, bedgraph, bedMethyl and BAM/CRAM with MM/ML tags. \n\
		     The format of each file is detected from its content."
    )]
    files: Vec<Box<str>>,

    #[arg(
        short = 'n',
        long,
        value_delimiter = ',',
        help = "Display names, one per file",
        long_help = "Comma-separated display names, one per file. \n\
		     Defaults to the file names without extensions."
    )]
    names: Vec<Box<str>>,

    #[arg(
        short = 'w',
        long,
        help = "Window `chr:begin-end` or a contig name",
        long_help = "Genomic window `chr:begin-end` (commas allowed) or the name \n\
		     of a contig/transcript listed in the fasta index. \n\
		     Without a window every row of every file is reported."
    )]
    window: Option<Box<str>>,

    #[arg(
        short = 'f',
        long,
        help = "Reference fasta (with `.fai`)",
        long_help = "Reference fasta. Its `.fai` index resolves contig names \n\
		     given as windows, and the fasta itself is used to decode CRAM."
    )]
    fasta: Option<Box<str>>,

    #[arg(
        long = "max-window",
        help = "Split windows larger than this (bp)",
        long_help = "Split windows larger than this many bases into abutting \n\
		     chunks of (nearly) equal size, processed one after another."
    )]
    max_window: Option<i64>,

    #[arg(
        long,
        default_value_t = DEFAULT_SMOOTH_WINDOW,
        help = "Smoothing window for frequency data",
        long_help = "Number of sites in the centered moving average applied \n\
		     to frequency, bedgraph and bedMethyl data."
    )]
    smooth: usize,

    #[arg(
        long = "mod-codes",
        value_delimiter = ',',
        help = "Keep only these modification codes",
        long_help = "Comma-separated modification codes (e.g. m,h) to keep \n\
		     from bedMethyl and BAM/CRAM input. Default: all."
    )]
    mod_codes: Vec<Box<str>>,

    #[arg(
        long = "chunk-lines",
        default_value_t = DEFAULT_CHUNK_LINES,
        help = "Lines per chunk when scanning unindexed files"
    )]
    chunk_lines: usize,

    #[arg(
        long = "index-tool",
        default_value = DEFAULT_INDEX_TOOL,
        help = "Tool for querying `.tbi`/`.csi` indexed files"
    )]
    index_tool: Box<str>,

    #[arg(
        long,
        help = "Directory for snapshots of the parsed records",
        long_help = "Write the records of every window to \n\
		     `{dir}/methplot-data-{chr}_{begin}_{end}.json.gz`."
    )]
    store: Option<Box<str>>,

    #[arg(short, long, default_value = "stdout", help = "Output file")]
    output: Box<str>,

    #[arg(
        long = "keep-going",
        default_value_t = false,
        help = "Skip files that fail to parse instead of stopping"
    )]
    keep_going: bool,

    #[arg(short, long, help = "verbosity")]
    verbose: bool,
}

fn display_names(args: &ExtractArgs) -> anyhow::Result<Vec<Box<str>>> {
    if args.names.is_empty() {
        return Ok(args
            .files
            .iter()
            .map(|f| io::basename(f).unwrap_or_else(|| f.clone()))
            .collect());
    }
    if args.names.len() != args.files.len() {
        return Err(anyhow::anyhow!(
            "{} names for {} files",
            args.names.len(),
            args.files.len()
        ));
    }
    Ok(args.names.clone())
}

pub fn run_extract(args: &ExtractArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let names = display_names(args)?;

    let seq_lengths = match &args.fasta {
        Some(fasta) => Some(read_fasta_index(&format!("{}.fai", fasta))?),
        None => None,
    };

    let windows: Vec<Option<Region>> = match &args.window {
        Some(w) => make_windows(w, seq_lengths.as_ref(), args.max_window)?
            .into_iter()
            .map(Some)
            .collect(),
        None => vec![None],
    };

    let inputs: Vec<ExtractInput> = args
        .files
        .iter()
        .zip(names.iter())
        .map(|(file, name)| {
            let mut cfg = ParseConfig::new(name)
                .with_smooth(args.smooth)
                .with_mod_codes(args.mod_codes.clone());
            cfg.chunk_lines = args.chunk_lines;
            cfg.index_tool = args.index_tool.clone();
            cfg.reference = args.fasta.clone();
            ExtractInput {
                path: file.clone(),
                cfg,
            }
        })
        .collect();

    let mut out = io::open_buf_writer(&args.output)?;
    let nwin = extract_windows(
        &inputs,
        &windows,
        args.keep_going,
        args.store.as_deref(),
        &mut out,
    )?;
    info!("{} of {} window(s) written", nwin, windows.len());
    info!("done");
    Ok(())
}
