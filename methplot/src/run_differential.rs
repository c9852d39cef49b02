use methplot::common::*;
use methplot::differential::{self as diff, DiffTestConfig, DIFF_TEST_HEADER};

#[derive(Args, Debug)]
pub struct AlleleSpecificArgs {
    #[arg(help = "Frequencies of haplotype 1")]
    phase1: Box<str>,

    #[arg(help = "Frequencies of haplotype 2")]
    phase2: Box<str>,

    #[arg(
        short,
        long,
        required = true,
        help = "Target intervals (bed)",
        long_help = "Target intervals in bed format. \n\
		     Overlapping intervals are merged before testing."
    )]
    bed: Box<str>,

    #[arg(
        long,
        default_value_t = diff::DEFAULT_PSEUDOCOUNT,
        help = "Pseudocount for the odds ratio"
    )]
    pseudocount: f64,

    #[arg(short, long, default_value = "stdout", help = "Output file")]
    output: Box<str>,

    #[arg(short, long, help = "verbosity")]
    verbose: bool,
}

#[derive(Args, Debug)]
pub struct DifferentialArgs {
    #[arg(
        short = 'a',
        long = "group-a",
        value_delimiter = ',',
        required = true,
        help = "Frequency files of group A",
        long_help = "Comma-separated nanopolish frequency files of group A. \n\
		     Counts of all files are pooled."
    )]
    group_a: Vec<Box<str>>,

    #[arg(
        short = 'b',
        long = "group-b",
        value_delimiter = ',',
        required = true,
        help = "Frequency files of group B"
    )]
    group_b: Vec<Box<str>>,

    #[arg(
        long,
        required = true,
        help = "Target intervals (bed)",
        long_help = "Target intervals in bed format. \n\
		     Overlapping intervals are merged before testing."
    )]
    bed: Box<str>,

    #[arg(
        long,
        default_value_t = diff::DEFAULT_PSEUDOCOUNT,
        help = "Pseudocount for the odds ratio"
    )]
    pseudocount: f64,

    #[arg(short, long, default_value = "stdout", help = "Output file")]
    output: Box<str>,

    #[arg(short, long, help = "verbosity")]
    verbose: bool,
}

fn write_rows(rows: &[diff::DiffTestRow], output: &str) -> anyhow::Result<()> {
    let mut lines: Vec<Box<str>> = vec![DIFF_TEST_HEADER.into()];
    lines.extend(rows.iter().map(|r| r.to_string().into_boxed_str()));
    io::write_types(&lines, output)?;
    Ok(())
}

pub fn run_allele_specific(args: &AlleleSpecificArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let cfg = DiffTestConfig {
        pseudocount: args.pseudocount,
    };
    let rows = diff::run_differential(
        &args.bed,
        &[args.phase1.clone()],
        &[args.phase2.clone()],
        &cfg,
    )?;
    write_rows(&rows, &args.output)?;
    info!("done");
    Ok(())
}

pub fn run_differential(args: &DifferentialArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let cfg = DiffTestConfig {
        pseudocount: args.pseudocount,
    };
    let rows = diff::run_differential(&args.bed, &args.group_a, &args.group_b, &cfg)?;
    write_rows(&rows, &args.output)?;
    info!("done");
    Ok(())
}
