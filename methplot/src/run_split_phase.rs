use methplot::common::*;
use methplot::phase::split_by_phase;

#[derive(Args, Debug)]
pub struct SplitPhaseArgs {
    #[arg(help = "Phased nanopolish calls (with PS and HP columns)")]
    input: Box<str>,

    #[arg(
        short,
        long,
        required = true,
        help = "Output prefix",
        long_help = "Output prefix. Writes `{prefix}_calls_{group}.tsv.gz` for \n\
		     phase1, phase2, unphased and homozygous calls."
    )]
    prefix: Box<str>,

    #[arg(
        long,
        default_value_t = false,
        help = "Split on the last column only",
        long_help = "Take the haplotype from the last column and ignore phase \n\
		     blocks. Writes `{prefix}_{group}.tsv.gz`."
    )]
    naive: bool,

    #[arg(short, long, help = "verbosity")]
    verbose: bool,
}

pub fn run_split_phase(args: &SplitPhaseArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let counts = split_by_phase(&args.input, &args.prefix, args.naive)?;
    for (group, n) in counts.iter() {
        info!("{}: {}", group, n);
    }
    Ok(())
}
