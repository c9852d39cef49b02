use methplot::common::*;
use methplot::frequency::*;

#[derive(Args, Debug)]
pub struct CalcFreqArgs {
    #[arg(help = "nanopolish call-methylation output")]
    input: Box<str>,

    #[arg(
        short = 'c',
        long = "call-threshold",
        default_value_t = DEFAULT_CALL_THRESHOLD,
        help = "Minimum |log likelihood ratio| per motif",
        long_help = "Calls with |log_lik_ratio| below this value times the \n\
		     number of motifs are considered ambiguous and skipped."
    )]
    call_threshold: f64,

    #[arg(
        short = 's',
        long = "split-groups",
        default_value_t = false,
        help = "Report each CpG of a group separately"
    )]
    split_groups: bool,

    #[arg(
        long = "no-header",
        default_value_t = false,
        help = "The input has no header line"
    )]
    no_header: bool,

    #[arg(short, long, default_value = "stdout", help = "Output file")]
    output: Box<str>,

    #[arg(short, long, help = "verbosity")]
    verbose: bool,
}

pub fn run_calc_freq(args: &CalcFreqArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let opts = FrequencyOptions {
        call_threshold: args.call_threshold,
        split_groups: args.split_groups,
        no_header: args.no_header,
    };

    let sites = calculate_frequency(&args.input, &opts)?;
    let mut lines: Vec<Box<str>> = vec![FREQUENCY_HEADER.into()];
    lines.extend(sites.iter().map(|s| s.to_string().into_boxed_str()));
    io::write_types(&lines, &args.output)?;
    info!("{} site(s)", sites.len());
    Ok(())
}
