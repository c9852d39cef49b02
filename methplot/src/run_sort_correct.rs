use methplot::common::*;
use methplot::differential::correct_and_sort_table;

#[derive(Args, Debug)]
pub struct SortCorrectArgs {
    #[arg(help = "Tab-separated table with a header line")]
    input: Box<str>,

    #[arg(
        long = "pvalue-column",
        default_value = "p-value",
        help = "Name of the p-value column"
    )]
    pvalue_column: Box<str>,

    #[arg(short, long, default_value = "stdout", help = "Output file")]
    output: Box<str>,

    #[arg(short, long, help = "verbosity")]
    verbose: bool,
}

pub fn run_sort_correct(args: &SortCorrectArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if !Path::new(args.input.as_ref()).exists() {
        return Err(MethError::InputNotFound(args.input.clone()).into());
    }
    let lines = io::read_lines(&args.input)?;
    let out = correct_and_sort_table(&args.input, &lines, &args.pvalue_column)?;
    io::write_types(&out, &args.output)?;
    info!("sorted {} row(s)", out.len().saturating_sub(1));
    Ok(())
}
