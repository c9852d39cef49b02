mod run_calc_freq;
mod run_differential;
mod run_extract;
mod run_sort_correct;
mod run_split_phase;

use methplot::common::*;
use run_calc_freq::*;
use run_differential::*;
use run_extract::*;
use run_sort_correct::*;
use run_split_phase::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about, term_width = 80)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalise modification data of one or more files over genomic windows
    Extract(ExtractArgs),
    /// Test allele-specific methylation between two phased frequency files
    AlleleSpecific(AlleleSpecificArgs),
    /// Test differential methylation between two groups of frequency files
    Differential(DifferentialArgs),
    /// Add Benjamini-Hochberg adjusted p-values to a result table and sort
    SortCorrect(SortCorrectArgs),
    /// Calculate per-site methylation frequencies from nanopolish calls
    CalcFreq(CalcFreqArgs),
    /// Split phased nanopolish calls by haplotype
    SplitPhase(SplitPhaseArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Extract(args) => {
            run_extract(args)?;
        }
        Commands::AlleleSpecific(args) => {
            run_allele_specific(args)?;
        }
        Commands::Differential(args) => {
            run_differential(args)?;
        }
        Commands::SortCorrect(args) => {
            run_sort_correct(args)?;
        }
        Commands::CalcFreq(args) => {
            run_calc_freq(args)?;
        }
        Commands::SplitPhase(args) => {
            run_split_phase(args)?;
        }
    }

    Ok(())
}
