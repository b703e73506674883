use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};

use crate::context::simulate;
use crate::error::SirError;
use crate::log::{set_log_level, LevelFilter, ModuleFilter};
use crate::parameters::Parameters;
use crate::replicates::{run_replicates, Replicate, ReplicateSummary};
use crate::report::{write_output, write_summary, ReportOptions};

/// Default cli arguments for the ixa-sir runner
#[derive(Args, Debug, Clone)]
pub struct BaseArgs {
    /// Path to the JSON parameters file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Random seed. Overrides the seed in the parameters file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Directory for report output
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Prefix prepended to every report file name
    #[arg(long, default_value = "")]
    pub file_prefix: String,

    /// Overwrite existing report files
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Number of independent runs, seeded with consecutive seeds
    #[arg(long, default_value_t = 1)]
    pub replicates: usize,

    /// Worker threads used when running replicates
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,

    /// Enable logging at the given level (error, warn, info, debug, trace)
    #[arg(short, long)]
    pub log_level: Option<LevelFilter>,

    /// Level for one module path, e.g. `ixa_sir::context=trace`. Repeatable
    #[arg(long = "log-filter", value_name = "MODULE=LEVEL")]
    pub log_filters: Vec<ModuleFilter>,
}

fn create_cli() -> Command {
    let cli = Command::new("ixa-sir")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Individual-based SIR epidemic simulation");
    BaseArgs::augment_args(cli)
}

/// Parses the command line, runs the simulation and writes its reports.
///
/// # Errors
/// Returns an error if argument parsing, parameter loading, the run or
/// report writing fails
pub fn run_with_args() -> Result<Vec<Replicate>, Box<dyn std::error::Error>> {
    let matches = create_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    Ok(run_with_args_internal(&args)?)
}

/// Runs the simulation described by already-parsed `args`.
///
/// A single run writes `series.csv`, `transitions.csv` and `summary.csv`.
/// With more than one replicate each run's series and transitions get a
/// `_seed<k>` suffix and `summary.csv` has one row per replicate.
///
/// # Errors
/// Returns a `SirError` if the parameters are invalid or a report cannot be
/// written
pub fn run_with_args_internal(args: &BaseArgs) -> Result<Vec<Replicate>, SirError> {
    if let Some(level) = args.log_level {
        set_log_level(level);
    }
    for filter in &args.log_filters {
        filter.apply();
    }

    println!("Loading parameters from: {}", args.config.display());
    let mut parameters = Parameters::from_json_file(&args.config)?;
    if let Some(seed) = args.random_seed {
        parameters.seed = seed;
    }
    if args.replicates == 0 {
        return Err(SirError::configuration("replicates", "must be at least 1"));
    }

    let mut report_options = ReportOptions::new();
    report_options
        .directory(args.output_dir.clone())
        .file_prefix(args.file_prefix.clone())
        .overwrite(args.force_overwrite);

    let replicates = if args.replicates == 1 {
        let output = simulate(parameters.clone())?;
        write_output(&report_options, &output, "")?;
        vec![Replicate {
            seed: parameters.seed,
            output,
        }]
    } else {
        let seeds: Vec<u64> = (0..args.replicates as u64)
            .map(|offset| parameters.seed.wrapping_add(offset))
            .collect();
        let replicates = run_replicates(&parameters, &seeds, args.threads)?;
        for replicate in &replicates {
            write_output(
                &report_options,
                &replicate.output,
                &format!("_seed{}", replicate.seed),
            )?;
        }
        replicates
    };
    write_summary(
        &report_options,
        &parameters,
        replicates
            .iter()
            .map(|replicate| (replicate.seed, &replicate.output)),
    )?;

    for replicate in &replicates {
        let summary = ReplicateSummary::new(&parameters, replicate.seed, &replicate.output);
        println!(
            "seed {}: final S/I/R = {}/{}/{}, peak infected {} at t = {:.3}, final size {:.3}",
            summary.seed,
            summary.final_susceptible,
            summary.final_infected,
            summary.final_recovered,
            summary.peak_infected,
            summary.peak_time,
            summary.final_size
        );
    }
    Ok(replicates)
}
