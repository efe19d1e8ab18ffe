use std::path::PathBuf;

use clap::{AppSettings, Parser};
use hifitime::Duration;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, error, info};
use rayon::prelude::*;
use vec1::vec1;

use photprep::{
    averaging::{FillPolicy, RebinParams},
    quality::{FlagAction, FlagMatching, FlagPolicy, QualityFlags, DEFAULT_TOLERANCE},
    read::{resolve_inputs, tess::FluxColumn},
    segments::DEFAULT_GAP_THRESHOLD,
    synth::NoiseSeed,
    write::ExportDescriptor,
    PrepError, PrepareParams, Target,
};

#[derive(Parser)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    /// The light-curve files of a single target. A single argument may be a
    /// quoted wildcard (e.g. "sector*.fits").
    inputs: Vec<String>,

    /// Where to write the .dat and .inf files. A directory (or a path ending
    /// in '/') gets files named after the target id. Defaults to the current
    /// directory.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Treat each input file as a separate target and process them in
    /// parallel.
    #[clap(long)]
    batch: bool,

    /// Use the PDCSAP (cotrended) flux instead of SAP flux.
    #[clap(long)]
    pdcsap: bool,

    /// The fraction of samples with the largest flux errors to discard.
    #[clap(short, long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Keep samples with these quality flags, which are dropped by default.
    #[clap(long, multiple_values(true))]
    keep_flags: Vec<u32>,

    /// Also drop samples with these quality flags.
    #[clap(long, multiple_values(true))]
    drop_flags: Vec<u32>,

    /// Match quality flags by whole value rather than by bit.
    #[clap(long)]
    exact_flags: bool,

    /// The width of the output bins [seconds].
    #[clap(long, default_value_t = 120.0)]
    bin_width: f64,

    /// The exposure time represented by each bin [seconds]. Defaults to the
    /// bin width.
    #[clap(long)]
    exposure: Option<f64>,

    /// Where in each bin its timestamp lies (0 = start, 0.5 = centre).
    #[clap(long, default_value_t = 0.5)]
    bin_phase: f64,

    /// Fill empty bins with zero instead of the median.
    #[clap(long)]
    zero_fill: bool,

    /// Inject a sinusoid with this amplitude [flux units].
    #[clap(long, requires = "inject_period")]
    inject_amplitude: Option<f64>,

    /// The period of the injected sinusoid [days].
    #[clap(long, requires = "inject_amplitude")]
    inject_period: Option<f64>,

    /// Add uniform noise with this full width [flux units].
    #[clap(long)]
    noise: Option<f64>,

    /// Seed for the noise, for reproducible output.
    #[clap(long)]
    seed: Option<u64>,

    /// Replace the flux with noise so that only the window function is
    /// exported.
    #[clap(long)]
    window_function: bool,

    /// Export each contiguous block of observations separately.
    #[clap(long)]
    split_nights: bool,

    /// The gap that separates two blocks of observations [days].
    #[clap(long, default_value_t = DEFAULT_GAP_THRESHOLD)]
    gap_threshold: f64,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Disable progress bars.
    #[clap(long)]
    no_progress_bars: bool,
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), PrepError> {
    let args = Args::parse();
    setup_logging(args.verbosity);

    if !args.batch {
        return run_target(&args, Target::from_inputs(&args.inputs, flux_column(&args))?);
    }

    let paths = resolve_inputs(&args.inputs)?;
    info!("Processing {} targets", paths.len());
    let progress = ProgressBar::new(paths.len() as _)
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} targets ({elapsed_precise}<{eta_precise})")
                .expect("progress template is valid")
                .progress_chars("=> "),
        )
        .with_message("Preparing");
    if args.no_progress_bars {
        progress.set_draw_target(ProgressDrawTarget::hidden());
    }

    let failures = paths
        .as_vec()
        .par_iter()
        .progress_with(progress)
        .filter_map(|path| {
            let result = Target::from_paths(&vec1![path.clone()], flux_column(&args))
                .and_then(|target| run_target(&args, target));
            match result {
                Ok(()) => None,
                Err(e) => {
                    error!("{}: {e}", path.display());
                    Some(e)
                }
            }
        })
        .collect::<Vec<_>>();

    if !failures.is_empty() {
        error!("{} of {} targets failed", failures.len(), paths.len());
    }
    match failures.into_iter().next() {
        None => Ok(()),
        Some(e) => Err(e),
    }
}

fn flux_column(args: &Args) -> FluxColumn {
    if args.pdcsap {
        FluxColumn::Pdcsap
    } else {
        FluxColumn::Sap
    }
}

fn prepare_params(args: &Args, target: &Target) -> PrepareParams {
    let unit = target.meta().time_unit;
    let bin_width = unit.value_of(Duration::from_seconds(args.bin_width));
    let exposure_time = match args.exposure {
        Some(e) => unit.value_of(Duration::from_seconds(e)),
        None => bin_width,
    };

    let mut flag_policy = FlagPolicy::default();
    for &f in &args.keep_flags {
        flag_policy.set(QualityFlags::from_bits_retain(f), FlagAction::Keep);
    }
    for &f in &args.drop_flags {
        flag_policy.set(QualityFlags::from_bits_retain(f), FlagAction::Drop);
    }
    if args.exact_flags {
        flag_policy.matching = FlagMatching::ExactValue;
    }

    PrepareParams {
        tolerance: args.tolerance,
        flag_policy,
        rebin: RebinParams {
            bin_width,
            exposure_time,
            bin_phase: args.bin_phase,
            fill_policy: if args.zero_fill {
                FillPolicy::Zero
            } else {
                FillPolicy::MedianReplace
            },
        },
    }
}

fn run_target(args: &Args, mut target: Target) -> Result<(), PrepError> {
    let params = prepare_params(args, &target);
    debug!("Parameters: {params:?}");
    let descriptor = ExportDescriptor {
        breaks: params.rebin.fill_policy == FillPolicy::Zero,
        ..ExportDescriptor::default()
    };

    if args.window_function {
        target = NoiseSeed::from_option(args.seed).with_rng(|rng| target.window_function(rng));
    }
    if let (Some(amplitude), Some(period)) = (args.inject_amplitude, args.inject_period) {
        info!("Injecting a sinusoid (amplitude {amplitude}, period {period})");
        target.inject_signal(amplitude, period)?;
    }
    if let Some(amplitude) = args.noise {
        info!("Adding noise (amplitude {amplitude})");
        target.add_noise(amplitude, NoiseSeed::from_option(args.seed))?;
    }

    if let Some(chi2) = target.reduced_chi_squared() {
        info!("Target {}: reduced chi squared {chi2:.4}", target.meta().id);
    }

    if args.split_nights {
        target.filter(params.tolerance, &params.flag_policy)?;
        let nights = target.split_nights(args.gap_threshold)?;
        info!("Found {} nights", nights.len());
        for (i, mut night) in nights.into_iter().enumerate() {
            night.prepare(&params)?;
            let stem = photprep::target::output_stem(args.output.as_deref(), &night.meta().id);
            let stem = PathBuf::from(format!("{}_night{i:02}", stem.display()));
            let files = night.export(Some(&stem), &descriptor)?;
            info!("Wrote {} and {}", files.dat.display(), files.inf.display());
        }
    } else {
        target.prepare(&params)?;
        let files = target.export(args.output.as_deref(), &descriptor)?;
        info!("Wrote {} and {}", files.dat.display(), files.inf.display());
    }
    Ok(())
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();
}
