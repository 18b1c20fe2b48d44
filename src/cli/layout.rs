use clap::Parser;
use detector_layout::{
    detector, layout::sensors_to_df, run_with_threads, write_df_to_file, DataFrameFileType,
    Settings,
};
use std::path::PathBuf;
use tracing::{debug, error, info, trace};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Name of the output file
    #[arg(short, long, default_value_t = String::from("sensors"))]
    filename: String,

    /// Output file type
    #[arg(short = 't', long, default_value_t = DataFrameFileType::Csv)]
    output_format: DataFrameFileType,

    /// Outer radius of the primary sensor arrays (mm)
    #[arg(long = "outer-radius")]
    outer_radius: Option<f64>,

    /// Footprint radius of one primary sensor (mm)
    #[arg(long = "footprint-radius")]
    footprint_radius: Option<f64>,

    /// Minimum gap between neighbouring primary sensors (mm)
    #[arg(long)]
    clearance: Option<f64>,

    /// Skip the overlap validation after placement
    #[arg(long = "no-overlap-check")]
    no_overlap_check: bool,

    /// Number of threads to use for parallel processing
    #[arg(short = 'j', long = "num-threads", default_value_t = 0)]
    num_threads: usize,
}

pub(crate) fn run(args: &Args) {
    trace!("{args:?}");

    let params = match detector::default_parameters() {
        Ok(params) => params,
        Err(e) => {
            error!("{e}");
            return;
        }
    };

    let overrides: Vec<(&str, f64)> = [
        ("PSArrayOuterRadius", args.outer_radius),
        ("QUPIDBaseRadius", args.footprint_radius),
        ("QUPIDsMinimumAllowedDistance", args.clearance),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name, v)))
    .collect();
    let params = match params.with_overrides(&overrides) {
        Ok(params) => params,
        Err(e) => {
            error!("{e}");
            return;
        }
    };
    overrides
        .iter()
        .for_each(|(name, value)| info!("Using {name} = {value} mm"));

    let settings = Settings {
        check_overlaps: !args.no_overlap_check,
        ..Default::default()
    };

    let index = match run_with_threads(args.num_threads, || {
        debug!("Using {} thread(s)", rayon::current_num_threads());
        detector::build_index(&params, &settings)
    }) {
        Ok(Ok(index)) => index,
        Ok(Err(e)) => {
            error!("Failed to lay out the detector: {e}");
            return;
        }
        Err(e) => {
            error!("Failed to start the thread pool: {e}");
            return;
        }
    };
    info!("Placed {} sensors in {} arrays", index.total(), index.arrays().len());

    // Prepare output directory
    if let Err(e) = std::fs::create_dir_all(&args.output) {
        error!("Failed to create output directory: {e}");
        return;
    }
    let output_file = args
        .output
        .join(&args.filename)
        .with_extension(args.output_format.to_string());

    let mut df_sensors = sensors_to_df(&index);
    match write_df_to_file(&mut df_sensors, &output_file, args.output_format) {
        Ok(()) => info!("Results saved to {}", output_file.display()),
        Err(e) => error!("Failed to write {}: {e}", output_file.display()),
    }
}
