use clap::Parser;
use detector_layout::{
    detector, get_event_summaries, read_csv, write_df_to_file, DataFrameFileType,
    EmissionPolicy, LayoutError, Settings,
};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info, trace, warn};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// CSV file with one row per hit: event, sensor, time
    #[arg(long)]
    hits: PathBuf,

    /// CSV file with one row per step: event, track, parent, particle, x, y, z, energy, time
    #[arg(long)]
    steps: PathBuf,

    /// CSV file with one row per primary particle: event, particle, x, y, z, energy
    #[arg(long)]
    primaries: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Output file type
    #[arg(short = 't', long, default_value_t = DataFrameFileType::Csv)]
    output_format: DataFrameFileType,

    /// Which events produce a summary
    #[arg(short, long, default_value_t = EmissionPolicy::default())]
    policy: EmissionPolicy,
}

fn load(path: &Path) -> Option<DataFrame> {
    match read_csv(path) {
        Ok(df) => {
            info!("Read {} rows from {}", df.height(), path.display());
            Some(df)
        }
        Err(e) => {
            error!("Failed to read {}: {e}", path.display());
            None
        }
    }
}

pub(crate) fn run(args: &Args) {
    trace!("{args:?}");

    let settings = Settings {
        emission_policy: args.policy,
        ..Default::default()
    };
    let index = match detector::default_parameters()
        .map_err(LayoutError::from)
        .and_then(|params| detector::build_index(&params, &settings))
    {
        Ok(index) => index,
        Err(e) => {
            error!("Failed to lay out the detector: {e}");
            return;
        }
    };

    let Some(hits) = load(&args.hits) else {
        return;
    };
    let Some(steps) = load(&args.steps) else {
        return;
    };
    let primaries = match &args.primaries {
        Some(path) => match load(path) {
            Some(df) => Some(df),
            None => return,
        },
        None => None,
    };

    let table = match get_event_summaries(
        &index,
        settings.emission_policy,
        &hits,
        &steps,
        primaries.as_ref(),
    ) {
        Ok(table) => table,
        Err(e) => {
            error!("Failed to aggregate events: {e}");
            return;
        }
    };
    if table.is_empty() {
        warn!("No event passed the {} policy", args.policy);
    }
    info!("Emitted {} event summaries", table.len());

    // Prepare output directory
    if let Err(e) = std::fs::create_dir_all(&args.output) {
        error!("Failed to create output directory: {e}");
        return;
    }
    for (name, mut df) in [("events", table.events()), ("steps", table.steps())] {
        let output_file = args.output.join(name).with_extension(args.output_format.to_string());
        match write_df_to_file(&mut df, &output_file, args.output_format) {
            Ok(()) => info!("Results saved to {}", output_file.display()),
            Err(e) => error!("Failed to write {}: {e}", output_file.display()),
        }
    }
}
