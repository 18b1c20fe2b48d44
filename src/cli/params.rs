use clap::Parser;
use detector_layout::{detector, params_to_df, write_df_to_file, DataFrameFileType};
use std::path::PathBuf;
use tracing::{debug, error, info, trace};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// Output file path; the extension follows the output format
    #[arg(short, long)]
    output: PathBuf,

    /// Output file type
    #[arg(short = 't', long, default_value_t = DataFrameFileType::Csv)]
    output_format: DataFrameFileType,
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
    let mut df_params = params_to_df(&params);
    debug!("{} parameters\n{df_params}", params.len());

    if let Some(parent) = args.output.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!("Failed to create output directory: {e}");
            return;
        }
    }
    let output_file = args.output.with_extension(args.output_format.to_string());
    match write_df_to_file(&mut df_params, &output_file, args.output_format) {
        Ok(()) => info!("Results saved to {}", output_file.display()),
        Err(e) => error!("Failed to write {}: {e}", output_file.display()),
    }
}
