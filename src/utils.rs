use polars::prelude::*;
use std::path::Path;

/// Run `f` inside a dedicated rayon pool.
///
/// A `num_threads` of 0 lets rayon pick one thread per available core.
pub fn run_with_threads<T, F>(num_threads: usize, f: F) -> Result<T, rayon::ThreadPoolBuildError>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?;
    Ok(pool.install(f))
}

/// Read a CSV file with a header row into a DataFrame.
pub fn read_csv(file_path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()
}

/// Write a DataFrame to `file_path`, replacing its extension with the format's suffix.
pub fn write_df_to_file(
    df: &mut DataFrame,
    file_path: &Path,
    file_type: DataFrameFileType,
) -> PolarsResult<()> {
    let file_suffix = file_type.to_string();
    let mut file = std::fs::File::create(file_path.with_extension(file_suffix))?;
    match file_type {
        DataFrameFileType::Csv => {
            CsvWriter::new(&mut file).finish(df)?;
        }
        DataFrameFileType::Parquet => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
        DataFrameFileType::Json => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::Json)
                .finish(df)?;
        }
        DataFrameFileType::NDJson => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::JsonLines)
                .finish(df)?;
        }
    }
    Ok(())
}

/// File format for writing DataFrames.
#[derive(clap::ValueEnum, Clone, Debug, Copy, Default, PartialEq, Eq)]
pub enum DataFrameFileType {
    /// Comma-separated values
    #[default]
    Csv,
    /// Parquet columnar storage
    Parquet,
    /// Standard JSON
    Json,
    /// Newline-delimited JSON
    #[value(name = "ndjson")]
    NDJson,
}

impl std::fmt::Display for DataFrameFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DataFrameFileType::Csv => write!(f, "csv"),
            DataFrameFileType::Parquet => write!(f, "parquet"),
            DataFrameFileType::Json => write!(f, "json"),
            DataFrameFileType::NDJson => write!(f, "ndjson"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("detector-layout-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn pool_uses_requested_threads() {
        let n = run_with_threads(3, rayon::current_num_threads).unwrap();
        assert_eq!(n, 3);
        assert!(run_with_threads(0, rayon::current_num_threads).unwrap() >= 1);
    }

    #[test]
    fn csv_written_then_read() {
        let dir = scratch_dir("csv");
        let mut df = df!(
            "global" => [0u64, 1, 2],
            "x" => [1.5f64, -2.0, 0.25],
        )
        .unwrap();
        let path = dir.join("sensors.txt");
        write_df_to_file(&mut df, &path, DataFrameFileType::Csv).unwrap();

        let written = path.with_extension("csv");
        assert!(written.exists(), "Extension should be replaced by the format suffix");
        let back = read_csv(&written).unwrap();
        assert_eq!(back.shape(), (3, 2));
        let x: Vec<Option<f64>> = back.column("x").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(x, vec![Some(1.5), Some(-2.0), Some(0.25)]);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn every_format_writes_a_file() {
        let dir = scratch_dir("formats");
        let mut df = df!("name" => ["a", "b"], "value" => [1.0f64, 2.0]).unwrap();
        for file_type in [
            DataFrameFileType::Csv,
            DataFrameFileType::Parquet,
            DataFrameFileType::Json,
            DataFrameFileType::NDJson,
        ] {
            let path = dir.join("table");
            write_df_to_file(&mut df, &path, file_type).unwrap();
            assert!(path.with_extension(file_type.to_string()).exists());
        }
        std::fs::remove_dir_all(dir).unwrap();
    }
}
