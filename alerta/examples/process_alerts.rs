//! Computes the alert area of every property under analysis.
//!
//! ```text
//! cargo run --example process_alerts -- <car.geojson> <alerts.geojson> <results_dir>
//! cargo run --example process_alerts -- --config <config.json>
//! ```
//!
//! Without arguments the bundled sample data is processed into the system temp directory.

use std::path::PathBuf;
use std::process::ExitCode;

use alerta::{Pipeline, PipelineConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match config_from_args(std::env::args().skip(1).collect()) {
        Ok(config) => config,
        Err(message) => {
            log::error!("{message}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = config.validate() {
        log::error!("{err}");
        return ExitCode::FAILURE;
    }

    match Pipeline::new(config).run() {
        Ok(result) => {
            let total: f64 = result
                .features
                .iter()
                .filter_map(|f| f.get(alerta::stage::AREA_FIELD)?.as_f64())
                .sum();
            log::info!(
                "{} of {} filtered properties have alerts, {total:.4} ha in total",
                result.counts.properties,
                result.counts.filtered
            );
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}

fn config_from_args(args: Vec<String>) -> Result<PipelineConfig, String> {
    match args.as_slice() {
        [] => {
            let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("examples/data");
            Ok(PipelineConfig::new(
                data.join("car.geojson"),
                data.join("alerts.geojson"),
                std::env::temp_dir(),
            ))
        }
        [flag, path] if flag == "--config" => {
            PipelineConfig::from_json_file(path).map_err(|err| err.to_string())
        }
        [car, alerts, results_dir] => Ok(PipelineConfig::new(car, alerts, results_dir)),
        _ => Err(
            "usage: process_alerts <car> <alerts> <results_dir> | process_alerts --config <file.json>"
                .to_string(),
        ),
    }
}
