mod config;
mod data;
mod errors;
mod etl;
mod pipeline;
mod sql;
mod warehouse;

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{error, info};
use structured_logger::json::new_writer;
use structured_logger::Builder;

use crate::config::Config;
use crate::errors::Result;
use crate::etl::fetch::FetchEtl;
use crate::etl::staging::StagingEtl;
use crate::etl::transform::TransformEtl;
use crate::pipeline::{exit_status, Pipeline};
use crate::warehouse::{DuckDbEngine, PostgresWarehouse};

/// Reads `config.json`-style settings when a path is given, the environment (plus `.env`)
/// otherwise.
fn load_config() -> Result<Config> {
    match env::args().nth(1) {
        Some(path) => Config::from_json_file(Path::new(&path)),
        None => {
            Config::check_dotenv(dotenvy::dotenv())?;
            Config::from_vars(env::vars())
        }
    }
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn run(config: &Config) -> Result<()> {
    let root = PathBuf::new();
    let mut staging_warehouse = PostgresWarehouse::new(&config.warehouse);
    let mut transform_warehouse = PostgresWarehouse::new(&config.warehouse);
    let mut engine = DuckDbEngine::attached_to(&config.warehouse)?;

    let mut pipeline = Pipeline::new()
        .with_stage(FetchEtl::new(config)?)
        .with_stage(StagingEtl::new(config, &mut staging_warehouse, &mut engine)?)
        .with_stage(TransformEtl::new(config, &mut transform_warehouse));
    pipeline.run(&root)
}

fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            setup_logging("info");
            error!(err = err.message.as_str(); "Could not load configuration");
            return ExitCode::from(1);
        }
    };
    setup_logging(&config.log_level);
    info!(sql_dir = config.sql_dir.as_str(); "Configuration loaded");

    let result = run(&config);
    if let Err(err) = &result {
        error!(err = err.message.as_str(); "Pipeline error: {}", err);
    }
    ExitCode::from(exit_status(&result))
}
