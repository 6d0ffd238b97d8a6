use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::config::Config;
use crate::data::{resolve_data_path, Batch, FilePattern};
use crate::errors::Result;
use crate::sql::{self, SqlScript};
use crate::warehouse::SqlExecutor;

use super::Etl;

pub const ETL_NAME: &str = "staging";

/// A single bulk statement covering every file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkLoad {
    pub glob_pattern: String,
    pub file_count: usize,
}

/// Resets the staging table and bulk-loads the local Parquet batch into it. DDL goes straight
/// to the warehouse; the load goes through the bulk engine, which reads the files itself.
pub struct StagingEtl<'a> {
    config: &'a Config,
    warehouse: &'a mut dyn SqlExecutor,
    engine: &'a mut dyn SqlExecutor,
    pattern: FilePattern,
}

impl<'a> StagingEtl<'a> {
    pub fn new(
        config: &'a Config,
        warehouse: &'a mut dyn SqlExecutor,
        engine: &'a mut dyn SqlExecutor,
    ) -> Result<StagingEtl<'a>> {
        Ok(StagingEtl {
            config,
            warehouse,
            engine,
            pattern: FilePattern::parquet()?,
        })
    }

    fn script_path(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(&self.config.sql_dir).join(name)
    }
}

impl Etl for StagingEtl<'_> {
    type Input = Batch;
    type Output = Option<BulkLoad>;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn prepare(&mut self, dir: &Path) -> Result<()> {
        info!(etl_name = ETL_NAME; "Step 1/3: creating staging table");
        let create = SqlScript::load(&self.script_path(dir, sql::CREATE_STAGING_TABLE))?;
        self.warehouse.execute_batch(&create.text)?;

        info!(etl_name = ETL_NAME; "Step 2/3: truncating staging table");
        let truncate = SqlScript::load(&self.script_path(dir, sql::TRUNCATE_STAGING_TABLE))?;
        self.warehouse.execute_batch(&truncate.text)?;
        Ok(())
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        info!(etl_name = ETL_NAME; "Step 3/3: loading data");
        let resolved = resolve_data_path(self.config, dir);
        let data_dir = dir.join(&resolved.path);
        info!(etl_name = ETL_NAME, mode = resolved.mode.name(); "Discovering files in {}", data_dir.display());
        Batch::discover(&data_dir, &self.pattern)
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        if input.is_empty() {
            warn!(etl_name = ETL_NAME; "No Parquet files found in {}", input.dir.display());
            info!(etl_name = ETL_NAME; "Check that the fetch stage has run");
            return Ok(None);
        }
        input.log_summary();
        Ok(Some(BulkLoad {
            glob_pattern: self.pattern.glob_in(&input.dir),
            file_count: input.len(),
        }))
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let Some(bulk) = output else {
            return Ok(());
        };

        let insert = SqlScript::load(&self.script_path(dir, sql::INSERT_FROM_FILES))?;
        let statement = insert.render(&[("glob_pattern", bulk.glob_pattern.as_str())])?;

        info!(etl_name = ETL_NAME, files = bulk.file_count; "Loading every file in one statement: {}", bulk.glob_pattern);
        match self.engine.execute_batch(&statement) {
            Ok(()) => {
                info!(etl_name = ETL_NAME; "Data loaded into the warehouse");
                Ok(())
            }
            Err(err) => {
                error!(etl_name = ETL_NAME, err = err.message.as_str(); "Error while loading");
                Err(err)
            }
        }
    }
}
