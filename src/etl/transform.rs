use std::path::Path;

use log::{info, warn};

use crate::config::Config;
use crate::errors::Result;
use crate::sql::{self, SqlScript};
use crate::warehouse::SqlExecutor;

use super::Etl;

pub const ETL_NAME: &str = "transform";

/// Builds the star schema from the staging table by running the transform scripts in
/// file-name order.
pub struct TransformEtl<'a> {
    config: &'a Config,
    warehouse: &'a mut dyn SqlExecutor,
}

impl<'a> TransformEtl<'a> {
    pub fn new(config: &'a Config, warehouse: &'a mut dyn SqlExecutor) -> TransformEtl<'a> {
        TransformEtl { config, warehouse }
    }
}

impl Etl for TransformEtl<'_> {
    type Input = Vec<SqlScript>;
    type Output = Vec<SqlScript>;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        SqlScript::load_dir(&dir.join(&self.config.sql_dir).join(sql::TRANSFORM_DIR))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        if input.is_empty() {
            warn!(etl_name = ETL_NAME; "No transform scripts found");
        }
        Ok(input)
    }

    fn load(&mut self, _dir: &Path, output: Self::Output) -> Result<()> {
        let total = output.len();
        for (i, script) in output.iter().enumerate() {
            info!(etl_name = ETL_NAME; "Script {}/{}: {}", i + 1, total, script.name());
            self.warehouse.execute_batch(&script.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::errors::{Error, ErrorKind};
    use crate::warehouse::testing::RecordingExecutor;

    fn transform_dir(root: &Path) -> std::path::PathBuf {
        let dir = root.join("sql").join(sql::TRANSFORM_DIR);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn scripts_run_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        let dir = transform_dir(root.path());
        fs::write(dir.join("02_fact_trips.sql"), "INSERT INTO fact_trips SELECT 1;").unwrap();
        fs::write(dir.join("01_dimensions.sql"), "INSERT INTO dim_vendor SELECT 1;").unwrap();
        let config = Config::default();
        let mut warehouse = RecordingExecutor::default();

        TransformEtl::new(&config, &mut warehouse)
            .process(root.path())
            .unwrap();

        assert_eq!(
            warehouse.statements,
            vec!["INSERT INTO dim_vendor SELECT 1;", "INSERT INTO fact_trips SELECT 1;"]
        );
    }

    #[test]
    fn missing_script_directory_fails() {
        let root = tempfile::tempdir().unwrap();
        let config = Config::default();
        let mut warehouse = RecordingExecutor::default();

        let err = TransformEtl::new(&config, &mut warehouse)
            .process(root.path())
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Sql);
    }

    #[test]
    fn first_failing_script_stops_the_run() {
        let root = tempfile::tempdir().unwrap();
        let dir = transform_dir(root.path());
        fs::write(dir.join("01_a.sql"), "SELECT 1;").unwrap();
        fs::write(dir.join("02_b.sql"), "SELECT 2;").unwrap();
        let config = Config::default();
        let mut warehouse = RecordingExecutor::failing(Error::new(ErrorKind::Warehouse, "boom"));

        let err = TransformEtl::new(&config, &mut warehouse)
            .process(root.path())
            .unwrap_err();

        assert_eq!(err.message, "boom");
        assert_eq!(warehouse.statements.len(), 1);
    }
}
