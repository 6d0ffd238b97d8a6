pub mod fetch;
pub mod staging;
pub mod transform;

use std::path::Path;
use log::{info, error};

use crate::errors::Result;


/// One step of the pipeline. `dir` is the pipeline root that relative data and SQL paths hang
/// off.
pub trait Etl {
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    /// Runs before extraction, e.g. to reset the tables a stage writes to.
    fn prepare(&mut self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()>;

    fn process(&mut self, dir: &Path) -> Result<()> {
        info!(etl_name = self.etl_name(); "Starting ETL process");

        info!(etl_name = self.etl_name(); "Preparing");
        match self.prepare(dir) {
            Ok(_) => Ok(()),
            Err(err) => {
                error!(etl_name = self.etl_name(), err = err.message.as_str(); "Preparation failed with error");
                Err(err)
            },
        }?;

        info!(etl_name = self.etl_name(); "Extracting");
        let input = match self.extract(dir) {
            Ok(input) => Ok(input),
            Err(err) => {
                error!(etl_name = self.etl_name(), err = err.message.as_str(); "Extraction failed with error");
                Err(err)
            },
        }?;

        info!(etl_name = self.etl_name(); "Transforming");
        let output = match self.transform(input) {
            Ok(output) => Ok(output),
            Err(err) => {
                error!(etl_name = self.etl_name(), err = err.message.as_str(); "Transformation failed with error");
                Err(err)
            },
        }?;

        info!(etl_name = self.etl_name(); "Loading");
        match self.load(dir, output) {
            Ok(_) => Ok(()),
            Err(err) => {
                error!(etl_name = self.etl_name(), err = err.message.as_str(); "Loading failed with error");
                Err(err)
            },
        }?;

        info!(etl_name = self.etl_name(); "Process finished");
        Ok(())
    }
}

/// Object-safe view of an [`Etl`] so the pipeline can hold stages of different types.
pub trait Stage {
    fn stage_name(&self) -> &str;
    fn run(&mut self, dir: &Path) -> Result<()>;
}

impl<T: Etl> Stage for T {
    fn stage_name(&self) -> &str {
        self.etl_name()
    }

    fn run(&mut self, dir: &Path) -> Result<()> {
        self.process(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[derive(Default)]
    struct Steps {
        seen: Vec<&'static str>,
        fail_at: Option<&'static str>,
    }

    impl Steps {
        fn step(&mut self, name: &'static str) -> Result<()> {
            self.seen.push(name);
            if self.fail_at == Some(name) {
                return Err(Error::from(format!("{name} broke")));
            }
            Ok(())
        }
    }

    impl Etl for Steps {
        type Input = ();
        type Output = ();

        fn etl_name(&self) -> &str {
            "steps"
        }

        fn prepare(&mut self, _dir: &Path) -> Result<()> {
            self.step("prepare")
        }

        fn extract(&mut self, _dir: &Path) -> Result<()> {
            self.step("extract")
        }

        fn transform(&mut self, _input: ()) -> Result<()> {
            self.step("transform")
        }

        fn load(&mut self, _dir: &Path, _output: ()) -> Result<()> {
            self.step("load")
        }
    }

    #[test]
    fn steps_run_in_order() {
        let mut steps = Steps::default();
        steps.process(Path::new("")).unwrap();
        assert_eq!(steps.seen, vec!["prepare", "extract", "transform", "load"]);
    }

    #[test]
    fn failure_stops_later_steps_and_is_returned_as_is() {
        let mut steps = Steps {
            fail_at: Some("extract"),
            ..Steps::default()
        };
        let err = steps.process(Path::new("")).unwrap_err();
        assert_eq!(err, Error::from("extract broke"));
        assert_eq!(steps.seen, vec!["prepare", "extract"]);
    }
}
