use std::path::Path;

use log::{error, info};

use crate::errors::Result;
use crate::etl::Stage;

/// Runs its stages one after the other and stops at the first failure.
#[derive(Default)]
pub struct Pipeline<'a> {
    stages: Vec<Box<dyn Stage + 'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new() -> Pipeline<'a> {
        Pipeline { stages: Vec::new() }
    }

    pub fn with_stage(mut self, stage: impl Stage + 'a) -> Pipeline<'a> {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn run(&mut self, dir: &Path) -> Result<()> {
        info!("Trip data pipeline starting");
        let total = self.stages.len();
        for (i, stage) in self.stages.iter_mut().enumerate() {
            let stage_name = stage.stage_name().to_string();
            info!(stage = stage_name.as_str(); "Stage {}/{}: {}", i + 1, total, stage_name);
            if let Err(err) = stage.run(dir) {
                error!(stage = stage_name.as_str(), err = err.message.as_str(); "Pipeline failed in stage {}", stage_name);
                return Err(err);
            }
        }
        info!("Pipeline finished successfully");
        Ok(())
    }
}

/// Process exit status for a pipeline outcome.
pub fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}
