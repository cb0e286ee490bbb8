use log::{debug, warn};

use crate::config::BuildConfig;
use crate::error::{StageError, StageFailure};
use crate::gdal::RasterTool;
use crate::project::{Category, Project};

/// Everything a stage may read besides its own status.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a BuildConfig,
    pub project: &'a Project,
    pub tool: &'a dyn RasterTool,
}

impl BuildContext<'_> {
    pub fn debug(&self) -> bool {
        self.config.debug
    }
}

pub type StageFn<S> = fn(&mut S, &BuildContext<'_>) -> Result<(), StageError>;

/// A named step of a pipeline over status type `S`.
pub struct Stage<S> {
    pub name: &'static str,
    pub run: StageFn<S>,
}

impl<S> Stage<S> {
    pub const fn new(name: &'static str, run: StageFn<S>) -> Self {
        Self { name, run }
    }
}

/// Run every stage in order against `status`.
///
/// A failing stage never stops the ones after it; each failure is recorded
/// with its stage name and nothing is retried.
pub fn run_stages<S>(
    pipeline: Category,
    stages: &[Stage<S>],
    status: &mut S,
    ctx: &BuildContext<'_>,
) -> Vec<StageFailure> {
    let mut failures = Vec::new();

    for stage in stages {
        debug!("[{pipeline}] stage {}", stage.name);
        if let Err(error) = (stage.run)(status, ctx) {
            warn!("[{pipeline}] stage {} failed: {error}", stage.name);
            failures.push(StageFailure {
                pipeline,
                stage: stage.name,
                error,
            });
        }
    }

    failures
}
