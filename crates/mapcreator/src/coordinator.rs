//! Runs the three category pipelines of one build and gathers their results.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::config::BuildConfig;
use crate::error::StageFailure;
use crate::gdal::RasterTool;
use crate::package::package;
use crate::project::{Category, Project};
use crate::runner::{run_stages, BuildContext};
use crate::stages::{VectorStatus, RASTER_STAGES, VECTOR_STAGES};
use crate::status::{RasterKind, RasterStatus};

/// Outcome of one build: every pipeline's final status plus the union of
/// their stage failures.
#[derive(Debug)]
pub struct BuildReport {
    pub height: RasterStatus,
    pub satellite: RasterStatus,
    pub osm: VectorStatus,
    pub failures: Vec<StageFailure>,
}

impl BuildReport {
    /// Elevation, then imagery, then vector outputs.
    pub fn result_files(&self) -> Vec<PathBuf> {
        self.height
            .result_files
            .iter()
            .chain(&self.satellite.result_files)
            .chain(&self.osm.result_files)
            .cloned()
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.height)?;
        writeln!(f, "{}", self.satellite)?;
        write!(f, "{}", self.osm)?;
        if !self.failures.is_empty() {
            write!(f, "\nBuild completed with {} errors:", self.failures.len())?;
            for failure in &self.failures {
                write!(f, "\n-{failure}")?;
            }
        }
        Ok(())
    }
}

pub struct BuildCoordinator<'a> {
    ctx: BuildContext<'a>,
}

impl<'a> BuildCoordinator<'a> {
    pub fn new(config: &'a BuildConfig, project: &'a Project, tool: &'a dyn RasterTool) -> Self {
        Self {
            ctx: BuildContext {
                config,
                project,
                tool,
            },
        }
    }

    /// Start from a fresh build directory and run all pipelines to the end.
    ///
    /// Only a failure to set up the build directory is returned as `Err`;
    /// stage failures are collected in the report.
    pub fn run(&self) -> Result<BuildReport> {
        let config = self.ctx.config;
        config.init_build().with_context(|| {
            format!(
                "Unable to initialize build directory {}",
                config.build_dir.display()
            )
        })?;

        let ((height, satellite), osm) = rayon::join(
            || {
                rayon::join(
                    || self.raster(RasterKind::Height),
                    || self.raster(RasterKind::Satellite),
                )
            },
            || self.vector(),
        );

        let mut failures = height.1;
        failures.extend(satellite.1);
        failures.extend(osm.1);

        let report = BuildReport {
            height: height.0,
            satellite: satellite.0,
            osm: osm.0,
            failures,
        };
        if report.is_success() {
            info!("Build finished with {} result files", report.result_files().len());
        } else {
            warn!(
                "Build finished with {} result files and {} failed stages",
                report.result_files().len(),
                report.failures.len()
            );
        }
        Ok(report)
    }

    /// Hand every result file of `report` to the packager.
    pub fn package(&self, report: &BuildReport, archive: &Path) -> Result<()> {
        package(archive, &report.result_files())
    }

    fn raster(&self, kind: RasterKind) -> (RasterStatus, Vec<StageFailure>) {
        let category = kind.category();
        let project = self.ctx.project;
        let mut status = RasterStatus::new(kind, 0, project.files(category).to_vec());
        if !project.has_files(category) {
            debug!("[{category}] no input files");
            return (status, Vec::new());
        }
        if !project.has_window() {
            warn!(
                "[{category}] no window configured; skipping {} files",
                status.original_files.len()
            );
            return (status, Vec::new());
        }

        let failures = run_stages(category, RASTER_STAGES, &mut status, &self.ctx);
        (status, failures)
    }

    fn vector(&self) -> (VectorStatus, Vec<StageFailure>) {
        let project = self.ctx.project;
        let mut status = VectorStatus::new(0, project.files(Category::Vector).to_vec());
        if !project.has_files(Category::Vector) {
            debug!("[{}] no input files", Category::Vector);
            return (status, Vec::new());
        }

        let failures = run_stages(Category::Vector, VECTOR_STAGES, &mut status, &self.ctx);
        (status, failures)
    }
}
