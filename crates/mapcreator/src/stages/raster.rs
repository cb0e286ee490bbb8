//! Stages shared by the elevation and imagery pipelines.
//!
//! Every stage reads `files.current()`, produces at most one output per input
//! and ends with `files.advance()`. Per-file work runs on the rayon pool;
//! outputs are enqueued in input order once every file of the stage is done.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use rayon::prelude::*;

use crate::error::StageError;
use crate::gdal::{self, ToolCommand};
use crate::runner::{BuildContext, Stage};
use crate::status::{
    height_metadata_name, output_path, Progress, RasterKind, RasterStatus,
    HEIGHT_METADATA_EXTENSION, INTERNAL_EXTENSION, INTERNAL_FORMAT,
};

pub const LATLON_DATUM: &str = "EPSG:4326";
pub const PROJECTION: &str = "EPSG:3857";

pub const RASTER_STAGES: &[Stage<RasterStatus>] = &[
    Stage::new("prepare", prepare),
    Stage::new("clip_to_window", clip_to_window),
    Stage::new("reproject", reproject),
    Stage::new("translate", translate),
    Stage::new("finalize", finalize),
];

/// Run `work` for every current file and rotate the buffer.
///
/// `Ok(None)` drops the file without a failure. A failed file is dropped too
/// and its error reported once all files have been processed.
fn per_file<F>(status: &mut RasterStatus, work: F) -> Result<(), StageError>
where
    F: Fn(&Path, &mut String) -> Result<Option<PathBuf>, StageError> + Sync,
{
    let outcomes: Vec<(String, Result<Option<PathBuf>, StageError>)> = status
        .files
        .current()
        .par_iter()
        .map(|input| {
            let mut transcript = String::new();
            let outcome = work(input, &mut transcript);
            (transcript, outcome)
        })
        .collect();

    let mut errors = Vec::new();
    for (transcript, outcome) in outcomes {
        status.output.push_str(&transcript);
        match outcome {
            Ok(Some(path)) => status.files.push_next(path),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
    status.files.advance();

    StageError::collect(errors)
}

fn with_source_system(command: ToolCommand, source: Option<&str>) -> ToolCommand {
    match source {
        Some(code) => command.args(["-s_srs", code]),
        None => command,
    }
}

/// Convert every input into the internal working format.
pub fn prepare(status: &mut RasterStatus, ctx: &BuildContext<'_>) -> Result<(), StageError> {
    let build_dir = &ctx.config.build_dir;
    let program = &ctx.config.tools.gdal_translate;

    per_file(status, |input, transcript| {
        let output = output_path(build_dir, input, Some(INTERNAL_EXTENSION));
        let command = ToolCommand::new(program)
            .args(["-of", INTERNAL_FORMAT])
            .path(input)
            .path(&output);
        gdal::call(ctx.tool, &command, ctx.debug(), transcript)?;
        Ok(Some(output))
    })
}

/// Cut every file down to its overlap with the project window.
///
/// Without a window this stage leaves the file set untouched; the coordinator
/// never starts a raster pipeline in that case. Files whose extent misses the
/// window are dropped silently.
pub fn clip_to_window(status: &mut RasterStatus, ctx: &BuildContext<'_>) -> Result<(), StageError> {
    let Some(window) = ctx.project.window else {
        debug!("[{}] no window configured; keeping files as they are", status.kind);
        return Ok(());
    };
    let build_dir = &ctx.config.build_dir;
    let tools = &ctx.config.tools;
    let source = ctx.project.source_system(status.kind.category());

    per_file(status, |input, transcript| {
        let extent = gdal::query_extent(ctx.tool, &tools.gdalinfo, input)?;
        let Some(clipped) = window.clip(&extent) else {
            debug!("{} lies outside the window; skipping", input.display());
            return Ok(None);
        };

        let output = output_path(build_dir, input, None);
        let command = with_source_system(ToolCommand::new(&tools.gdalwarp), source)
            .args(["-te_srs", LATLON_DATUM, "-te"])
            .args(clipped.te_args())
            .path(input)
            .path(&output);
        gdal::call(ctx.tool, &command, ctx.debug(), transcript)?;
        Ok(Some(output))
    })
}

/// Warp into the output projection at the configured cell size.
pub fn reproject(status: &mut RasterStatus, ctx: &BuildContext<'_>) -> Result<(), StageError> {
    let build_dir = &ctx.config.build_dir;
    let program = &ctx.config.tools.gdalwarp;
    let category = status.kind.category();
    let source = ctx.project.source_system(category);
    let resolution = ctx.project.resolution(category).to_string();

    per_file(status, |input, transcript| {
        let output = output_path(build_dir, input, None);
        let command = with_source_system(ToolCommand::new(program), source)
            .args(["-tr", resolution.as_str(), resolution.as_str()])
            .args(["-t_srs", PROJECTION, "-r", "bilinear"])
            .path(input)
            .path(&output);
        gdal::call(ctx.tool, &command, ctx.debug(), transcript)?;
        Ok(Some(output))
    })
}

/// Encode into the final format. Elevation headers go straight to the
/// finalized directory, numbered by the metadata counter. A raster whose
/// header is missing leaves the working set so every later header keeps the
/// number of its data file.
pub fn translate(status: &mut RasterStatus, ctx: &BuildContext<'_>) -> Result<(), StageError> {
    let kind = status.kind;
    let build_dir = &ctx.config.build_dir;
    let program = &ctx.config.tools.gdal_translate;

    let converted = per_file(status, |input, transcript| {
        let output = output_path(build_dir, input, Some(kind.output_extension()));
        let command = ToolCommand::new(program)
            .args(["-of", kind.output_format()])
            .path(input)
            .path(&output);
        gdal::call(ctx.tool, &command, ctx.debug(), transcript)?;
        Ok(Some(output))
    });
    if kind != RasterKind::Height {
        return converted;
    }

    let mut errors: Vec<StageError> = converted.err().into_iter().collect();
    for encoded in status.files.current().to_vec() {
        let header = encoded.with_extension(HEIGHT_METADATA_EXTENSION);
        if !header.exists() {
            errors.push(StageError::MissingMetadata(header));
            continue;
        }
        let target = ctx
            .config
            .finalized_dir
            .join(height_metadata_name(status.metaindex()));
        match fs::rename(&header, &target) {
            Ok(()) => {
                status.next_metaindex();
                status.add_result_file(target);
                status.files.push_next(encoded);
            }
            Err(e) => errors.push(e.into()),
        }
    }
    status.files.advance();

    StageError::collect(errors)
}

/// Move the finished files into the finalized directory under their
/// numbered names.
pub fn finalize(status: &mut RasterStatus, ctx: &BuildContext<'_>) -> Result<(), StageError> {
    if status.files.current().is_empty() {
        return Ok(());
    }
    let files = match status.progress() {
        Progress::Progressed(files) => files.to_vec(),
        Progress::NoProgress => return Err(StageError::NoProgress),
    };

    let mut errors = Vec::new();
    for file in files {
        let target = ctx
            .config
            .finalized_dir
            .join(status.kind.final_name(status.next_index()));
        match fs::rename(&file, &target) {
            Ok(()) => {
                debug!("Finalized {} as {}", file.display(), target.display());
                status.files.push_next(target.clone());
                status.add_result_file(target);
            }
            Err(e) => errors.push(e.into()),
        }
    }
    status.files.advance();

    StageError::collect(errors)
}
