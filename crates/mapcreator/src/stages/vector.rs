//! Stages of the trail/terrain pipeline.

use std::fmt;
use std::path::PathBuf;

use log::{debug, info};
use osmdata::predicates::{is_area, is_trail, WithinBounds};
use osmdata::{Entity, FilterGroup, VectorDocument, Way, KEY_LANDUSE};
use rayon::prelude::*;

use crate::error::StageError;
use crate::runner::{BuildContext, Stage};
use crate::status::basenames;

/// Tag carrying a land-use colour as `"r g b"`.
pub const OSM_RGB_KEY: &str = "3dmapsrgb";

pub const VECTOR_STAGES: &[Stage<VectorStatus>] = &[
    Stage::new("load", load),
    Stage::new("add_filters", add_filters),
    Stage::new("apply_filters", apply_filters),
    Stage::new("insert_colors", insert_colors),
    Stage::new("prepare_write", prepare_write),
    Stage::new("write", write),
];

pub fn trails_name(index: usize) -> String {
    format!("heightfile{index}_trails.xml")
}

#[derive(Debug)]
pub struct VectorStatus {
    pub paths: Vec<PathBuf>,
    pub documents: Vec<VectorDocument>,
    pub result_files: Vec<PathBuf>,
    index: usize,
}

impl VectorStatus {
    pub fn new(index: usize, paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            documents: Vec::new(),
            result_files: Vec::new(),
            index,
        }
    }

    pub fn next_index(&mut self) -> usize {
        let index = self.index;
        self.index += 1;
        index
    }

    pub fn add_result_file(&mut self, path: PathBuf) {
        self.result_files.push(path);
    }
}

impl fmt::Display for VectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.result_files.is_empty() {
            return f.write_str("No osm files were processed.");
        }
        write!(
            f,
            "Converted {} to {}",
            basenames(&self.paths),
            basenames(&self.result_files)
        )
    }
}

/// Parse every input. A document that fails to load is left out.
pub fn load(status: &mut VectorStatus, _ctx: &BuildContext<'_>) -> Result<(), StageError> {
    let loaded: Vec<Result<VectorDocument, StageError>> = status
        .paths
        .par_iter()
        .map(|path| {
            debug!("Loading {}", path.display());
            VectorDocument::load(path).map_err(|source| StageError::Osm {
                path: path.clone(),
                source,
            })
        })
        .collect();

    let mut errors = Vec::new();
    status.documents.clear();
    for outcome in loaded {
        match outcome {
            Ok(document) => status.documents.push(document),
            Err(e) => errors.push(e),
        }
    }

    StageError::collect(errors)
}

/// Keep only areas and trails touching the window. No window, no filters.
pub fn add_filters(status: &mut VectorStatus, ctx: &BuildContext<'_>) -> Result<(), StageError> {
    let Some(window) = ctx.project.window else {
        debug!("[osm] no window configured; keeping every way");
        return Ok(());
    };
    let b = window.bounds();
    let bounds = WithinBounds::new(b.min_x, b.max_x, b.min_y, b.max_y);

    for document in &mut status.documents {
        document.add_way_filter(
            FilterGroup::new()
                .with(is_area::<Way>)
                .with(move |way: &Way, doc: &VectorDocument| bounds.matches_way(way, doc)),
        );
        document.add_way_filter(
            FilterGroup::new()
                .with(is_trail::<Way>)
                .with(move |way: &Way, doc: &VectorDocument| bounds.matches_way(way, doc)),
        );
    }
    Ok(())
}

pub fn apply_filters(status: &mut VectorStatus, _ctx: &BuildContext<'_>) -> Result<(), StageError> {
    status
        .documents
        .par_iter_mut()
        .for_each(VectorDocument::apply_filters);
    Ok(())
}

/// Tag every way whose land use has a configured colour.
pub fn insert_colors(status: &mut VectorStatus, ctx: &BuildContext<'_>) -> Result<(), StageError> {
    let colors = &ctx.project.area_colors;
    if colors.is_empty() {
        return Ok(());
    }

    for document in &mut status.documents {
        for way in document.ways_mut() {
            let color = way.tag(KEY_LANDUSE).and_then(|landuse| colors.get(landuse)).copied();
            if let Some([r, g, b]) = color {
                way.add_tag(OSM_RGB_KEY, format!("{r} {g} {b}"));
            }
        }
    }
    Ok(())
}

pub fn prepare_write(status: &mut VectorStatus, _ctx: &BuildContext<'_>) -> Result<(), StageError> {
    for document in &mut status.documents {
        document.prepare_for_save();
    }
    Ok(())
}

/// Merge everything that loaded into one trails file.
pub fn write(status: &mut VectorStatus, ctx: &BuildContext<'_>) -> Result<(), StageError> {
    let documents = std::mem::take(&mut status.documents);
    let Some(mut merged) = osmdata::merge(documents) else {
        debug!("[osm] nothing to write");
        return Ok(());
    };

    let target = ctx.config.finalized_dir.join(trails_name(status.next_index()));
    merged.save(&target).map_err(|source| StageError::Osm {
        path: target.clone(),
        source,
    })?;
    info!(
        "Wrote {} ways and {} nodes to {}",
        merged.included_ways().len(),
        merged.included_nodes().len(),
        target.display()
    );
    status.add_result_file(target);
    Ok(())
}
