//! MAPCREATOR: turns elevation rasters, imagery and OSM trail data into the
//! file set of a 3D map package.
//!
//! - A [`Project`] lists the input files per [`Category`] plus the window,
//!   reference systems, resolutions and land-use colours to build with.
//! - A build runs one pipeline per category. Pipelines are ordered lists of
//!   [`Stage`]s over a mutable status; a failing stage is recorded and the
//!   next stage still runs.
//! - Raster work is delegated to the GDAL command-line tools through the
//!   [`RasterTool`] gateway.
//! - Finished files land in `<state>/build/finalized` and are zipped by
//!   [`package`].
//!
//! Build directory layout:
//!   <state>/state.json                   project record
//!   <state>/build/[N]name...             intermediates, N = generation
//!   <state>/build/finalized/heightfile{i}.bin / .hdr
//!   <state>/build/finalized/heightfile{i}_satellite.png
//!   <state>/build/finalized/heightfile{i}_trails.xml

pub mod config;
pub mod coordinator;
pub mod error;
pub mod gdal;
pub mod package;
pub mod project;
pub mod runner;
pub mod stages;
pub mod status;
pub mod window;

pub use config::{BuildConfig, ToolPrograms};
pub use coordinator::{BuildCoordinator, BuildReport};
pub use error::{StageError, StageFailure};
pub use gdal::{ProcessTool, RasterTool, ToolCommand, ToolOutput};
pub use package::package;
pub use project::{Category, FileAddResult, Project, STATE_DIR};
pub use runner::{run_stages, BuildContext, Stage};
pub use status::{FileBuffer, Progress, RasterKind, RasterStatus};
pub use window::{ClippedWindow, RasterExtent, SpatialWindow};
