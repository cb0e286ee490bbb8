use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

/// Names (or paths) of the GDAL executables the stages invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPrograms {
    pub gdalinfo: String,
    pub gdalwarp: String,
    pub gdal_translate: String,
}

impl Default for ToolPrograms {
    fn default() -> Self {
        Self {
            gdalinfo: "gdalinfo".into(),
            gdalwarp: "gdalwarp".into(),
            gdal_translate: "gdal_translate".into(),
        }
    }
}

impl ToolPrograms {
    /// Defaults, overridable through `MAPCREATOR_GDALINFO`, `MAPCREATOR_GDALWARP`
    /// and `MAPCREATOR_GDAL_TRANSLATE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gdalinfo: std::env::var("MAPCREATOR_GDALINFO").unwrap_or(defaults.gdalinfo),
            gdalwarp: std::env::var("MAPCREATOR_GDALWARP").unwrap_or(defaults.gdalwarp),
            gdal_translate: std::env::var("MAPCREATOR_GDAL_TRANSLATE")
                .unwrap_or(defaults.gdal_translate),
        }
    }
}

/// Working-directory layout and switches for one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub build_dir: PathBuf,
    pub finalized_dir: PathBuf,
    /// Also capture command lines and stdout into the pipeline transcripts.
    pub debug: bool,
    pub tools: ToolPrograms,
}

impl BuildConfig {
    /// Layout under a project state directory: `<state>/build` and `<state>/build/finalized`.
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        let build_dir = state_dir.as_ref().join("build");
        let finalized_dir = build_dir.join("finalized");
        Self {
            build_dir,
            finalized_dir,
            debug: false,
            tools: ToolPrograms::default(),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_tools(mut self, tools: ToolPrograms) -> Self {
        self.tools = tools;
        self
    }

    pub fn build_files_exist(&self) -> bool {
        self.build_dir.exists()
    }

    /// Start from an empty build directory. Leftovers of an interrupted build
    /// are discarded, never reused.
    pub fn init_build(&self) -> io::Result<()> {
        if self.build_files_exist() {
            warn!(
                "Discarding stale build directory {}",
                self.build_dir.display()
            );
            self.cleanup()?;
        }
        fs::create_dir_all(&self.finalized_dir)?;
        debug!("Initialized build directory {}", self.build_dir.display());
        Ok(())
    }

    pub fn cleanup(&self) -> io::Result<()> {
        fs::remove_dir_all(&self.build_dir)
    }
}
