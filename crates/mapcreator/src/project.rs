//! Persisted project record: input files per category, window, reference
//! systems, resolutions and land-use colours.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};

use crate::window::SpatialWindow;

pub const STATE_DIR: &str = ".mapcreator";
pub const STATE_FILE: &str = "state.json";
pub const DEFAULT_RESOLUTION: f64 = 10.0;

/// The three kinds of input a project collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Category {
    /// Elevation rasters.
    #[value(alias = "height")]
    Elevation,
    /// OSM trail/terrain documents.
    #[value(alias = "osm")]
    Vector,
    /// Satellite or aerial imagery.
    #[value(alias = "satellite")]
    Imagery,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Elevation => "height",
            Category::Vector => "osm",
            Category::Imagery => "satellite",
        };

        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAddResult {
    Success,
    AlreadyAdded,
    DoesntExist,
}

/// Missing fields deserialize as "not configured".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub height_files: Vec<PathBuf>,
    pub osm_files: Vec<PathBuf>,
    pub satellite_files: Vec<PathBuf>,
    pub window: Option<SpatialWindow>,
    pub height_system: Option<String>,
    pub satellite_system: Option<String>,
    pub height_resolution: f64,
    pub satellite_resolution: f64,
    pub area_colors: BTreeMap<String, [u8; 3]>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            height_files: Vec::new(),
            osm_files: Vec::new(),
            satellite_files: Vec::new(),
            window: None,
            height_system: None,
            satellite_system: None,
            height_resolution: DEFAULT_RESOLUTION,
            satellite_resolution: DEFAULT_RESOLUTION,
            area_colors: BTreeMap::new(),
        }
    }
}

impl Project {
    pub fn files(&self, category: Category) -> &[PathBuf] {
        match category {
            Category::Elevation => &self.height_files,
            Category::Vector => &self.osm_files,
            Category::Imagery => &self.satellite_files,
        }
    }

    fn files_mut(&mut self, category: Category) -> &mut Vec<PathBuf> {
        match category {
            Category::Elevation => &mut self.height_files,
            Category::Vector => &mut self.osm_files,
            Category::Imagery => &mut self.satellite_files,
        }
    }

    pub fn has_files(&self, category: Category) -> bool {
        !self.files(category).is_empty()
    }

    /// Register an existing file under its absolute path.
    pub fn add_file(&mut self, category: Category, path: impl AsRef<Path>) -> io::Result<FileAddResult> {
        let absolute = std::path::absolute(path.as_ref())?;
        if !absolute.exists() {
            return Ok(FileAddResult::DoesntExist);
        }

        let files = self.files_mut(category);
        if files.contains(&absolute) {
            return Ok(FileAddResult::AlreadyAdded);
        }
        files.push(absolute);
        Ok(FileAddResult::Success)
    }

    pub fn set_window(&mut self, ulx: f64, uly: f64, lrx: f64, lry: f64) {
        self.window = Some(SpatialWindow::new(ulx, uly, lrx, lry));
    }

    pub fn has_window(&self) -> bool {
        self.window.is_some()
    }

    /// `"ulx uly lrx lry"`, or empty when no window is configured.
    pub fn window_string(&self) -> String {
        self.window
            .map(|w| format!("{} {} {} {}", w.ulx, w.uly, w.lrx, w.lry))
            .unwrap_or_default()
    }

    /// Forced source reference system for a raster category.
    pub fn source_system(&self, category: Category) -> Option<&str> {
        match category {
            Category::Elevation => self.height_system.as_deref(),
            Category::Imagery => self.satellite_system.as_deref(),
            Category::Vector => None,
        }
    }

    pub fn set_source_system(&mut self, category: Category, code: impl Into<String>) {
        match category {
            Category::Elevation => self.height_system = Some(code.into()),
            Category::Imagery => self.satellite_system = Some(code.into()),
            Category::Vector => {}
        }
    }

    pub fn has_height_system(&self) -> bool {
        self.height_system.is_some()
    }

    pub fn has_satellite_system(&self) -> bool {
        self.satellite_system.is_some()
    }

    /// Output cell size for a raster category.
    pub fn resolution(&self, category: Category) -> f64 {
        match category {
            Category::Imagery => self.satellite_resolution,
            _ => self.height_resolution,
        }
    }

    pub fn set_resolution(&mut self, category: Category, value: f64) {
        match category {
            Category::Elevation => self.height_resolution = value,
            Category::Imagery => self.satellite_resolution = value,
            Category::Vector => {}
        }
    }

    pub fn set_area_color(&mut self, landuse: impl Into<String>, rgb: [u8; 3]) {
        self.area_colors.insert(landuse.into(), rgb);
    }

    // ---------- Persistence ----------

    pub fn state_path(state_dir: &Path) -> PathBuf {
        state_dir.join(STATE_FILE)
    }

    /// Load the saved project, or create and save an empty one.
    pub fn load_or_init(state_dir: &Path) -> Result<Self> {
        let path = Self::state_path(state_dir);
        if !path.exists() {
            info!("No project found in {}; initializing", state_dir.display());
            let project = Project::default();
            project.save(state_dir)?;
            return Ok(project);
        }

        let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, state_dir: &Path) -> Result<()> {
        fs::create_dir_all(state_dir)
            .with_context(|| format!("Failed to create {}", state_dir.display()))?;
        let path = Self::state_path(state_dir);
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Remove the whole state directory, build files included.
    pub fn clear(state_dir: &Path) -> Result<()> {
        fs::remove_dir_all(state_dir)
            .with_context(|| format!("Failed to remove {}", state_dir.display()))
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for category in [Category::Elevation, Category::Vector, Category::Imagery] {
            let files = self.files(category);
            if files.is_empty() {
                writeln!(f, "-No {category} files added.")?;
            } else {
                writeln!(f, "-{category} files:")?;
                for path in files {
                    writeln!(f, "--{}", path.display())?;
                }
            }
        }

        match self.window {
            Some(w) => {
                writeln!(f, "-Window:")?;
                writeln!(f, "--Upper left corner:  x={}, y={}", w.ulx, w.uly)?;
                write!(f, "--Lower right corner: x={}, y={}", w.lrx, w.lry)
            }
            None => write!(f, "-No projection window set."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_tracks_results() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("dem.tif");
        File::create(&existing).unwrap();
        let mut project = Project::default();

        assert_eq!(
            project.add_file(Category::Elevation, &existing).unwrap(),
            FileAddResult::Success
        );
        assert_eq!(
            project.add_file(Category::Elevation, &existing).unwrap(),
            FileAddResult::AlreadyAdded
        );
        assert_eq!(
            project.add_file(Category::Vector, dir.path().join("missing.xml")).unwrap(),
            FileAddResult::DoesntExist
        );
        assert_eq!(project.height_files, vec![existing]);
        assert!(project.osm_files.is_empty());
    }

    #[test]
    fn add_file_accepts_many_per_category() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = Project::default();
        for i in 0..10 {
            let path = dir.path().join(format!("trails{i}.xml"));
            File::create(&path).unwrap();
            assert_eq!(
                project.add_file(Category::Vector, &path).unwrap(),
                FileAddResult::Success
            );
        }
        assert_eq!(project.files(Category::Vector).len(), 10);
    }

    #[test]
    fn missing_fields_mean_not_configured() {
        let project: Project = serde_json::from_str(
            r#"{
                "height_files": ["foo", "bar"],
                "osm_files": ["hello", "world"],
                "window": {"ulx": 1, "uly": 2, "lrx": 3, "lry": 4},
                "unknown_field": true
            }"#,
        )
        .unwrap();

        assert_eq!(project.height_files, vec![PathBuf::from("foo"), PathBuf::from("bar")]);
        assert_eq!(project.files(Category::Vector).len(), 2);
        assert_eq!(project.window.unwrap().upper_left(), (1.0, 2.0));
        assert_eq!(project.window.unwrap().lower_right(), (3.0, 4.0));
        assert!(!project.has_height_system());
        assert!(!project.has_satellite_system());
        assert_eq!(project.resolution(Category::Elevation), DEFAULT_RESOLUTION);
        assert!(project.area_colors.is_empty());
    }

    #[test]
    fn window_string_lists_corners() {
        let mut project = Project::default();
        assert!(!project.has_window());
        assert_eq!(project.window_string(), "");

        project.set_window(-1.0, 4.0, 1.0, 2.0);
        assert!(project.has_window());
        assert_eq!(project.window_string(), "-1 4 1 2");
    }

    #[test]
    fn systems_and_resolutions_per_category() {
        let mut project = Project::default();
        project.set_source_system(Category::Elevation, "EPSG:1234");
        project.set_resolution(Category::Imagery, 2.5);

        assert!(project.has_height_system());
        assert!(!project.has_satellite_system());
        assert_eq!(project.source_system(Category::Elevation), Some("EPSG:1234"));
        assert_eq!(project.resolution(Category::Imagery), 2.5);
        assert_eq!(project.resolution(Category::Elevation), DEFAULT_RESOLUTION);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join(STATE_DIR);

        let fresh = Project::load_or_init(&state_dir).unwrap();
        assert_eq!(fresh, Project::default());
        assert!(Project::state_path(&state_dir).exists());

        let mut project = fresh;
        project.set_window(0.0, 7.0, 2.0, 1.0);
        project.set_area_color("forest", [34, 139, 34]);
        project.save(&state_dir).unwrap();

        assert_eq!(Project::load_or_init(&state_dir).unwrap(), project);

        Project::clear(&state_dir).unwrap();
        assert!(!state_dir.exists());
    }

    #[test]
    fn display_lists_files_and_window() {
        let mut project = Project::default();
        project.height_files.push(PathBuf::from("/data/dem.tif"));
        project.set_window(1.0, 2.0, 3.0, 4.0);
        let text = project.to_string();

        assert!(text.contains("--/data/dem.tif"));
        assert!(text.contains("-No osm files added."));
        assert!(text.contains("x=3, y=4"));
    }
}
