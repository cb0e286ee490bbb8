use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mapcreator::{
    BuildConfig, BuildCoordinator, Category, Project, RasterTool, ToolCommand, ToolOutput,
};

/// Stands in for GDAL: records command lines and creates the files a real
/// run would write.
#[derive(Default)]
struct RecordingTool {
    calls: Mutex<Vec<String>>,
    failing: Option<&'static str>,
}

impl RecordingTool {
    fn failing(program: &'static str) -> Self {
        Self {
            failing: Some(program),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RasterTool for RecordingTool {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        self.calls.lock().unwrap().push(command.to_string());

        if command.program == "gdalinfo" {
            return Ok(ToolOutput {
                success: true,
                code: Some(0),
                stdout: r#"{"wgs84Extent": {"type": "Polygon", "coordinates": [[[24.0, 61.0], [24.0, 60.0], [25.0, 60.0], [25.0, 61.0], [24.0, 61.0]]]}}"#.into(),
                stderr: String::new(),
            });
        }
        if self.failing == Some(command.program.as_str()) {
            return Ok(ToolOutput {
                success: false,
                code: Some(1),
                stdout: String::new(),
                stderr: "ERROR 1: simulated failure".into(),
            });
        }

        if let Some(out) = command.args.last() {
            File::create(out)?;
            if command.args.iter().any(|a| a == "ENVI") {
                File::create(Path::new(out).with_extension("hdr"))?;
            }
        }
        Ok(ToolOutput {
            success: true,
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

const TRAILS: &str = r#"<osm version="0.6">
  <node id="1" lat="60.5" lon="24.5"/>
  <node id="2" lat="60.6" lon="24.6"/>
  <way id="100"><nd ref="1"/><nd ref="2"/><tag k="highway" v="track"/></way>
</osm>"#;

const TERRAIN: &str = r#"<osm version="0.6">
  <node id="10" lat="60.1" lon="24.1"/>
  <way id="200"><nd ref="10"/><tag k="landuse" v="meadow"/></way>
</osm>"#;

struct Workspace {
    dir: tempfile::TempDir,
    project: Project,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            project: Project::default(),
        }
    }

    fn add(&mut self, category: Category, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        self.project.add_file(category, &path).unwrap();
        path
    }

    fn config(&self) -> BuildConfig {
        BuildConfig::new(self.dir.path().join(".mapcreator"))
    }
}

fn names(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn full_build_produces_every_category() {
    let mut ws = Workspace::new();
    ws.add(Category::Elevation, "dem1.tif", "");
    ws.add(Category::Elevation, "dem2.tif", "");
    ws.add(Category::Imagery, "ortho.tif", "");
    ws.add(Category::Vector, "trails.xml", TRAILS);
    ws.add(Category::Vector, "terrain.xml", TERRAIN);
    ws.project.set_window(24.2, 60.9, 24.8, 60.2);
    ws.project.set_area_color("meadow", [124, 252, 0]);
    let config = ws.config();
    let tool = RecordingTool::default();

    let coordinator = BuildCoordinator::new(&config, &ws.project, &tool);
    let report = coordinator.run().unwrap();

    assert!(report.is_success(), "{report}");
    assert_eq!(
        names(&report.result_files()),
        vec![
            "heightfile0.hdr",
            "heightfile1.hdr",
            "heightfile0.bin",
            "heightfile1.bin",
            "heightfile0_satellite.png",
            "heightfile0_trails.xml",
        ]
    );
    assert!(report.result_files().iter().all(|p| p.exists()));

    let calls = tool.calls();
    // 3 rasters x (prepare, gdalinfo, clip, reproject, translate)
    assert_eq!(calls.len(), 15);
    assert!(calls
        .iter()
        .any(|c| c.starts_with("gdalwarp -te_srs EPSG:4326 -te 24.2 60.2 24.8 60.9 ")));

    // way 200 lies outside the window
    let trails = fs::read_to_string(config.finalized_dir.join("heightfile0_trails.xml")).unwrap();
    assert!(trails.contains(r#"<way id="100">"#));
    assert!(!trails.contains(r#"<way id="200">"#));

    let archive = ws.dir.path().join("package.zip");
    coordinator.package(&report, &archive).unwrap();
    let zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
    assert_eq!(zip.len(), 6);
}

#[test]
fn empty_project_builds_nothing() {
    let ws = Workspace::new();
    let config = ws.config();
    let tool = RecordingTool::default();

    let report = BuildCoordinator::new(&config, &ws.project, &tool).run().unwrap();

    assert!(report.is_success());
    assert!(report.result_files().is_empty());
    assert!(tool.calls().is_empty());
    assert!(config.finalized_dir.is_dir());
    assert!(report.to_string().contains("No height files were processed."));
}

#[test]
fn stale_build_directory_is_discarded() {
    let ws = Workspace::new();
    let config = ws.config();
    fs::create_dir_all(&config.finalized_dir).unwrap();
    let stale = config.finalized_dir.join("heightfile7.bin");
    File::create(&stale).unwrap();

    BuildCoordinator::new(&config, &ws.project, &RecordingTool::default())
        .run()
        .unwrap();

    assert!(!stale.exists());
}

#[test]
fn failures_are_collected_across_pipelines() {
    let mut ws = Workspace::new();
    ws.add(Category::Elevation, "dem.tif", "");
    ws.add(Category::Imagery, "ortho.tif", "");
    ws.add(Category::Vector, "trails.xml", TRAILS);
    ws.project.set_window(24.2, 60.9, 24.8, 60.2);
    let config = ws.config();
    let tool = RecordingTool::failing("gdalwarp");

    let report = BuildCoordinator::new(&config, &ws.project, &tool).run().unwrap();

    assert!(!report.is_success());
    let failed: Vec<String> = report
        .failures
        .iter()
        .map(|f| format!("{}/{}", f.pipeline, f.stage))
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.contains(&"height/clip_to_window".to_string()));
    assert!(failed.contains(&"satellite/clip_to_window".to_string()));
    assert!(report.height.result_files.is_empty());
    // the vector pipeline is unaffected
    assert_eq!(names(&report.osm.result_files), vec!["heightfile0_trails.xml"]);
    assert!(report.height.output.contains("simulated failure"));
    assert!(report.to_string().contains("Build completed with 2 errors"));
}

#[test]
fn rasters_without_window_never_reach_the_tool() {
    let mut ws = Workspace::new();
    ws.add(Category::Elevation, "dem.tif", "");
    ws.add(Category::Imagery, "ortho.tif", "");
    ws.add(Category::Vector, "trails.xml", TRAILS);
    let config = ws.config();
    let tool = RecordingTool::default();

    let report = BuildCoordinator::new(&config, &ws.project, &tool).run().unwrap();

    assert!(tool.calls().is_empty());
    assert!(report.is_success());
    assert!(report.height.result_files.is_empty());
    assert!(report.satellite.result_files.is_empty());
    // vector data is still written, unfiltered
    assert_eq!(names(&report.result_files()), vec!["heightfile0_trails.xml"]);
    assert!(report.height.to_string().contains("-No files were created"));
}
