use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use mapcreator::{
    BuildConfig, BuildCoordinator, Category, FileAddResult, ProcessTool, Project, ToolPrograms,
    STATE_DIR,
};

#[derive(Parser, Debug)]
#[command(name = "mapcreator", version)]
#[command(about = "Build 3D map packages from elevation, imagery and OSM trail data")]
struct Cli {
    /// Project state directory
    #[arg(long, global = true, default_value = STATE_DIR)]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty project (or keep the existing one)
    Init,
    /// Add input files to a category
    Add {
        #[arg(value_enum)]
        category: Category,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Set the window by its upper-left and lower-right corners (lon/lat)
    #[command(allow_negative_numbers = true)]
    Window { ulx: f64, uly: f64, lrx: f64, lry: f64 },
    /// Force the source reference system of a raster category, e.g. EPSG:3067
    System {
        #[arg(value_enum)]
        category: Category,
        code: String,
    },
    /// Output cell size of a raster category
    Resolution {
        #[arg(value_enum)]
        category: Category,
        value: f64,
    },
    /// Colour for areas with the given land use
    Color { landuse: String, r: u8, g: u8, b: u8 },
    /// Show the project
    Status,
    /// Run all pipelines and package the results
    Build {
        /// Keep tool command lines and stdout in the report, and keep the build directory
        #[arg(long, default_value_t = false)]
        debug: bool,
        /// Archive to write
        #[arg(long, default_value = "package.zip")]
        output: PathBuf,
    },
    /// Remove the project and all build files
    Clear,
}

fn raster_only(category: Category) -> Result<()> {
    if category == Category::Vector {
        bail!("{category} files have no raster settings");
    }
    Ok(())
}

fn build(state_dir: &Path, debug: bool, output: &Path) -> Result<()> {
    let project = Project::load_or_init(state_dir)?;
    let config = BuildConfig::new(state_dir)
        .with_debug(debug)
        .with_tools(ToolPrograms::from_env());
    let tool = ProcessTool;
    let coordinator = BuildCoordinator::new(&config, &project, &tool);

    let report = coordinator.run()?;
    println!("{report}");
    coordinator.package(&report, output)?;
    info!("Wrote {}", output.display());

    if debug {
        info!("Keeping build files in {}", config.build_dir.display());
    } else if let Err(e) = config.cleanup() {
        warn!("Unable to clean temporary build files: {e}");
    }

    if !report.is_success() {
        bail!("Build completed with {} errors", report.failures.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let state_dir = &cli.state_dir;

    match cli.command {
        Commands::Init => {
            Project::load_or_init(state_dir)?;
            println!("Project ready in {}", state_dir.display());
        }
        Commands::Add { category, files } => {
            let mut project = Project::load_or_init(state_dir)?;
            for file in &files {
                let result = project
                    .add_file(category, file)
                    .with_context(|| format!("Unable to resolve {}", file.display()))?;
                match result {
                    FileAddResult::Success => println!("Added {} file {}", category, file.display()),
                    FileAddResult::AlreadyAdded => {
                        println!("{} is already in the project", file.display())
                    }
                    FileAddResult::DoesntExist => println!("{} does not exist", file.display()),
                }
            }
            project.save(state_dir)?;
        }
        Commands::Window { ulx, uly, lrx, lry } => {
            let mut project = Project::load_or_init(state_dir)?;
            project.set_window(ulx, uly, lrx, lry);
            project.save(state_dir)?;
            println!("Window set to {}", project.window_string());
        }
        Commands::System { category, code } => {
            raster_only(category)?;
            let mut project = Project::load_or_init(state_dir)?;
            project.set_source_system(category, code);
            project.save(state_dir)?;
        }
        Commands::Resolution { category, value } => {
            raster_only(category)?;
            if !(value.is_finite() && value > 0.0) {
                bail!("Resolution must be a positive number, got {value}");
            }
            let mut project = Project::load_or_init(state_dir)?;
            project.set_resolution(category, value);
            project.save(state_dir)?;
        }
        Commands::Color { landuse, r, g, b } => {
            let mut project = Project::load_or_init(state_dir)?;
            project.set_area_color(landuse, [r, g, b]);
            project.save(state_dir)?;
        }
        Commands::Status => {
            let project = Project::load_or_init(state_dir)?;
            println!("{project}");
        }
        Commands::Build { debug, output } => build(state_dir, debug, &output)?,
        Commands::Clear => {
            if state_dir.exists() {
                Project::clear(state_dir)?;
            }
            println!("Project cleared");
        }
    }

    Ok(())
}
