//! Gateway to the external GDAL command-line tools.
//!
//! The tools are opaque collaborators: we build a command line, run it to
//! completion and keep its output. A nonzero exit never panics; it becomes a
//! [`StageError::Tool`] carrying the captured stderr. There is no timeout.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::Command;

use log::debug;
use serde::Deserialize;

use crate::error::StageError;
use crate::window::RasterExtent;

/// A program plus its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Everything a finished tool run reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external raster tools. Implementations block until the tool exits.
pub trait RasterTool: Send + Sync {
    /// `Err` only when the tool could not be started at all.
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput>;
}

/// Spawns the real executables.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTool;

impl RasterTool for ProcessTool {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .output()?;

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `command`, appending its diagnostics to `transcript`.
///
/// stderr is always kept; with `debug` the command line and stdout are kept too.
pub fn call(
    tool: &dyn RasterTool,
    command: &ToolCommand,
    debug: bool,
    transcript: &mut String,
) -> Result<(), StageError> {
    debug!("Running {command}");
    if debug {
        transcript.push_str(&format!("\n[{command}]\n"));
    }

    let output = tool.run(command).map_err(|source| StageError::Spawn {
        command: command.to_string(),
        source,
    })?;

    if debug {
        transcript.push_str(&output.stdout);
    }
    transcript.push_str(&output.stderr);

    if output.success {
        Ok(())
    } else {
        Err(StageError::Tool {
            command: command.to_string(),
            code: output.code,
            stderr: output.stderr.trim().to_owned(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GdalInfo {
    #[serde(rename = "wgs84Extent")]
    wgs84_extent: Option<Wgs84Extent>,
}

#[derive(Debug, Deserialize)]
struct Wgs84Extent {
    coordinates: Vec<Vec<[f64; 2]>>,
}

/// Extent of the outer ring of `gdalinfo -json`'s `wgs84Extent` polygon.
pub fn parse_extent(json: &str) -> Result<RasterExtent, String> {
    let info: GdalInfo = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let ring = info
        .wgs84_extent
        .as_ref()
        .and_then(|e| e.coordinates.first())
        .ok_or_else(|| "no wgs84Extent in gdalinfo output".to_string())?;

    RasterExtent::from_ring(ring).ok_or_else(|| "wgs84Extent has no finite coordinates".to_string())
}

/// One metadata query per file: `gdalinfo -json <path>`.
pub fn query_extent(tool: &dyn RasterTool, gdalinfo: &str, path: &Path) -> Result<RasterExtent, StageError> {
    let command = ToolCommand::new(gdalinfo).arg("-json").path(path);
    debug!("Running {command}");

    let output = tool.run(&command).map_err(|source| StageError::Spawn {
        command: command.to_string(),
        source,
    })?;
    if !output.success {
        return Err(StageError::Extent {
            path: path.to_path_buf(),
            reason: output.stderr.trim().to_owned(),
        });
    }

    parse_extent(&output.stdout).map_err(|reason| StageError::Extent {
        path: path.to_path_buf(),
        reason,
    })
}
