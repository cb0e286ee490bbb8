//! Per-job mutable state of a raster pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::project::Category;

/// Current working set plus the set the running stage is building.
///
/// [`advance`](Self::advance) is the stage barrier: it swaps `next` into
/// `current` and clears `next`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBuffer {
    current: Vec<PathBuf>,
    next: Vec<PathBuf>,
}

impl FileBuffer {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            current: files,
            next: Vec::new(),
        }
    }

    pub fn current(&self) -> &[PathBuf] {
        &self.current
    }

    pub fn pending(&self) -> &[PathBuf] {
        &self.next
    }

    pub fn push_next(&mut self, path: PathBuf) {
        self.next.push(path);
    }

    pub fn advance(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
        self.next.clear();
    }
}

/// Whether any stage has replaced the original inputs yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<'a> {
    Progressed(&'a [PathBuf]),
    NoProgress,
}

/// Which raster pipeline a status belongs to; decides formats and final names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterKind {
    Height,
    Satellite,
}

impl RasterKind {
    pub fn category(self) -> Category {
        match self {
            RasterKind::Height => Category::Elevation,
            RasterKind::Satellite => Category::Imagery,
        }
    }

    /// GDAL driver for the final encoding.
    pub fn output_format(self) -> &'static str {
        match self {
            RasterKind::Height => "ENVI",
            RasterKind::Satellite => "PNG",
        }
    }

    pub fn output_extension(self) -> &'static str {
        match self {
            RasterKind::Height => "bin",
            RasterKind::Satellite => "png",
        }
    }

    pub fn final_name(self, index: usize) -> String {
        match self {
            RasterKind::Height => format!("heightfile{index}.bin"),
            RasterKind::Satellite => format!("heightfile{index}_satellite.png"),
        }
    }
}

impl fmt::Display for RasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.category(), f)
    }
}

pub const INTERNAL_FORMAT: &str = "GTiff";
pub const INTERNAL_EXTENSION: &str = "tiff";
pub const HEIGHT_METADATA_EXTENSION: &str = "hdr";

pub fn height_metadata_name(index: usize) -> String {
    format!("heightfile{index}.{HEIGHT_METADATA_EXTENSION}")
}

/// Working state of one elevation or imagery job.
#[derive(Debug, Clone)]
pub struct RasterStatus {
    pub kind: RasterKind,
    pub original_files: Vec<PathBuf>,
    pub files: FileBuffer,
    pub result_files: Vec<PathBuf>,
    /// Captured tool diagnostics.
    pub output: String,
    index: usize,
    metaindex: usize,
}

impl RasterStatus {
    pub fn new(kind: RasterKind, index: usize, files: Vec<PathBuf>) -> Self {
        Self {
            kind,
            original_files: files.clone(),
            files: FileBuffer::new(files),
            result_files: Vec::new(),
            output: String::new(),
            index,
            metaindex: index,
        }
    }

    /// Read-then-increment counter for final output names.
    pub fn next_index(&mut self) -> usize {
        let index = self.index;
        self.index += 1;
        index
    }

    /// Metadata index the next sidecar will get.
    pub fn metaindex(&self) -> usize {
        self.metaindex
    }

    /// Same as [`next_index`](Self::next_index), for metadata sidecars.
    pub fn next_metaindex(&mut self) -> usize {
        let index = self.metaindex;
        self.metaindex += 1;
        index
    }

    pub fn add_result_file(&mut self, path: PathBuf) {
        self.result_files.push(path);
    }

    pub fn progress(&self) -> Progress<'_> {
        if self.files.current() == self.original_files.as_slice() {
            Progress::NoProgress
        } else {
            Progress::Progressed(self.files.current())
        }
    }
}

impl fmt::Display for RasterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original_files.is_empty() {
            return write!(f, "No {} files were processed.", self.kind);
        }

        write!(f, "Build results for {}:", basenames(&self.original_files))?;
        if self.result_files.is_empty() {
            write!(f, "\n-No files were created")?;
        } else {
            write!(f, "\n-Files created: {}", basenames(&self.result_files))?;
        }
        if !self.output.is_empty() {
            write!(f, "\n-Messages from GDAL:")?;
            for line in self.output.lines() {
                write!(f, "\n{line}")?;
            }
        }
        Ok(())
    }
}

pub(crate) fn basenames(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split a leading `[N]` generation counter off a file name.
fn split_generation(name: &str) -> Option<(u64, &str)> {
    let rest = name.strip_prefix('[')?;
    let (digits, tail) = rest.split_once(']')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, tail))
}

/// Next intermediate path for `input` inside `build_dir`.
///
/// `[N]name` becomes `[N+1]name`; a name without a counter becomes `[0]name`.
/// `new_extension` is appended, never substituted.
pub fn output_path(build_dir: &Path, input: &Path, new_extension: Option<&str>) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut output = match split_generation(&name) {
        Some((generation, rest)) => format!("[{}]{}", generation + 1, rest),
        None => format!("[0]{name}"),
    };
    if let Some(ext) = new_extension.filter(|e| !e.is_empty()) {
        output.push('.');
        output.push_str(ext);
    }

    build_dir.join(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD: &str = "/work/.mapcreator/build";

    fn build() -> &'static Path {
        Path::new(BUILD)
    }

    #[test]
    fn output_path_for_initial_file() {
        assert_eq!(
            output_path(build(), Path::new("/data/myfile.x"), None),
            build().join("[0]myfile.x")
        );
        assert_eq!(
            output_path(build(), Path::new("/data/myfile.x"), Some("y")),
            build().join("[0]myfile.x.y")
        );
    }

    #[test]
    fn output_path_for_intermediate_file() {
        assert_eq!(
            output_path(build(), &build().join("[7]myfile.x.y"), None),
            build().join("[8]myfile.x.y")
        );
        assert_eq!(
            output_path(build(), &build().join("[11]myfile.x.y"), Some("z")),
            build().join("[12]myfile.x.y.z")
        );
    }

    #[test]
    fn deriving_twice_counts_generations() {
        let once = output_path(build(), Path::new("dem.tif"), None);
        let twice = output_path(build(), &once, None);
        assert_eq!(once, build().join("[0]dem.tif"));
        assert_eq!(twice, build().join("[1]dem.tif"));
    }

    #[test]
    fn non_numeric_brackets_are_part_of_the_name() {
        assert_eq!(
            output_path(build(), Path::new("[draft]dem.tif"), None),
            build().join("[0][draft]dem.tif")
        );
        assert_eq!(
            output_path(build(), Path::new("[]dem.tif"), None),
            build().join("[0][]dem.tif")
        );
    }

    #[test]
    fn advance_swaps_buffers() {
        let mut files = FileBuffer::new(vec!["a".into(), "b".into()]);
        files.push_next("c".into());
        assert_eq!(files.pending(), &[PathBuf::from("c")]);

        files.advance();
        assert_eq!(files.current(), &[PathBuf::from("c")]);
        assert!(files.pending().is_empty());

        files.advance();
        assert!(files.current().is_empty());
    }

    #[test]
    fn counters_read_then_increment() {
        let mut status = RasterStatus::new(RasterKind::Height, 99, vec![]);
        assert_eq!(status.next_index(), 99);
        assert_eq!(status.next_index(), 100);
        assert_eq!(status.next_metaindex(), 99);
    }

    #[test]
    fn progress_tracks_replacement_of_inputs() {
        let mut status = RasterStatus::new(RasterKind::Height, 0, vec!["test.txt".into()]);
        assert_eq!(status.progress(), Progress::NoProgress);

        status.files.push_next("[0]test.txt".into());
        status.files.advance();
        assert_eq!(
            status.progress(),
            Progress::Progressed(&[PathBuf::from("[0]test.txt")])
        );
    }

    #[test]
    fn summary_lists_inputs_results_and_messages() {
        let mut status = RasterStatus::new(RasterKind::Satellite, 0, vec!["/data/a.tif".into()]);
        assert!(status.to_string().contains("-No files were created"));

        status.add_result_file("/out/heightfile0_satellite.png".into());
        status.output.push_str("Warning 1: nodata\n");
        let text = status.to_string();

        assert!(text.starts_with("Build results for a.tif:"));
        assert!(text.contains("-Files created: heightfile0_satellite.png"));
        assert!(text.contains("Warning 1: nodata"));

        let empty = RasterStatus::new(RasterKind::Height, 0, vec![]);
        assert_eq!(empty.to_string(), "No height files were processed.");
    }
}
