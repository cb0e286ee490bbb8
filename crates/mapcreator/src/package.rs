use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write `files` into a deflate-compressed archive at `archive`, each stored
/// under its base name.
pub fn package<P: AsRef<Path>>(archive: &Path, files: &[P]) -> Result<()> {
    let out = File::create(archive)
        .with_context(|| format!("Failed to create {}", archive.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let path = path.as_ref();
        let name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?
            .to_string_lossy();

        zip.start_file(name, options)?;
        let mut input =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        io::copy(&mut input, &mut zip)?;
    }

    zip.finish()?;
    info!("Packaged {} files into {}", files.len(), archive.display());
    Ok(())
}
