//! Output files in the upload directory.
//!
//! Both outputs are staged as temporary files next to their final location
//! and only renamed into place once both were written completely.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::StorageError;
use crate::pipeline::Enriched;

pub const GPX_SUFFIX: &str = "_modified.gpx";
pub const HTML_SUFFIX: &str = "_gpx_viewer.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOutputs {
    pub gpx_path: PathBuf,
    pub html_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final paths for an uploaded file name. Directory components of
    /// `file_name` are ignored.
    pub fn output_paths(&self, file_name: &str) -> Result<StoredOutputs, StorageError> {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .ok_or_else(|| StorageError::InvalidFileName(file_name.to_string()))?;

        Ok(StoredOutputs {
            gpx_path: self.dir.join(format!("{stem}{GPX_SUFFIX}")),
            html_path: self.dir.join(format!("{stem}{HTML_SUFFIX}")),
        })
    }

    /// Write the modified GPX and the viewer page. Either both files exist
    /// afterwards or no new file was created.
    ///
    /// The viewer is renamed into place first: if the GPX rename then fails,
    /// only the viewer page is removed again and an existing GPX output is
    /// left as it was.
    pub fn store(&self, file_name: &str, enriched: &Enriched, html: &str) -> Result<StoredOutputs, StorageError> {
        let paths = self.output_paths(file_name)?;
        fs::create_dir_all(&self.dir).map_err(|source| io_error(&self.dir, source))?;

        let gpx_tmp = self.stage(&enriched.gpx)?;
        let html_tmp = self.stage(html.as_bytes())?;

        html_tmp
            .persist(&paths.html_path)
            .map_err(|e| io_error(&paths.html_path, e.error))?;
        if let Err(e) = gpx_tmp.persist(&paths.gpx_path) {
            if let Err(cleanup) = fs::remove_file(&paths.html_path) {
                warn!(
                    html = %paths.html_path.display(),
                    error = %cleanup,
                    "viewer_cleanup_failed"
                );
            }
            return Err(io_error(&paths.gpx_path, e.error));
        }

        info!(
            gpx = %paths.gpx_path.display(),
            html = %paths.html_path.display(),
            "outputs_stored"
        );
        Ok(paths)
    }

    fn stage(&self, contents: &[u8]) -> Result<NamedTempFile, StorageError> {
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|source| io_error(&self.dir, source))?;
        tmp.write_all(contents)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|source| io_error(tmp.path(), source))?;
        Ok(tmp)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}
