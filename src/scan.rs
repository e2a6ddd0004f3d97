//! Discovery of candidate PDFs in the input folder

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::FailureCause;

/// True when the name ends in `.pdf`, ignoring case
pub fn has_pdf_suffix(name: &OsStr) -> bool {
    name.to_string_lossy().to_lowercase().ends_with(".pdf")
}

/// List the PDF file names directly inside `dir`, in directory-listing order
///
/// Sub-directories are never descended into, and directories that happen to
/// be named `*.pdf` are skipped.
pub fn list_candidates(dir: &Path) -> Result<Vec<OsString>, FailureCause> {
    let read_error = |source| FailureCause::ReadInputDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let name = entry.file_name();
        if !has_pdf_suffix(&name) {
            continue;
        }

        // file_type() does not follow symlinks; a link to a PDF is kept
        let is_dir = entry
            .file_type()
            .map(|kind| kind.is_dir())
            .map_err(read_error)?;
        if is_dir {
            debug!(name = %name.to_string_lossy(), "skipping directory with .pdf suffix");
            continue;
        }

        names.push(name);
    }

    debug!(dir = %dir.display(), count = names.len(), "listed candidates");
    Ok(names)
}
