//! The merge run: scan, order, append, write

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, FailureCause, Result};
use crate::events::{Console, MergeEvent, MergeObserver};
use crate::pdf::{DocumentMerger, PdfAccumulator};
use crate::scan::list_candidates;
use crate::sort::{order_candidates, TieBreak};

/// Options for merging a folder of PDFs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Folder scanned (non-recursively) for `.pdf` files
    pub input_dir: PathBuf,
    /// Folder the merged file is written to; created if missing
    pub output_dir: PathBuf,
    /// Name of the merged file inside `output_dir`
    pub output_filename: OsString,
    /// Ordering among files with the same prefix
    pub tie_break: TieBreak,
    /// Add one bookmark per source file
    pub bookmarks: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("results"),
            output_filename: OsString::from("merged.pdf"),
            tie_break: TieBreak::default(),
            bookmarks: false,
        }
    }
}

impl MergeOptions {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        output_filename: impl Into<OsString>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            output_filename: output_filename.into(),
            ..Self::default()
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_bookmarks(mut self, bookmarks: bool) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    /// Where the merged file ends up
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_filename)
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Merged file names, in the order they were appended
    pub files: Vec<String>,
    /// Pages in the merged document
    pub pages: usize,
    pub output_path: PathBuf,
}

/// Merge every PDF in `options.input_dir` into `options.output_path()`
///
/// # Example
///
/// ```no_run
/// use pdf_folder_merge::{merge_folder, MergeOptions};
/// use pdf_folder_merge::events::Silent;
///
/// let options = MergeOptions::new("chapters", "build", "book.pdf");
/// let report = merge_folder(&options, &mut Silent).expect("Failed to merge");
/// println!("{} pages", report.pages);
/// ```
pub fn merge_folder(
    options: &MergeOptions,
    observer: &mut impl MergeObserver,
) -> Result<MergeReport> {
    let merger = PdfAccumulator::new().with_bookmarks(options.bookmarks);
    merge_folder_with(options, merger, observer)
}

/// Same as [`merge_folder`], appending through a caller-supplied merger
pub fn merge_folder_with<M: DocumentMerger>(
    options: &MergeOptions,
    merger: M,
    observer: &mut impl MergeObserver,
) -> Result<MergeReport> {
    let result = run(options, merger, observer);

    if let Err(err) = &result {
        let event = match err {
            Error::NoInputFiles(dir) => MergeEvent::NoInputFiles {
                input_dir: dir.clone(),
            },
            Error::MergeFailure { .. } => MergeEvent::Failed {
                description: err.to_string(),
            },
        };
        debug!(?event, "merge run failed");
        observer.on_event(&event);
    }

    result
}

/// Boolean form of [`merge_folder`] that reports progress on stderr
pub fn merge(input_dir: &Path, output_dir: &Path, output_filename: &str) -> bool {
    let options = MergeOptions::new(input_dir, output_dir, output_filename);
    merge_folder(&options, &mut Console::default()).is_ok()
}

fn run<M: DocumentMerger>(
    options: &MergeOptions,
    mut merger: M,
    observer: &mut impl MergeObserver,
) -> Result<MergeReport> {
    ensure_output_dir(&options.output_dir)?;

    let mut names = list_candidates(&options.input_dir)?;
    if names.is_empty() {
        return Err(Error::NoInputFiles(options.input_dir.clone()));
    }
    order_candidates(&mut names, options.tie_break);

    let total = names.len();
    observer.on_event(&MergeEvent::Started {
        input_dir: options.input_dir.clone(),
        files: total,
    });

    let mut files = Vec::with_capacity(total);
    let mut pages = 0;
    for (i, name) in names.iter().enumerate() {
        let display_name = name.to_string_lossy().into_owned();
        let path = options.input_dir.join(name);

        observer.on_event(&MergeEvent::Adding {
            index: i + 1,
            total,
            name: display_name.clone(),
        });
        let added = merger.append(&path)?;
        observer.on_event(&MergeEvent::Added {
            name: display_name.clone(),
            pages: added,
        });

        pages += added;
        files.push(display_name);
    }

    let output_path = options.output_path();
    merger.write(&output_path)?;

    info!(files = total, pages, output = %output_path.display(), "merged PDFs");
    observer.on_event(&MergeEvent::Finished {
        files: total,
        pages,
        output: output_path.clone(),
    });

    Ok(MergeReport {
        files,
        pages,
        output_path,
    })
}

/// Create `dir` itself (not its parents) unless it is already a directory
fn ensure_output_dir(dir: &Path) -> std::result::Result<(), FailureCause> {
    match fs::create_dir(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "created output folder");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(source) => Err(FailureCause::CreateOutputDir {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
