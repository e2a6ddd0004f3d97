//! PDF Folder Merge Library
//!
//! Merges every PDF in a folder into a single document. Files are ordered by
//! the number at the start of their name (`1 - Intro.pdf`, `02 - Setup.pdf`,
//! ...); files without such a prefix go last.
//!
//! This library provides functionality to:
//! - Derive sort keys from filenames
//! - List candidate PDFs in a folder
//! - Append PDFs into one document and write it out
//! - Report progress as typed events
//!
//! # Example
//!
//! ```no_run
//! use pdf_folder_merge::{merge_folder, MergeOptions};
//! use pdf_folder_merge::events::Console;
//!
//! let options = MergeOptions::new("input", "results", "merged.pdf");
//!
//! merge_folder(&options, &mut Console::default()).expect("Failed to merge PDFs");
//! ```

pub mod driver;
pub mod error;
pub mod events;
pub mod pdf;
pub mod scan;
pub mod sort;

// Re-export commonly used items
pub use driver::{merge, merge_folder, merge_folder_with, MergeOptions, MergeReport};
pub use error::{Error, FailureCause, Result};
pub use events::{MergeEvent, MergeObserver};
pub use sort::{sort_key, SortKey, TieBreak};
