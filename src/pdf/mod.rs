//! PDF manipulation module

pub mod accumulator;
pub mod metadata;
pub mod outline;

// Re-export commonly used items
pub use accumulator::{DocumentMerger, PdfAccumulator};
pub use metadata::{count_pages, page_sizes};
