//! PDF Folder Merge CLI tool
//!
//! Merges every PDF in a folder into one file, ordered by numeric filename prefix.

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use pdf_folder_merge::events::Console;
use pdf_folder_merge::{merge_folder, Error, MergeOptions, TieBreak};

/// Merge PDF files from an input folder
#[derive(Parser)]
#[command(name = "pdf-folder-merge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge input/*.pdf into results/merged.pdf
    pdf-folder-merge

    # Merge chapters named like \"01 - Intro.pdf\" into a book
    pdf-folder-merge --input chapters --output build --filename book.pdf

    # Deterministic order for unnumbered files, with bookmarks
    pdf-folder-merge --sort-ties name --bookmarks")]
struct Cli {
    /// Input folder containing PDF files
    #[arg(long, default_value = "input")]
    input: PathBuf,

    /// Output folder for the merged PDF
    #[arg(long, default_value = "results")]
    output: PathBuf,

    /// Name of the output merged PDF file
    #[arg(long, default_value = "merged.pdf")]
    filename: String,

    /// How files with the same prefix (or no prefix) are ordered
    #[arg(long, value_enum, default_value_t = Ties::Listing)]
    sort_ties: Ties,

    /// Add a bookmark at the first page of each merged file
    #[arg(long)]
    bookmarks: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Ties {
    /// Keep directory listing order
    Listing,
    /// Sort by file name
    Name,
}

impl From<Ties> for TieBreak {
    fn from(ties: Ties) -> Self {
        match ties {
            Ties::Listing => TieBreak::Listing,
            Ties::Name => TieBreak::Name,
        }
    }
}

/// Exit code when the input folder holds no PDFs
const EXIT_NO_INPUT: i32 = 2;

fn init_logging() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_folder_merge=warn".into()),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Warning: {}", e);
    }

    let options = MergeOptions::new(cli.input, cli.output, cli.filename)
        .with_tie_break(cli.sort_ties.into())
        .with_bookmarks(cli.bookmarks);

    let mut console = Console { quiet: cli.quiet };

    // The console observer has already printed the failure
    match merge_folder(&options, &mut console) {
        Ok(_) => {}
        Err(Error::NoInputFiles(_)) => process::exit(EXIT_NO_INPUT),
        Err(Error::MergeFailure { .. }) => process::exit(1),
    }
}
