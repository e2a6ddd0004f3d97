//! Progress events emitted by the merge driver

use std::path::PathBuf;

/// Something observable that happened during a merge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeEvent {
    /// Candidates were found and ordered
    Started { input_dir: PathBuf, files: usize },
    /// About to append one file (1-based `index`)
    Adding {
        index: usize,
        total: usize,
        name: String,
    },
    /// A file was appended
    Added { name: String, pages: usize },
    /// The merged document was written
    Finished {
        files: usize,
        pages: usize,
        output: PathBuf,
    },
    /// The input folder held no PDFs
    NoInputFiles { input_dir: PathBuf },
    /// The run failed; `description` is the error's display text
    Failed { description: String },
}

/// Receiver of [`MergeEvent`]s
///
/// Implemented for any `FnMut(&MergeEvent)`, so a closure works as an observer.
pub trait MergeObserver {
    fn on_event(&mut self, event: &MergeEvent);
}

impl<F> MergeObserver for F
where
    F: FnMut(&MergeEvent),
{
    fn on_event(&mut self, event: &MergeEvent) {
        self(event)
    }
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl MergeObserver for Silent {
    fn on_event(&mut self, _event: &MergeEvent) {}
}

/// Observer that keeps every event, for inspection after the run
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub events: Vec<MergeEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names from `Adding` events, in the order they were appended
    pub fn added_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MergeEvent::Adding { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl MergeObserver for Recorder {
    fn on_event(&mut self, event: &MergeEvent) {
        self.events.push(event.clone());
    }
}

/// Observer that prints each event's message to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct Console {
    /// Only report failures
    pub quiet: bool,
}

impl MergeObserver for Console {
    fn on_event(&mut self, event: &MergeEvent) {
        if self.quiet && !event.is_failure() {
            return;
        }
        if let Some(message) = event.message() {
            eprintln!("{}", message);
        }
    }
}

impl MergeEvent {
    /// True for the events that end a run unsuccessfully
    pub fn is_failure(&self) -> bool {
        matches!(self, MergeEvent::NoInputFiles { .. } | MergeEvent::Failed { .. })
    }

    /// Console wording for this event, or `None` for events that stay quiet
    pub fn message(&self) -> Option<String> {
        match self {
            MergeEvent::Adding { name, .. } => Some(format!("Adding: {}", name)),
            MergeEvent::Finished { files, output, .. } => Some(format!(
                "Successfully merged {} PDF files into '{}'",
                files,
                output.display()
            )),
            MergeEvent::NoInputFiles { input_dir } => Some(format!(
                "No PDF files found in the '{}' folder.",
                input_dir.display()
            )),
            MergeEvent::Failed { description } => {
                Some(format!("An error occurred: {}", description))
            }
            MergeEvent::Started { .. } | MergeEvent::Added { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |event: &MergeEvent| seen.push(event.clone());
            observer.on_event(&MergeEvent::Added {
                name: "1 - a.pdf".to_string(),
                pages: 3,
            });
        }
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_recorder_added_names() {
        let mut recorder = Recorder::new();
        for (index, name) in ["1 - a.pdf", "2 - b.pdf"].iter().enumerate() {
            recorder.on_event(&MergeEvent::Adding {
                index: index + 1,
                total: 2,
                name: name.to_string(),
            });
        }
        assert_eq!(recorder.added_names(), vec!["1 - a.pdf", "2 - b.pdf"]);
    }

    #[test]
    fn test_messages() {
        let finished = MergeEvent::Finished {
            files: 3,
            pages: 7,
            output: PathBuf::from("results/merged.pdf"),
        };
        assert_eq!(
            finished.message().as_deref(),
            Some("Successfully merged 3 PDF files into 'results/merged.pdf'")
        );
        assert_eq!(
            MergeEvent::Started {
                input_dir: PathBuf::from("input"),
                files: 2
            }
            .message(),
            None
        );
    }
}
