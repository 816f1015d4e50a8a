//! Error types for the pdf-squeeze library.
//!
//! Every failure in a compression run is terminal for that run — nothing is
//! retried automatically. Each variant carries enough context to render a
//! self-sufficient message; the orchestration layer never swallows or
//! reinterprets a lower-level error. The one piece of "interpretation" that
//! exists — a recovery hint for the common force-kill case — lives in
//! [`SqueezeError::hint`] so the presentation layer can attach it without the
//! process runner knowing about it.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// How a subprocess terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TerminationKind {
    /// The process ran to completion and returned an exit status.
    Exit,
    /// The process was terminated by a signal (unix only).
    Signal,
}

impl fmt::Display for TerminationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationKind::Exit => write!(f, "exit"),
            TerminationKind::Signal => write!(f, "signal"),
        }
    }
}

/// All errors returned by the pdf-squeeze library.
#[derive(Debug, Error)]
pub enum SqueezeError {
    /// Input file was not found at the given path.
    #[error("input PDF not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Input file exists (or its status is unknown) but could not be
    /// inspected, e.g. a permission problem.
    #[error("cannot read input PDF '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Options validation failed before any tool was invoked.
    #[error("invalid options: {0}")]
    InvalidConfig(String),

    /// The external tool was found neither in the bundled tree nor on PATH.
    #[error(
        "'{tool}' was not found.\n\
         Install it and make sure it is on PATH, or set PDFSQUEEZE_TOOL_DIR \
         to a directory containing {tool}/bin/{tool}."
    )]
    MissingBinary { tool: String },

    /// A bundled Ghostscript was located but its resource tree is malformed.
    #[error("Ghostscript resource bundle at '{share_dir}' is unusable: {detail}")]
    MissingResources { share_dir: PathBuf, detail: String },

    /// The subprocess could not be spawned at all.
    #[error("failed to launch '{program}': {source}")]
    LaunchFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The subprocess ran and exited non-zero, or was killed by a signal.
    ///
    /// `code` is the exit status for [`TerminationKind::Exit`] and the signal
    /// number for [`TerminationKind::Signal`]. `log` is the merged, trimmed
    /// stdout/stderr text and may be empty.
    #[error("'{tool}' failed ({kind} {code}){}", format_log(.log))]
    ProcessFailed {
        tool: String,
        code: i32,
        kind: TerminationKind,
        log: String,
    },

    /// The rasterizing tool exited successfully but wrote zero page images.
    #[error("rasterisation produced no page images in '{dir}'")]
    NoImagesProduced { dir: PathBuf },

    /// Document-writer creation, image decode, or finalise failed while
    /// reassembling page images into a PDF.
    #[error("failed to assemble page images into a PDF: {detail}")]
    AssemblyFailed { detail: String },

    /// Could not create or move the output document into place.
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_log(log: &str) -> String {
    if log.is_empty() {
        String::new()
    } else {
        format!(":\n{log}")
    }
}

impl SqueezeError {
    /// Optional recovery hint for the user, rendered by the presentation
    /// layer after the error message itself.
    ///
    /// Signal 9 almost always means the kernel killed the tool under memory
    /// pressure, which the raw "signal 9" phrasing does not convey.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SqueezeError::ProcessFailed {
                code: 9,
                kind: TerminationKind::Signal,
                ..
            } => Some(
                "The tool was force-killed (signal 9), most likely due to memory \
                 pressure. Try a lower DPI or a lighter compression setting.",
            ),
            _ => None,
        }
    }
}
