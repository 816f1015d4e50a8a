//! # pdf-squeeze
//!
//! Shrink PDF files by driving two battle-tested external tools — qpdf and
//! Ghostscript — instead of reimplementing PDF internals.
//!
//! ## Why this crate?
//!
//! Rewriting PDF object streams, down-sampling embedded images, and
//! rasterising pages are all solved problems; qpdf and Ghostscript do them
//! better than any reimplementation would. What a front-end actually needs
//! is the orchestration around them: finding a bundled or system-installed
//! binary (plus Ghostscript's versioned resource tree), building the exact
//! argument lists, running the tool without blocking the caller, and turning
//! its exit status into something a user can act on.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input.pdf
//!  │
//!  ├─ 1. Locate   bundled tools/ tree, falling back to $PATH
//!  ├─ 2. Build    strategy options → argv + env overlay (pure)
//!  ├─ 3. Run      async subprocess, merged stdout/stderr capture
//!  └─ 4. Assemble rasterize only: page JPEGs → multi-page PDF
//! ```
//!
//! ## Strategies
//!
//! | Strategy | Tool | Effect |
//! |----------|------|--------|
//! | [`Strategy::Cleanup`]   | qpdf | restructure storage, pixels untouched |
//! | [`Strategy::Lossy`]     | Ghostscript `pdfwrite` | down-sample images, keep text selectable |
//! | [`Strategy::Rasterize`] | Ghostscript `jpeg` | flatten pages to images, smallest output |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_squeeze::{compress, CleanupOptions, Strategy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let strategy = Strategy::Cleanup(CleanupOptions::default());
//!     let report = compress("input.pdf", "output.pdf", &strategy).await?;
//!     println!("{} -> {} bytes", report.input_bytes, report.output_bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsqueeze` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-squeeze = { version = "0.3", default-features = false }
//! ```
//!
//! ## Bundled tools
//!
//! Both tools are looked up first in `tools/` next to the running executable
//! (override with `PDFSQUEEZE_TOOL_DIR`), at `tools/qpdf/bin/qpdf` and
//! `tools/gs/bin/gs` with Ghostscript's `share/ghostscript/<version>` tree
//! alongside. A system copy found on `$PATH` is used as a fallback and runs
//! with its own built-in resources.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compress;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compress::{compress, compress_sync};
pub use config::{CleanupOptions, LossyOptions, LossyPreset, RasterizeOptions, Strategy};
pub use error::{SqueezeError, TerminationKind};
pub use output::CompressionReport;
pub use pipeline::locate::{locate, ResolvedTool, ResourceBundle, ToolKind};
