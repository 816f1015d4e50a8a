//! Compression entry points: one call per run, composed linearly from the
//! pipeline stages.
//!
//! Each run is self-contained: options are validated, the tool is resolved
//! (from the process-wide cache after the first use), the invocation is
//! built and executed, and — for the rasterize strategy — the produced page
//! images are reassembled into the output document. Per-run scratch storage
//! is a [`tempfile::TempDir`], removed on drop whatever the outcome.
//!
//! Nothing here blocks the calling thread; front-ends await the returned
//! future and marshal the result back to their own event loop. Concurrent
//! runs are permitted but not queued or de-duplicated — that is the
//! caller's concern.

use crate::config::Strategy;
use crate::error::SqueezeError;
use crate::output::CompressionReport;
use crate::pipeline::{args, assemble, exec, locate};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Name prefix of per-run scratch directories, so leftovers are attributable.
pub const SCRATCH_PREFIX: &str = "pdf-squeeze-";

/// Compress `input` into `output` using the given strategy.
///
/// On success the output file exists at `output` and the returned report
/// carries before/after sizes. On failure no partial output is left behind
/// by the rasterize path; the other strategies overwrite `output` only
/// through the external tool itself.
pub async fn compress(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    strategy: &Strategy,
) -> Result<CompressionReport, SqueezeError> {
    let input = input.as_ref();
    let output = output.as_ref();
    let started = Instant::now();

    strategy.validate()?;
    let input_bytes = stat_input(input).await?;
    info!(
        "compressing '{}' ({input_bytes} bytes) with {}",
        input.display(),
        strategy.label()
    );

    match strategy {
        Strategy::Cleanup(opts) => {
            let tool = locate::locate(locate::ToolKind::Qpdf)?;
            let plan = args::cleanup_plan(opts, input, output);
            exec::run_tool(&tool.program, &plan.args, &plan.env).await?;
        }
        Strategy::Lossy(opts) => {
            let tool = locate::locate(locate::ToolKind::Ghostscript)?;
            let plan = args::lossy_plan(opts, tool.bundle.as_ref(), input, output);
            exec::run_tool(&tool.program, &plan.args, &plan.env).await?;
        }
        Strategy::Rasterize(opts) => {
            let tool = locate::locate(locate::ToolKind::Ghostscript)?;

            // Fresh randomly-named scratch dir per run; dropped (and removed)
            // on every exit path below.
            let scratch = tempfile::Builder::new()
                .prefix(SCRATCH_PREFIX)
                .tempdir()
                .map_err(|e| SqueezeError::Internal(format!("creating scratch dir: {e}")))?;

            let plan = args::rasterize_plan(opts, tool.bundle.as_ref(), input, scratch.path());
            exec::run_tool(&tool.program, &plan.args, &plan.env).await?;

            let images = collect_page_images(scratch.path()).await?;
            if images.is_empty() {
                return Err(SqueezeError::NoImagesProduced {
                    dir: scratch.path().to_path_buf(),
                });
            }
            debug!("rasteriser produced {} page images", images.len());

            assemble::assemble_pdf(images, output, opts.dpi).await?;
        }
    }

    let output_bytes = tokio::fs::metadata(output)
        .await
        .map_err(|e| SqueezeError::OutputWriteFailed {
            path: output.to_path_buf(),
            source: e,
        })?
        .len();

    let report = CompressionReport {
        strategy: strategy.label().to_string(),
        input_bytes,
        output_bytes,
        duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        "done: {} -> {} bytes ({:.1}% saved) in {}ms",
        report.input_bytes,
        report.output_bytes,
        report.savings_percent(),
        report.duration_ms
    );
    Ok(report)
}

/// Synchronous wrapper around [`compress`] for callers without a runtime.
///
/// Creates a temporary tokio runtime internally.
pub fn compress_sync(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    strategy: &Strategy,
) -> Result<CompressionReport, SqueezeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SqueezeError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(compress(input, output, strategy))
}

async fn stat_input(input: &Path) -> Result<u64, SqueezeError> {
    match tokio::fs::metadata(input).await {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        // Present but not a regular file (directory, socket, ...).
        Ok(_) => Err(SqueezeError::InputNotFound {
            path: input.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SqueezeError::InputNotFound {
            path: input.to_path_buf(),
        }),
        // Anything else (permissions, I/O) must not masquerade as "not found".
        Err(e) => Err(SqueezeError::InputUnreadable {
            path: input.to_path_buf(),
            source: e,
        }),
    }
}

/// Enumerate the page images the rasteriser wrote, in lexicographic filename
/// order. The zero-padded counter in [`args::PAGE_IMAGE_PATTERN`] makes that
/// order equal to page order.
async fn collect_page_images(dir: &Path) -> Result<Vec<PathBuf>, SqueezeError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| SqueezeError::Internal(format!("reading scratch dir: {e}")))?;

    let mut images = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SqueezeError::Internal(format!("reading scratch dir: {e}")))?
    {
        let path = entry.path();
        let is_jpg = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("jpg"))
            .unwrap_or(false);
        if is_jpg {
            images.push(path);
        }
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}
