//! End-to-end integration tests for pdf-squeeze.
//!
//! These tests invoke the real `qpdf` and `gs` binaries, so the tool-gated
//! ones skip themselves with a `SKIP` line when the tool is not on $PATH.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use pdf_squeeze::{
    compress, CleanupOptions, LossyOptions, LossyPreset, RasterizeOptions, SqueezeError, Strategy,
};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless `$tool` resolves on $PATH.
macro_rules! skip_unless_tool {
    ($tool:expr) => {{
        if !tool_on_path($tool) {
            println!("SKIP — '{}' not found on $PATH", $tool);
            return;
        }
    }};
}

fn tool_on_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(name).is_file())
}

/// Build a small three-page PDF fixture with real text content.
fn write_fixture_pdf(path: &Path) {
    use printpdf::{BuiltinFont, Mm, PdfDocument};

    let (doc, page, layer) = PdfDocument::new("fixture", Mm(210.0), Mm(297.0), "layer");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .expect("builtin font");
    doc.get_page(page)
        .get_layer(layer)
        .use_text("Page one of the fixture document.", 14.0, Mm(20.0), Mm(270.0), &font);
    for n in 2..=3 {
        let (page, layer) = doc.add_page(Mm(210.0), Mm(297.0), "layer");
        doc.get_page(page).get_layer(layer).use_text(
            format!("Page {n} of the fixture document."),
            14.0,
            Mm(20.0),
            Mm(270.0),
            &font,
        );
    }
    let bytes = doc.save_to_bytes().expect("serialise fixture pdf");
    std::fs::write(path, bytes).expect("write fixture pdf");
}

fn page_count(path: &Path) -> usize {
    let doc = lopdf::Document::load(path).expect("load output pdf");
    doc.get_pages().len()
}

fn scratch() -> tempfile::TempDir {
    tempfile::TempDir::new().expect("create scratch dir")
}

// ── Cleanup (qpdf) ───────────────────────────────────────────────────────────

#[tokio::test]
async fn cleanup_produces_valid_pdf() {
    skip_unless_tool!("qpdf");
    let dir = scratch();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_fixture_pdf(&input);

    let report = compress(&input, &output, &Strategy::Cleanup(CleanupOptions::default()))
        .await
        .expect("cleanup run");

    assert!(output.is_file());
    assert_eq!(page_count(&output), 3);
    assert_eq!(report.strategy, "lossless cleanup");
    assert_eq!(report.input_bytes, std::fs::metadata(&input).unwrap().len());
    assert_eq!(report.output_bytes, std::fs::metadata(&output).unwrap().len());
}

/// Same input and options twice must give byte-identical output.
#[tokio::test]
async fn cleanup_is_deterministic() {
    skip_unless_tool!("qpdf");
    let dir = scratch();
    let input = dir.path().join("in.pdf");
    write_fixture_pdf(&input);

    let opts = Strategy::Cleanup(CleanupOptions {
        compression_level: 9,
        object_streams: true,
        recompress_flate: true,
        optimize_images: false,
    });
    let out_a = dir.path().join("a.pdf");
    let out_b = dir.path().join("b.pdf");
    compress(&input, &out_a, &opts).await.expect("first run");
    compress(&input, &out_b, &opts).await.expect("second run");

    let a = std::fs::read(&out_a).unwrap();
    let b = std::fs::read(&out_b).unwrap();
    assert_eq!(a, b, "cleanup output must be reproducible");
}

// ── Lossy (Ghostscript) ──────────────────────────────────────────────────────

#[tokio::test]
async fn lossy_balanced_preserves_pages() {
    skip_unless_tool!("gs");
    let dir = scratch();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_fixture_pdf(&input);

    let report = compress(
        &input,
        &output,
        &Strategy::Lossy(LossyOptions::for_preset(LossyPreset::Balanced)),
    )
    .await
    .expect("lossy run");

    assert_eq!(page_count(&output), 3);
    assert_eq!(report.strategy, "lossy recompression");
    assert!(report.output_bytes > 0);
}

#[tokio::test]
async fn lossy_aggressive_preserves_pages() {
    skip_unless_tool!("gs");
    let dir = scratch();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_fixture_pdf(&input);

    compress(
        &input,
        &output,
        &Strategy::Lossy(LossyOptions::for_preset(LossyPreset::Aggressive)),
    )
    .await
    .expect("aggressive lossy run");

    assert_eq!(page_count(&output), 3);
}

// ── Rasterize (Ghostscript + assembler) ──────────────────────────────────────

#[tokio::test]
async fn rasterize_rebuilds_one_image_page_per_input_page() {
    skip_unless_tool!("gs");
    let dir = scratch();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_fixture_pdf(&input);

    let report = compress(
        &input,
        &output,
        &Strategy::Rasterize(RasterizeOptions { dpi: 72, quality: 60 }),
    )
    .await
    .expect("rasterize run");

    assert_eq!(page_count(&output), 3);
    assert_eq!(report.strategy, "rasterize");
}

/// The per-run scratch directory must be gone afterwards, success or not.
#[tokio::test]
async fn rasterize_leaves_no_scratch_behind() {
    skip_unless_tool!("gs");
    let dir = scratch();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_fixture_pdf(&input);

    // Confine scratch dirs to a directory this test owns, so concurrent
    // processes writing to the system temp dir cannot disturb the check.
    let tmp_home = dir.path().join("tmp");
    std::fs::create_dir_all(&tmp_home).unwrap();
    let saved_tmpdir = std::env::var_os("TMPDIR");
    std::env::set_var("TMPDIR", &tmp_home);
    let result = compress(
        &input,
        &output,
        &Strategy::Rasterize(RasterizeOptions::default()),
    )
    .await;
    match saved_tmpdir {
        Some(v) => std::env::set_var("TMPDIR", v),
        None => std::env::remove_var("TMPDIR"),
    }
    result.expect("rasterize run");

    let leaked: Vec<PathBuf> = std::fs::read_dir(&tmp_home)
        .unwrap()
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(pdf_squeeze::compress::SCRATCH_PREFIX))
                .unwrap_or(false)
        })
        .collect();
    assert!(leaked.is_empty(), "leaked scratch entries: {leaked:?}");
}

// ── Error paths (always run, no tools needed) ───────────────────────────────

#[tokio::test]
async fn missing_input_is_reported_before_any_tool_runs() {
    let dir = scratch();
    let err = compress(
        &dir.path().join("no-such.pdf"),
        &dir.path().join("out.pdf"),
        &Strategy::Cleanup(CleanupOptions::default()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SqueezeError::InputNotFound { .. }));
}

#[tokio::test]
async fn out_of_range_dpi_is_rejected_without_touching_the_input() {
    let dir = scratch();
    let input = dir.path().join("in.pdf");
    write_fixture_pdf(&input);

    let err = compress(
        &input,
        &dir.path().join("out.pdf"),
        &Strategy::Rasterize(RasterizeOptions { dpi: 5, quality: 80 }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SqueezeError::InvalidConfig(_)));
    assert!(!dir.path().join("out.pdf").exists());
}
