//! Reassembly of rasterised page images into one multi-page PDF.
//!
//! ## Why spawn_blocking?
//!
//! Image decoding and PDF serialisation are CPU-bound; running them on the
//! blocking pool keeps the async workers free, the same treatment the
//! subprocess output capture gets elsewhere in the pipeline.
//!
//! ## No partial documents
//!
//! The document is written to a sibling temp path and renamed into place
//! only after a successful finalise. Any decode or write failure removes the
//! temp file and leaves the target path untouched.

use crate::error::SqueezeError;
use image::GenericImageView;
use printpdf::{
    ColorBits, ColorSpace, Image, ImageFilter, ImageTransform, ImageXObject, Mm, PdfDocument, Px,
};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MM_PER_INCH: f32 = 25.4;

/// Build a multi-page PDF at `output` from `images`, one page per image in
/// slice order, stamped with `dpi` as both horizontal and vertical
/// resolution.
///
/// The caller guarantees `images` is ordered (lexicographic file names) and
/// non-empty; an empty slice is still rejected here rather than producing a
/// zero-page document.
pub async fn assemble_pdf(
    images: Vec<PathBuf>,
    output: &Path,
    dpi: u32,
) -> Result<(), SqueezeError> {
    let output = output.to_path_buf();
    tokio::task::spawn_blocking(move || assemble_blocking(&images, &output, dpi))
        .await
        .map_err(|e| SqueezeError::Internal(format!("assembly task panicked: {e}")))?
}

fn assemble_blocking(images: &[PathBuf], output: &Path, dpi: u32) -> Result<(), SqueezeError> {
    if images.is_empty() {
        return Err(SqueezeError::AssemblyFailed {
            detail: "no page images to assemble".into(),
        });
    }
    info!("assembling {} pages at {dpi} dpi", images.len());

    let first = decode_page(&images[0])?;
    let (w_mm, h_mm) = page_size_mm(first.width, first.height, dpi);
    let (doc, page_idx, layer_idx) = PdfDocument::new("pdf-squeeze", Mm(w_mm), Mm(h_mm), "page");
    place_page(doc.get_page(page_idx).get_layer(layer_idx), first, dpi);
    debug!("page 1 <- {}", images[0].display());

    for (index, path) in images.iter().enumerate().skip(1) {
        let page = decode_page(path)?;
        let (w_mm, h_mm) = page_size_mm(page.width, page.height, dpi);
        let (page_idx, layer_idx) = doc.add_page(Mm(w_mm), Mm(h_mm), "page");
        place_page(doc.get_page(page_idx).get_layer(layer_idx), page, dpi);
        debug!("page {} <- {}", index + 1, path.display());
    }

    // Temp-then-rename keeps a half-written document from ever appearing at
    // the target path.
    let tmp_path = output.with_extension("pdf.tmp");
    let write_result = write_document(doc, &tmp_path);
    if let Err(e) = write_result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, output).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        SqueezeError::OutputWriteFailed {
            path: output.to_path_buf(),
            source: e,
        }
    })?;

    Ok(())
}

fn write_document(doc: printpdf::PdfDocumentReference, path: &Path) -> Result<(), SqueezeError> {
    let file = std::fs::File::create(path).map_err(|e| SqueezeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| SqueezeError::AssemblyFailed {
            detail: format!("finalising document: {e}"),
        })
}

fn place_page(layer: printpdf::PdfLayerReference, page: DecodedPage, dpi: u32) {
    let xobject = ImageXObject {
        width: Px(page.width as usize),
        height: Px(page.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: page.jpeg_bytes,
        image_filter: Some(ImageFilter::DCT),
        clipping_bbox: None,
        smask: None,
    };
    Image::from(xobject).add_to_layer(
        layer,
        ImageTransform {
            dpi: Some(dpi as f32),
            ..Default::default()
        },
    );
}

struct DecodedPage {
    width: u32,
    height: u32,
    /// JPEG-encoded RGB pixel data, embedded as-is with a DCT filter.
    jpeg_bytes: Vec<u8>,
}

/// Decode one page image, keeping the original JPEG bytes when they are
/// already 8-bit RGB and re-encoding anything else.
fn decode_page(path: &Path) -> Result<DecodedPage, SqueezeError> {
    let decoded = image::open(path).map_err(|e| SqueezeError::AssemblyFailed {
        detail: format!("decoding '{}': {e}", path.display()),
    })?;
    let (width, height) = decoded.dimensions();

    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false);

    let jpeg_bytes = if is_jpeg && decoded.color() == image::ColorType::Rgb8 {
        std::fs::read(path).map_err(|e| SqueezeError::AssemblyFailed {
            detail: format!("reading '{}': {e}", path.display()),
        })?
    } else {
        let rgb = decoded.to_rgb8();
        let mut buf = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 90);
        encoder
            .encode(
                rgb.as_raw(),
                width,
                height,
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| SqueezeError::AssemblyFailed {
                detail: format!("re-encoding '{}': {e}", path.display()),
            })?;
        buf
    };

    Ok(DecodedPage {
        width,
        height,
        jpeg_bytes,
    })
}

fn page_size_mm(width_px: u32, height_px: u32, dpi: u32) -> (f32, f32) {
    let dpi = dpi.max(1) as f32;
    (
        width_px as f32 / dpi * MM_PER_INCH,
        height_px as f32 / dpi * MM_PER_INCH,
    )
}
