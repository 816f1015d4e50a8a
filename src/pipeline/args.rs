//! Command construction: pure translation of strategy options into an
//! ordered argument list plus an environment overlay.
//!
//! Flag names are reproduced verbatim from the qpdf and Ghostscript
//! command-line surfaces — both tools are picky about exact spellings, and
//! the tests below pin the contract. Nothing in this module touches the
//! filesystem or the environment; that separation is what makes the builder
//! trivially testable.

use crate::config::{CleanupOptions, LossyOptions, RasterizeOptions};
use crate::pipeline::locate::ResourceBundle;
use std::collections::BTreeMap;
use std::path::Path;

/// Library-search variable consumed by Ghostscript.
const ENV_GS_LIB: &str = "GS_LIB";
/// Font-path variable consumed by Ghostscript.
const ENV_GS_FONTPATH: &str = "GS_FONTPATH";

/// Very low mono resolutions destroy text legibility, so the mono channel
/// never drops below this regardless of the requested DPI.
const MONO_MIN_DPI: u32 = 300;

/// File-name pattern for rasterised pages. Six digits keeps lexicographic
/// order equal to page order well past any realistic page count.
pub const PAGE_IMAGE_PATTERN: &str = "page-%06d.jpg";

/// One planned tool invocation: ordered arguments plus the environment
/// variables to overlay on the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl CommandPlan {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    fn arg(&mut self, a: impl Into<String>) -> &mut Self {
        self.args.push(a.into());
        self
    }
}

/// qpdf invocation for the lossless cleanup strategy.
///
/// Flags first, then the `--` end-of-options marker, then input and output
/// as the two positional arguments.
pub fn cleanup_plan(opts: &CleanupOptions, input: &Path, output: &Path) -> CommandPlan {
    let mut plan = CommandPlan::new();
    plan.arg("--compress-streams=y")
        .arg(format!("--compression-level={}", opts.compression_level));
    if opts.object_streams {
        plan.arg("--object-streams=generate");
    }
    if opts.recompress_flate {
        plan.arg("--recompress-flate");
    }
    if opts.optimize_images {
        plan.arg("--optimize-images");
    }
    plan.arg("--")
        .arg(input.display().to_string())
        .arg(output.display().to_string());
    plan
}

/// Ghostscript `pdfwrite` invocation for the lossy recompression strategy.
pub fn lossy_plan(
    opts: &LossyOptions,
    bundle: Option<&ResourceBundle>,
    input: &Path,
    output: &Path,
) -> CommandPlan {
    let mut plan = gs_base(bundle);
    plan.arg("-sDEVICE=pdfwrite")
        .arg("-dCompatibilityLevel=1.4")
        .arg(format!("-sOutputFile={}", output.display()))
        .arg("-dDetectDuplicateImages=true")
        .arg("-dCompressFonts=true")
        .arg("-dSubsetFonts=true")
        .arg("-dAutoRotatePages=/None");

    match opts.preset.tier_token() {
        // Fixed quality tier: the tool's own tier replaces every explicit
        // down-sampling flag, and the numeric fields are ignored.
        Some(tier) => {
            plan.arg(format!("-dPDFSETTINGS={tier}"));
        }
        None => {
            plan.arg("-dDownsampleColorImages=true")
                .arg(format!("-dColorImageResolution={}", opts.dpi))
                .arg("-dColorImageDownsampleType=/Bicubic")
                .arg("-dAutoFilterColorImages=false")
                .arg("-dColorImageFilter=/DCTEncode")
                .arg("-dDownsampleGrayImages=true")
                .arg(format!("-dGrayImageResolution={}", opts.dpi))
                .arg("-dGrayImageDownsampleType=/Bicubic")
                .arg("-dAutoFilterGrayImages=false")
                .arg("-dGrayImageFilter=/DCTEncode")
                .arg("-dDownsampleMonoImages=true")
                .arg(format!(
                    "-dMonoImageResolution={}",
                    opts.dpi.max(MONO_MIN_DPI)
                ))
                .arg("-dMonoImageDownsampleType=/Subsample")
                .arg(format!("-dJPEGQ={}", opts.quality));
        }
    }

    plan.arg(input.display().to_string());
    plan
}

/// Ghostscript `jpeg` invocation for the rasterize strategy, writing one
/// image per page into `scratch_dir`.
pub fn rasterize_plan(
    opts: &RasterizeOptions,
    bundle: Option<&ResourceBundle>,
    input: &Path,
    scratch_dir: &Path,
) -> CommandPlan {
    let mut plan = gs_base(bundle);
    plan.arg("-sDEVICE=jpeg")
        .arg(format!("-dJPEGQ={}", opts.quality))
        .arg(format!("-r{}", opts.dpi))
        .arg(format!(
            "-sOutputFile={}",
            scratch_dir.join(PAGE_IMAGE_PATTERN).display()
        ))
        .arg(input.display().to_string());
    plan
}

/// Safety/batch flags shared by every Ghostscript invocation, with bundle
/// include/font flags prepended and the environment overlay populated when
/// a resource bundle is available.
fn gs_base(bundle: Option<&ResourceBundle>) -> CommandPlan {
    let mut plan = CommandPlan::new();

    if let Some(bundle) = bundle {
        for include in &bundle.include_paths {
            plan.arg(format!("-I{}", include.display()));
        }
        if let Some(font) = &bundle.font_path {
            plan.arg(format!("-sFONTPATH={}", font.display()));
            plan.env
                .insert(ENV_GS_FONTPATH.into(), font.display().to_string());
        }
        let joined = std::env::join_paths(&bundle.lib_paths)
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        plan.env.insert(ENV_GS_LIB.into(), joined);
    }

    plan.arg("-dSAFER")
        .arg("-dBATCH")
        .arg("-dNOPAUSE")
        .arg("-dQUIET");
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LossyPreset;
    use std::path::PathBuf;

    fn input() -> PathBuf {
        PathBuf::from("/docs/in.pdf")
    }

    fn output() -> PathBuf {
        PathBuf::from("/docs/out.pdf")
    }

    fn bundle() -> ResourceBundle {
        ResourceBundle {
            lib_paths: vec![PathBuf::from("/res/10.1"), PathBuf::from("/res/10.1/lib")],
            include_paths: vec![PathBuf::from("/res/10.1"), PathBuf::from("/res/10.1/Init")],
            font_path: Some(PathBuf::from("/res/10.1/Font")),
        }
    }

    fn count_with_prefix(args: &[String], prefix: &str) -> usize {
        args.iter().filter(|a| a.starts_with(prefix)).count()
    }

    // ── cleanup ──────────────────────────────────────────────────────────

    #[test]
    fn cleanup_has_exactly_one_compression_level_flag() {
        let mut opts = CleanupOptions::default();
        opts.compression_level = 7;
        let plan = cleanup_plan(&opts, &input(), &output());

        assert_eq!(count_with_prefix(&plan.args, "--compression-level="), 1);
        assert!(plan.args.contains(&"--compression-level=7".to_string()));
        assert!(plan.args.contains(&"--compress-streams=y".to_string()));
    }

    #[test]
    fn cleanup_object_streams_flag_tracks_option() {
        let mut opts = CleanupOptions::default();
        opts.object_streams = false;
        let plan = cleanup_plan(&opts, &input(), &output());
        assert_eq!(count_with_prefix(&plan.args, "--object-streams"), 0);

        opts.object_streams = true;
        let plan = cleanup_plan(&opts, &input(), &output());
        assert!(plan.args.contains(&"--object-streams=generate".to_string()));
    }

    #[test]
    fn cleanup_positionals_follow_end_of_options_marker() {
        let plan = cleanup_plan(&CleanupOptions::default(), &input(), &output());
        let tail: Vec<&str> = plan.args.iter().rev().take(3).map(String::as_str).collect();
        assert_eq!(tail, vec!["/docs/out.pdf", "/docs/in.pdf", "--"]);
        assert!(plan.env.is_empty());
    }

    #[test]
    fn cleanup_optional_flags_all_on() {
        let opts = CleanupOptions {
            compression_level: 9,
            object_streams: true,
            recompress_flate: true,
            optimize_images: true,
        };
        let plan = cleanup_plan(&opts, &input(), &output());
        assert!(plan.args.contains(&"--recompress-flate".to_string()));
        assert!(plan.args.contains(&"--optimize-images".to_string()));
    }

    // ── lossy ────────────────────────────────────────────────────────────

    #[test]
    fn aggressive_preset_uses_tier_and_no_downsampling() {
        let opts = LossyOptions {
            preset: LossyPreset::Aggressive,
            // Numeric fields must be ignored for the fixed tier.
            dpi: 400,
            quality: 95,
        };
        let plan = lossy_plan(&opts, None, &input(), &output());

        assert!(plan.args.contains(&"-dPDFSETTINGS=/screen".to_string()));
        assert_eq!(count_with_prefix(&plan.args, "-dDownsample"), 0);
        assert_eq!(count_with_prefix(&plan.args, "-dColorImageResolution"), 0);
        assert_eq!(count_with_prefix(&plan.args, "-dJPEGQ"), 0);
    }

    #[test]
    fn custom_preset_emits_per_channel_flags() {
        let opts = LossyOptions {
            preset: LossyPreset::Custom,
            dpi: 150,
            quality: 55,
        };
        let plan = lossy_plan(&opts, None, &input(), &output());

        assert!(plan.args.contains(&"-dColorImageResolution=150".to_string()));
        assert!(plan.args.contains(&"-dGrayImageResolution=150".to_string()));
        assert!(plan
            .args
            .contains(&"-dColorImageDownsampleType=/Bicubic".to_string()));
        assert!(plan
            .args
            .contains(&"-dMonoImageDownsampleType=/Subsample".to_string()));
        assert!(plan.args.contains(&"-dJPEGQ=55".to_string()));
        assert_eq!(count_with_prefix(&plan.args, "-dPDFSETTINGS"), 0);
    }

    #[test]
    fn mono_resolution_is_floored_at_300() {
        let mut opts = LossyOptions::for_preset(LossyPreset::Custom);
        opts.dpi = 150;
        let plan = lossy_plan(&opts, None, &input(), &output());
        assert!(plan.args.contains(&"-dMonoImageResolution=300".to_string()));

        opts.dpi = 350;
        let plan = lossy_plan(&opts, None, &input(), &output());
        assert!(plan.args.contains(&"-dMonoImageResolution=350".to_string()));
    }

    #[test]
    fn lossy_input_is_final_argument() {
        let plan = lossy_plan(&LossyOptions::default(), None, &input(), &output());
        assert_eq!(plan.args.last().unwrap(), "/docs/in.pdf");
        assert!(plan
            .args
            .contains(&"-sOutputFile=/docs/out.pdf".to_string()));
    }

    #[test]
    fn lossy_always_carries_safety_and_device_flags() {
        for preset in [LossyPreset::Aggressive, LossyPreset::Balanced] {
            let plan = lossy_plan(
                &LossyOptions::for_preset(preset),
                None,
                &input(),
                &output(),
            );
            for flag in [
                "-dSAFER",
                "-dBATCH",
                "-dNOPAUSE",
                "-dQUIET",
                "-sDEVICE=pdfwrite",
                "-dCompatibilityLevel=1.4",
                "-dDetectDuplicateImages=true",
                "-dCompressFonts=true",
                "-dSubsetFonts=true",
                "-dAutoRotatePages=/None",
            ] {
                assert!(plan.args.contains(&flag.to_string()), "missing {flag}");
            }
        }
    }

    // ── environment overlay ──────────────────────────────────────────────

    #[test]
    fn bundle_sets_lib_and_font_env() {
        let plan = lossy_plan(&LossyOptions::default(), Some(&bundle()), &input(), &output());

        let gs_lib = plan.env.get(ENV_GS_LIB).expect("GS_LIB must be set");
        assert!(gs_lib.contains("/res/10.1"));
        assert_eq!(
            plan.env.get(ENV_GS_FONTPATH).map(String::as_str),
            Some("/res/10.1/Font")
        );
        assert!(plan.args.contains(&"-I/res/10.1".to_string()));
        assert!(plan.args.contains(&"-sFONTPATH=/res/10.1/Font".to_string()));
    }

    #[test]
    fn no_bundle_means_empty_overlay() {
        let plan = lossy_plan(&LossyOptions::default(), None, &input(), &output());
        assert!(plan.env.is_empty());
        assert_eq!(count_with_prefix(&plan.args, "-I"), 0);
        assert_eq!(count_with_prefix(&plan.args, "-sFONTPATH"), 0);
    }

    #[test]
    fn bundle_without_font_sets_only_gs_lib() {
        let mut b = bundle();
        b.font_path = None;
        let plan = lossy_plan(&LossyOptions::default(), Some(&b), &input(), &output());
        assert!(plan.env.contains_key(ENV_GS_LIB));
        assert!(!plan.env.contains_key(ENV_GS_FONTPATH));
    }

    // ── rasterize ────────────────────────────────────────────────────────

    #[test]
    fn rasterize_targets_the_jpeg_device() {
        let opts = RasterizeOptions {
            dpi: 150,
            quality: 80,
        };
        let plan = rasterize_plan(&opts, None, &input(), Path::new("/tmp/scratch"));

        assert!(plan.args.contains(&"-sDEVICE=jpeg".to_string()));
        assert!(plan.args.contains(&"-dJPEGQ=80".to_string()));
        assert!(plan.args.contains(&"-r150".to_string()));
        assert!(plan
            .args
            .contains(&"-sOutputFile=/tmp/scratch/page-%06d.jpg".to_string()));
        assert_eq!(plan.args.last().unwrap(), "/docs/in.pdf");
    }

    #[test]
    fn rasterize_prepends_bundle_flags_like_lossy() {
        let plan = rasterize_plan(
            &RasterizeOptions::default(),
            Some(&bundle()),
            &input(),
            Path::new("/tmp/scratch"),
        );
        assert!(plan.args.contains(&"-I/res/10.1/Init".to_string()));
        assert!(plan.env.contains_key(ENV_GS_LIB));
    }
}
