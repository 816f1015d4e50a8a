//! CLI binary for pdf-squeeze.
//!
//! A thin shim over the library crate: maps subcommand flags to a
//! `Strategy`, runs one compression, and prints the report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_squeeze::{
    compress, CleanupOptions, LossyOptions, LossyPreset, RasterizeOptions, Strategy,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Lossless cleanup, maximum stream compression
  pdfsqueeze cleanup report.pdf -o report-small.pdf --level 9 --object-streams

  # Lossy recompression with the balanced preset
  pdfsqueeze lossy scan.pdf -o scan-small.pdf

  # Aggressive fixed-quality tier (smallest output with selectable text)
  pdfsqueeze lossy scan.pdf -o scan-tiny.pdf --preset aggressive

  # Custom resolution and JPEG quality
  pdfsqueeze lossy scan.pdf -o scan-small.pdf --preset custom --dpi 120 --quality 50

  # Rasterise every page (text becomes pixels)
  pdfsqueeze rasterize slides.pdf -o slides-flat.pdf --dpi 150 --quality 75

STRATEGIES:
  cleanup    lossless — restructure storage via qpdf, pixels untouched
  lossy      down-sample embedded images via Ghostscript, text stays selectable
  rasterize  flatten each page to a JPEG and rebuild — smallest, text not selectable

ENVIRONMENT VARIABLES:
  PDFSQUEEZE_TOOL_DIR  Directory holding bundled tools (qpdf/bin/qpdf, gs/bin/gs).
                       Defaults to tools/ next to the executable; $PATH is the fallback.
"#;

/// Shrink PDF files via qpdf and Ghostscript.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsqueeze",
    version,
    about = "Shrink PDF files via qpdf and Ghostscript",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    strategy: StrategyCmd,

    /// Print the run report as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum StrategyCmd {
    /// Lossless cleanup: restructure storage without touching pixels.
    Cleanup {
        /// Input PDF file.
        input: PathBuf,
        /// Output PDF file.
        #[arg(short, long)]
        output: PathBuf,
        /// Stream compression level (1-9).
        #[arg(long, default_value_t = 9, value_parser = clap::value_parser!(u8).range(1..=9))]
        level: u8,
        /// Pack objects into object streams.
        #[arg(long)]
        object_streams: bool,
        /// Decompress and recompress every flate stream.
        #[arg(long)]
        recompress: bool,
        /// Re-encode images where losslessly possible.
        #[arg(long)]
        optimize_images: bool,
    },
    /// Lossy recompression: down-sample embedded images, keep text selectable.
    Lossy {
        /// Input PDF file.
        input: PathBuf,
        /// Output PDF file.
        #[arg(short, long)]
        output: PathBuf,
        /// Preset: aggressive (fixed tier), balanced, or custom.
        #[arg(long, value_enum, default_value = "balanced")]
        preset: PresetArg,
        /// Target image resolution (ignored by --preset aggressive).
        #[arg(long)]
        dpi: Option<u32>,
        /// JPEG quality 0-100 (ignored by --preset aggressive).
        #[arg(long)]
        quality: Option<u8>,
    },
    /// Rasterise every page to a JPEG and rebuild the document.
    Rasterize {
        /// Input PDF file.
        input: PathBuf,
        /// Output PDF file.
        #[arg(short, long)]
        output: PathBuf,
        /// Render resolution.
        #[arg(long, default_value_t = 150)]
        dpi: u32,
        /// JPEG quality 0-100.
        #[arg(long, default_value_t = 80)]
        quality: u8,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PresetArg {
    Aggressive,
    Balanced,
    Custom,
}

impl From<PresetArg> for LossyPreset {
    fn from(v: PresetArg) -> Self {
        match v {
            PresetArg::Aggressive => LossyPreset::Aggressive,
            PresetArg::Balanced => LossyPreset::Balanced,
            PresetArg::Custom => LossyPreset::Custom,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let (input, output, strategy) = build_strategy(&cli.strategy);

    // A spinner, not a bar: the external tool gives no progress feedback.
    let spinner = if !cli.quiet && !cli.json {
        let s = ProgressBar::new_spinner();
        s.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        s.set_prefix("Compressing");
        s.set_message(input.display().to_string());
        s.enable_steady_tick(Duration::from_millis(80));
        Some(s)
    } else {
        None
    };

    let result = compress(&input, &output, &strategy).await;
    if let Some(s) = &spinner {
        s.finish_and_clear();
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {e}", red("✗"));
            if let Some(hint) = e.hint() {
                eprintln!("  {}", dim(hint));
            }
            std::process::exit(1);
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialise report")?
        );
    } else if !cli.quiet {
        println!(
            "{} {}  {} → {}  ({})",
            green("✔"),
            bold(&output.display().to_string()),
            human_bytes(report.input_bytes),
            human_bytes(report.output_bytes),
            savings_label(&report),
        );
        eprintln!(
            "   {}  {}ms",
            dim(report.strategy.as_str()),
            report.duration_ms
        );
    }

    Ok(())
}

/// Map the parsed subcommand to library types.
fn build_strategy(cmd: &StrategyCmd) -> (PathBuf, PathBuf, Strategy) {
    match cmd {
        StrategyCmd::Cleanup {
            input,
            output,
            level,
            object_streams,
            recompress,
            optimize_images,
        } => (
            input.clone(),
            output.clone(),
            Strategy::Cleanup(CleanupOptions {
                compression_level: *level,
                object_streams: *object_streams,
                recompress_flate: *recompress,
                optimize_images: *optimize_images,
            }),
        ),
        StrategyCmd::Lossy {
            input,
            output,
            preset,
            dpi,
            quality,
        } => {
            let mut opts = LossyOptions::for_preset((*preset).into());
            if let Some(dpi) = dpi {
                opts.dpi = *dpi;
            }
            if let Some(quality) = quality {
                opts.quality = *quality;
            }
            (input.clone(), output.clone(), Strategy::Lossy(opts))
        }
        StrategyCmd::Rasterize {
            input,
            output,
            dpi,
            quality,
        } => (
            input.clone(),
            output.clone(),
            Strategy::Rasterize(RasterizeOptions {
                dpi: *dpi,
                quality: *quality,
            }),
        ),
    }
}

fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn savings_label(report: &pdf_squeeze::CompressionReport) -> String {
    let pct = report.savings_percent();
    if pct >= 0.0 {
        format!("-{pct:.1}%")
    } else {
        format!("+{:.1}%", -pct)
    }
}
