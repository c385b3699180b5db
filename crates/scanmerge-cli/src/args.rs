// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.
//
// Every boolean option comes as a `--x` / `--no-x` pair so that a profile
// setting can be switched off explicitly; the later of the two wins.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use scanmerge_core::config::{Flag, MergeMode, PageNumberPosition, ProcessingOverrides};

const AFTER_HELP: &str = "\
EXAMPLES:
  Merge several scans:
    scanmerge a.pdf b.pdf c.pdf -o merged.pdf

  Rebuild a duplex scan (odd pages, then even pages scanned back to front):
    scanmerge odd.pdf even.pdf -o book.pdf --interleave --reverse-pdfs 1

  Clean up a single document:
    scanmerge scan.pdf -o clean.pdf --auto-deskew --enhance --optimize

  Start from a profile, but without OCR:
    scanmerge *.pdf -o archive.pdf --profile archive --no-ocr

PROFILES:
  Built-in: document, photo, ebook, archive, share, fast.
  --profile-file adds profiles or overrides keys of built-in ones.
";

/// Merge, interleave, and clean up scanned PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "scanmerge",
    version,
    about = "Merge, interleave, and clean up scanned PDF documents",
    after_long_help = AFTER_HELP
)]
pub struct Cli {
    /// Input PDF files, in order.
    #[arg(required_unless_present = "list_profiles")]
    pub inputs: Vec<PathBuf>,

    /// Output PDF file.
    #[arg(short, long, required_unless_present = "list_profiles")]
    pub output: Option<PathBuf>,

    // -- Merging --------------------------------------------------------------
    /// Interleave pages (one from each input in turn) instead of concatenating.
    #[arg(long, help_heading = "Merging")]
    pub interleave: bool,

    /// 0-based indices of inputs whose pages are taken back to front.
    #[arg(long, num_args = 1.., value_name = "INDEX", help_heading = "Merging")]
    pub reverse_pdfs: Vec<usize>,

    // -- Profiles -------------------------------------------------------------
    /// Start from a named profile; explicit options still win.
    #[arg(long, value_name = "NAME", help_heading = "Profiles")]
    pub profile: Option<String>,

    /// YAML, TOML, or JSON file with additional profiles.
    #[arg(long, value_name = "PATH", help_heading = "Profiles")]
    pub profile_file: Option<PathBuf>,

    /// List the available profiles and exit.
    #[arg(long, help_heading = "Profiles")]
    pub list_profiles: bool,

    // -- Blank pages ----------------------------------------------------------
    /// Remove blank pages.
    #[arg(long, overrides_with = "no_remove_blank", help_heading = "Blank pages")]
    pub remove_blank: bool,
    #[arg(long, overrides_with = "remove_blank", hide = true)]
    pub no_remove_blank: bool,

    /// Share of white pixels (0-1) at which a page counts as blank.
    #[arg(long, value_name = "RATIO", help_heading = "Blank pages")]
    pub blank_threshold: Option<f64>,

    // -- Deskew ---------------------------------------------------------------
    /// Reset page rotation.
    #[arg(long, overrides_with = "no_deskew", help_heading = "Deskew")]
    pub deskew: bool,
    #[arg(long, overrides_with = "deskew", hide = true)]
    pub no_deskew: bool,

    /// Detect and correct the skew of each page image.
    #[arg(long, overrides_with = "no_auto_deskew", help_heading = "Deskew")]
    pub auto_deskew: bool,
    #[arg(long, overrides_with = "auto_deskew", hide = true)]
    pub no_auto_deskew: bool,

    /// Smallest angle in degrees that auto deskew corrects.
    #[arg(long, value_name = "DEGREES", help_heading = "Deskew")]
    pub deskew_threshold: Option<f64>,

    // -- Image quality --------------------------------------------------------
    /// Raise contrast and brightness.
    #[arg(long, overrides_with = "no_enhance", help_heading = "Image quality")]
    pub enhance: bool,
    #[arg(long, overrides_with = "enhance", hide = true)]
    pub no_enhance: bool,

    /// Smooth out scanner noise.
    #[arg(long, overrides_with = "no_denoise", help_heading = "Image quality")]
    pub denoise: bool,
    #[arg(long, overrides_with = "denoise", hide = true)]
    pub no_denoise: bool,

    /// Convert pages to pure black and white.
    #[arg(long, overrides_with = "no_binarize", help_heading = "Image quality")]
    pub binarize: bool,
    #[arg(long, overrides_with = "binarize", hide = true)]
    pub no_binarize: bool,

    /// Sharpen page images.
    #[arg(long, overrides_with = "no_sharpen", help_heading = "Image quality")]
    pub sharpen: bool,
    #[arg(long, overrides_with = "sharpen", hide = true)]
    pub no_sharpen: bool,

    /// Remove isolated specks.
    #[arg(long, overrides_with = "no_despeckle", help_heading = "Image quality")]
    pub despeckle: bool,
    #[arg(long, overrides_with = "despeckle", hide = true)]
    pub no_despeckle: bool,

    /// Crop white borders.
    #[arg(long, overrides_with = "no_autocrop", help_heading = "Image quality")]
    pub autocrop: bool,
    #[arg(long, overrides_with = "autocrop", hide = true)]
    pub no_autocrop: bool,

    /// Downscale page images above this resolution.
    #[arg(long, value_name = "DPI", help_heading = "Image quality")]
    pub max_dpi: Option<u32>,

    // -- Lossy re-encoding ----------------------------------------------------
    /// Re-encode every page image as JPEG (smaller, loses fidelity).
    #[arg(long, overrides_with = "no_lossy", help_heading = "Size")]
    pub lossy: bool,
    #[arg(long, overrides_with = "lossy", hide = true)]
    pub no_lossy: bool,

    /// Target resolution for lossy re-encoding.
    #[arg(long, value_name = "DPI", help_heading = "Size")]
    pub lossy_dpi: Option<u32>,

    /// JPEG quality, 1-95.
    #[arg(long, value_name = "QUALITY", help_heading = "Size")]
    pub lossy_quality: Option<u8>,

    /// Optimise and compress the PDF structure.
    #[arg(long, overrides_with = "no_optimize", help_heading = "Size")]
    pub optimize: bool,
    #[arg(long, overrides_with = "optimize", hide = true)]
    pub no_optimize: bool,

    /// Compression level, 0 (fastest) to 9 (smallest).
    #[arg(long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=9), help_heading = "Size")]
    pub compress_level: Option<u8>,

    // -- OCR ------------------------------------------------------------------
    /// Add an invisible, searchable text layer.
    #[arg(long, overrides_with = "no_ocr", help_heading = "OCR")]
    pub ocr: bool,
    #[arg(long, overrides_with = "ocr", hide = true)]
    pub no_ocr: bool,

    /// Document language (e.g. spa, eng).
    #[arg(long, value_name = "LANG", help_heading = "OCR")]
    pub ocr_lang: Option<String>,

    /// Directory holding the text detection and recognition models
    /// (default: $SCANMERGE_OCR_MODELS, then the ocrs cache).
    #[arg(long, value_name = "DIR", help_heading = "OCR")]
    pub ocr_models: Option<PathBuf>,

    // -- Watermark ------------------------------------------------------------
    /// Watermark text drawn across every page.
    #[arg(long, value_name = "TEXT", help_heading = "Watermark")]
    pub watermark: Option<String>,

    /// Watermark opacity, 0-1.
    #[arg(long, value_name = "OPACITY", help_heading = "Watermark")]
    pub watermark_opacity: Option<f32>,

    /// Watermark font size in points.
    #[arg(long, value_name = "SIZE", help_heading = "Watermark")]
    pub watermark_size: Option<f32>,

    /// Watermark rotation in degrees, counter-clockwise.
    #[arg(long, value_name = "DEGREES", allow_negative_numbers = true, help_heading = "Watermark")]
    pub watermark_rotation: Option<f32>,

    // -- Page numbers ---------------------------------------------------------
    /// Number the pages.
    #[arg(long, overrides_with = "no_page_numbers", help_heading = "Page numbers")]
    pub page_numbers: bool,
    #[arg(long, overrides_with = "page_numbers", hide = true)]
    pub no_page_numbers: bool,

    /// bottom-center, bottom-right, bottom-left, top-center, top-right, or top-left.
    #[arg(long, value_name = "POSITION", help_heading = "Page numbers")]
    pub page_number_position: Option<PageNumberPosition>,

    /// Page number font size in points.
    #[arg(long, value_name = "SIZE", help_heading = "Page numbers")]
    pub page_number_size: Option<f32>,

    /// Distance from the page edge in points.
    #[arg(long, value_name = "POINTS", help_heading = "Page numbers")]
    pub page_number_margin: Option<f32>,

    // -- Metadata -------------------------------------------------------------
    /// Document title.
    #[arg(long, help_heading = "Metadata")]
    pub title: Option<String>,

    /// Document author.
    #[arg(long, help_heading = "Metadata")]
    pub author: Option<String>,

    /// Document subject.
    #[arg(long, help_heading = "Metadata")]
    pub subject: Option<String>,

    /// Document keywords.
    #[arg(long, help_heading = "Metadata")]
    pub keywords: Option<String>,

    // -- Output ---------------------------------------------------------------
    /// Directory for intermediate files (default: system temp dir).
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn merge_mode(&self) -> MergeMode {
        if self.interleave {
            MergeMode::Interleave
        } else {
            MergeMode::Concatenate
        }
    }

    /// The options given on the command line, as the top override layer.
    pub fn overrides(&self) -> ProcessingOverrides {
        ProcessingOverrides {
            remove_blank: Flag::from_switches(self.remove_blank, self.no_remove_blank),
            blank_threshold: self.blank_threshold,

            auto_deskew: Flag::from_switches(self.auto_deskew, self.no_auto_deskew),
            deskew: Flag::from_switches(self.deskew, self.no_deskew),
            deskew_threshold: self.deskew_threshold,

            enhance: Flag::from_switches(self.enhance, self.no_enhance),
            denoise: Flag::from_switches(self.denoise, self.no_denoise),
            binarize: Flag::from_switches(self.binarize, self.no_binarize),
            sharpen: Flag::from_switches(self.sharpen, self.no_sharpen),
            despeckle: Flag::from_switches(self.despeckle, self.no_despeckle),
            autocrop: Flag::from_switches(self.autocrop, self.no_autocrop),
            max_dpi: self.max_dpi,

            lossy: Flag::from_switches(self.lossy, self.no_lossy),
            lossy_dpi: self.lossy_dpi,
            lossy_quality: self.lossy_quality,

            ocr: Flag::from_switches(self.ocr, self.no_ocr),
            ocr_lang: self.ocr_lang.clone(),

            optimize: Flag::from_switches(self.optimize, self.no_optimize),
            compress_level: self.compress_level,

            watermark: self.watermark.clone(),
            watermark_opacity: self.watermark_opacity,
            watermark_size: self.watermark_size,
            watermark_rotation: self.watermark_rotation,

            page_numbers: Flag::from_switches(self.page_numbers, self.no_page_numbers),
            page_number_position: self.page_number_position,
            page_number_size: self.page_number_size,
            page_number_margin: self.page_number_margin,

            title: self.title.clone(),
            author: self.author.clone(),
            subject: self.subject.clone(),
            keywords: self.keywords.clone(),

            verbose: if self.quiet {
                Flag::Off
            } else if self.verbose > 0 {
                Flag::On
            } else {
                Flag::Unset
            },
        }
    }

    /// Default tracing filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}
