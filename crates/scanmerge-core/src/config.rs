// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Processing configuration.
//
// `ProcessingConfig` is the resolved, immutable option record the pipeline
// reads. Front ends never build it field by field: they stack
// `ProcessingOverrides` layers (command line over profile) and resolve the
// result, so an option explicitly set to its default value still beats a
// lower layer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanmergeError};
use crate::types::StageKind;

// -- Option values ------------------------------------------------------------

/// A boolean option that remembers whether anyone set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Flag {
    #[default]
    Unset,
    Off,
    On,
}

impl Flag {
    /// Build from a `--x` / `--no-x` switch pair. `off` wins if both are given.
    pub fn from_switches(on: bool, off: bool) -> Self {
        match (on, off) {
            (_, true) => Flag::Off,
            (true, false) => Flag::On,
            (false, false) => Flag::Unset,
        }
    }

    pub fn is_set(self) -> bool {
        self != Flag::Unset
    }

    /// This value, or `lower` when this one is unset.
    pub fn or(self, lower: Flag) -> Flag {
        if self.is_set() { self } else { lower }
    }

    pub fn resolve(self, default: bool) -> bool {
        match self {
            Flag::Unset => default,
            Flag::Off => false,
            Flag::On => true,
        }
    }
}

impl From<Option<bool>> for Flag {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Flag::Unset,
            Some(false) => Flag::Off,
            Some(true) => Flag::On,
        }
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        Some(value).into()
    }
}

impl From<Flag> for Option<bool> {
    fn from(flag: Flag) -> Self {
        match flag {
            Flag::Unset => None,
            Flag::Off => Some(false),
            Flag::On => Some(true),
        }
    }
}

/// How multiple inputs are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Each input's pages in turn.
    #[default]
    Concatenate,
    /// Round-robin one page from each input.
    Interleave,
}

/// Where page numbers are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageNumberPosition {
    #[default]
    BottomCenter,
    BottomRight,
    BottomLeft,
    TopCenter,
    TopRight,
    TopLeft,
}

impl PageNumberPosition {
    pub const ALL: [PageNumberPosition; 6] = [
        PageNumberPosition::BottomCenter,
        PageNumberPosition::BottomRight,
        PageNumberPosition::BottomLeft,
        PageNumberPosition::TopCenter,
        PageNumberPosition::TopRight,
        PageNumberPosition::TopLeft,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PageNumberPosition::BottomCenter => "bottom-center",
            PageNumberPosition::BottomRight => "bottom-right",
            PageNumberPosition::BottomLeft => "bottom-left",
            PageNumberPosition::TopCenter => "top-center",
            PageNumberPosition::TopRight => "top-right",
            PageNumberPosition::TopLeft => "top-left",
        }
    }

    pub fn is_top(self) -> bool {
        matches!(
            self,
            PageNumberPosition::TopCenter | PageNumberPosition::TopRight | PageNumberPosition::TopLeft
        )
    }
}

impl std::fmt::Display for PageNumberPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageNumberPosition {
    type Err = ScanmergeError;

    fn from_str(s: &str) -> Result<Self> {
        PageNumberPosition::ALL
            .into_iter()
            .find(|position| position.as_str() == s)
            .ok_or_else(|| {
                ScanmergeError::Config(format!(
                    "unknown page number position '{s}' (expected one of: {})",
                    PageNumberPosition::ALL.map(PageNumberPosition::as_str).join(", ")
                ))
            })
    }
}

// -- Resolved configuration ---------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlankPageOptions {
    pub enabled: bool,
    /// Share of near-white pixels (0..=1) at which a page counts as blank.
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeskewOptions {
    /// Detect and correct the skew angle of each page image.
    pub auto: bool,
    /// Reset page rotation only. Ignored when `auto` is set.
    pub basic: bool,
    /// Smallest angle (degrees) auto deskew bothers to correct.
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFilterOptions {
    pub enhance: bool,
    pub denoise: bool,
    pub binarize: bool,
    pub sharpen: bool,
    pub despeckle: bool,
    pub autocrop: bool,
    pub max_dpi: Option<u32>,
}

impl ImageFilterOptions {
    pub fn any_enabled(&self) -> bool {
        self.enhance
            || self.denoise
            || self.binarize
            || self.sharpen
            || self.despeckle
            || self.autocrop
            || self.max_dpi.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossyOptions {
    pub enabled: bool,
    pub dpi: u32,
    /// JPEG quality, always within 1..=95.
    pub quality: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOptions {
    pub enabled: bool,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeOptions {
    pub enabled: bool,
    /// 0 (fastest) to 9 (smallest).
    pub compress_level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkOptions {
    /// Watermark text; the stage runs only when this is set.
    pub text: Option<String>,
    pub opacity: f32,
    pub font_size: f32,
    /// Counter-clockwise rotation in degrees.
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNumberOptions {
    pub enabled: bool,
    pub position: PageNumberPosition,
    pub font_size: f32,
    /// Distance from the page edge in points.
    pub margin: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataOptions {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
}

impl MetadataOptions {
    pub fn any_set(&self) -> bool {
        self.title.is_some() || self.author.is_some() || self.subject.is_some() || self.keywords.is_some()
    }
}

/// Immutable option record consumed by the stage runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub blank: BlankPageOptions,
    pub deskew: DeskewOptions,
    pub image: ImageFilterOptions,
    pub lossy: LossyOptions,
    pub ocr: OcrOptions,
    pub optimize: OptimizeOptions,
    pub watermark: WatermarkOptions,
    pub page_numbers: PageNumberOptions,
    pub metadata: MetadataOptions,
    /// Report per-stage progress, not only warnings.
    pub verbose: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            blank: BlankPageOptions {
                enabled: false,
                threshold: 0.99,
            },
            deskew: DeskewOptions {
                auto: false,
                basic: false,
                threshold: 0.5,
            },
            image: ImageFilterOptions {
                enhance: false,
                denoise: false,
                binarize: false,
                sharpen: false,
                despeckle: false,
                autocrop: false,
                max_dpi: None,
            },
            lossy: LossyOptions {
                enabled: false,
                dpi: 150,
                quality: 70,
            },
            ocr: OcrOptions {
                enabled: false,
                language: "spa".to_string(),
            },
            optimize: OptimizeOptions {
                enabled: false,
                compress_level: 5,
            },
            watermark: WatermarkOptions {
                text: None,
                opacity: 0.3,
                font_size: 60.0,
                rotation: 45.0,
            },
            page_numbers: PageNumberOptions {
                enabled: false,
                position: PageNumberPosition::BottomCenter,
                font_size: 10.0,
                margin: 20.0,
            },
            metadata: MetadataOptions::default(),
            verbose: true,
        }
    }
}

impl ProcessingConfig {
    /// The stages this configuration enables, in execution order.
    pub fn enabled_stages(&self) -> Vec<StageKind> {
        let mut stages = Vec::with_capacity(9);
        if self.blank.enabled {
            stages.push(StageKind::BlankPages);
        }
        if self.deskew.auto {
            stages.push(StageKind::AutoDeskew);
        } else if self.deskew.basic {
            stages.push(StageKind::BasicDeskew);
        }
        if self.image.any_enabled() {
            stages.push(StageKind::ImageFilter);
        }
        if self.lossy.enabled {
            stages.push(StageKind::Lossy);
        }
        if self.ocr.enabled {
            stages.push(StageKind::Ocr);
        }
        if self.optimize.enabled {
            stages.push(StageKind::Optimize);
        }
        if self.watermark.text.is_some() {
            stages.push(StageKind::Watermark);
        }
        if self.page_numbers.enabled {
            stages.push(StageKind::PageNumbers);
        }
        if self.metadata.any_set() {
            stages.push(StageKind::Metadata);
        }
        stages
    }
}

// -- Override layers ----------------------------------------------------------

/// One layer of user-supplied options (a profile, or the command line).
///
/// Field names match the profile file keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingOverrides {
    pub remove_blank: Flag,
    pub blank_threshold: Option<f64>,

    pub auto_deskew: Flag,
    pub deskew: Flag,
    pub deskew_threshold: Option<f64>,

    pub enhance: Flag,
    pub denoise: Flag,
    pub binarize: Flag,
    pub sharpen: Flag,
    pub despeckle: Flag,
    pub autocrop: Flag,
    pub max_dpi: Option<u32>,

    pub lossy: Flag,
    pub lossy_dpi: Option<u32>,
    pub lossy_quality: Option<u8>,

    pub ocr: Flag,
    pub ocr_lang: Option<String>,

    pub optimize: Flag,
    pub compress_level: Option<u8>,

    pub watermark: Option<String>,
    pub watermark_opacity: Option<f32>,
    pub watermark_size: Option<f32>,
    pub watermark_rotation: Option<f32>,

    pub page_numbers: Flag,
    pub page_number_position: Option<PageNumberPosition>,
    pub page_number_size: Option<f32>,
    pub page_number_margin: Option<f32>,

    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,

    pub verbose: Flag,
}

macro_rules! layer {
    ($upper:expr, $lower:expr; flags: $($flag:ident),* ; values: $($value:ident),* $(,)?) => {
        ProcessingOverrides {
            $($flag: $upper.$flag.or($lower.$flag),)*
            $($value: $upper.$value.clone().or_else(|| $lower.$value.clone()),)*
        }
    };
}

impl ProcessingOverrides {
    /// Stack this layer on top of `lower`: every option set here wins.
    pub fn layered_over(&self, lower: &ProcessingOverrides) -> ProcessingOverrides {
        layer!(self, lower;
            flags: remove_blank, auto_deskew, deskew, enhance, denoise, binarize, sharpen,
                despeckle, autocrop, lossy, ocr, optimize, page_numbers, verbose;
            values: blank_threshold, deskew_threshold, max_dpi, lossy_dpi, lossy_quality,
                ocr_lang, compress_level, watermark, watermark_opacity, watermark_size,
                watermark_rotation, page_number_position, page_number_size, page_number_margin,
                title, author, subject, keywords,
        )
    }

    /// Fill unset options with built-in defaults and validate ranges.
    pub fn resolve(&self) -> Result<ProcessingConfig> {
        let defaults = ProcessingConfig::default();

        let blank_threshold = self.blank_threshold.unwrap_or(defaults.blank.threshold);
        if !(0.0..=1.0).contains(&blank_threshold) {
            return Err(ScanmergeError::Config(format!(
                "blank_threshold must be between 0 and 1, got {blank_threshold}"
            )));
        }

        let deskew_threshold = self.deskew_threshold.unwrap_or(defaults.deskew.threshold);
        if !deskew_threshold.is_finite() || deskew_threshold < 0.0 {
            return Err(ScanmergeError::Config(format!(
                "deskew_threshold must be a non-negative angle, got {deskew_threshold}"
            )));
        }

        let compress_level = self.compress_level.unwrap_or(defaults.optimize.compress_level);
        if compress_level > 9 {
            return Err(ScanmergeError::Config(format!(
                "compress_level must be between 0 and 9, got {compress_level}"
            )));
        }

        let lossy_dpi = self.lossy_dpi.unwrap_or(defaults.lossy.dpi);
        if lossy_dpi == 0 || self.max_dpi == Some(0) {
            return Err(ScanmergeError::Config("DPI values must be greater than zero".into()));
        }

        let watermark_opacity = self.watermark_opacity.unwrap_or(defaults.watermark.opacity);
        if !(0.0..=1.0).contains(&watermark_opacity) {
            return Err(ScanmergeError::Config(format!(
                "watermark_opacity must be between 0 and 1, got {watermark_opacity}"
            )));
        }

        let watermark_size = self.watermark_size.unwrap_or(defaults.watermark.font_size);
        let page_number_size = self.page_number_size.unwrap_or(defaults.page_numbers.font_size);
        if watermark_size <= 0.0 || page_number_size <= 0.0 {
            return Err(ScanmergeError::Config("font sizes must be positive".into()));
        }

        Ok(ProcessingConfig {
            blank: BlankPageOptions {
                enabled: self.remove_blank.resolve(defaults.blank.enabled),
                threshold: blank_threshold,
            },
            deskew: DeskewOptions {
                auto: self.auto_deskew.resolve(defaults.deskew.auto),
                basic: self.deskew.resolve(defaults.deskew.basic),
                threshold: deskew_threshold,
            },
            image: ImageFilterOptions {
                enhance: self.enhance.resolve(defaults.image.enhance),
                denoise: self.denoise.resolve(defaults.image.denoise),
                binarize: self.binarize.resolve(defaults.image.binarize),
                sharpen: self.sharpen.resolve(defaults.image.sharpen),
                despeckle: self.despeckle.resolve(defaults.image.despeckle),
                autocrop: self.autocrop.resolve(defaults.image.autocrop),
                max_dpi: self.max_dpi.or(defaults.image.max_dpi),
            },
            lossy: LossyOptions {
                enabled: self.lossy.resolve(defaults.lossy.enabled),
                dpi: lossy_dpi,
                quality: self.lossy_quality.unwrap_or(defaults.lossy.quality).clamp(1, 95),
            },
            ocr: OcrOptions {
                enabled: self.ocr.resolve(defaults.ocr.enabled),
                language: self.ocr_lang.clone().unwrap_or(defaults.ocr.language),
            },
            optimize: OptimizeOptions {
                enabled: self.optimize.resolve(defaults.optimize.enabled),
                compress_level,
            },
            watermark: WatermarkOptions {
                text: non_blank(&self.watermark),
                opacity: watermark_opacity,
                font_size: watermark_size,
                rotation: self.watermark_rotation.unwrap_or(defaults.watermark.rotation),
            },
            page_numbers: PageNumberOptions {
                enabled: self.page_numbers.resolve(defaults.page_numbers.enabled),
                position: self
                    .page_number_position
                    .unwrap_or(defaults.page_numbers.position),
                font_size: page_number_size,
                margin: self.page_number_margin.unwrap_or(defaults.page_numbers.margin),
            },
            metadata: MetadataOptions {
                title: non_blank(&self.title),
                author: non_blank(&self.author),
                subject: non_blank(&self.subject),
                keywords: non_blank(&self.keywords),
            },
            verbose: self.verbose.resolve(defaults.verbose),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
