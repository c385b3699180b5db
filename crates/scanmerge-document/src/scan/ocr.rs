// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR (Optical Character Recognition) for scanned pages.
//
// Text is recognised with the `ocrs` crate, a pure-Rust OCR engine backed by
// neural network models executed via `rten`. The engine itself is only built
// with the `ocr` feature:
//
// ```toml
// scanmerge-document = { path = "crates/scanmerge-document", features = ["ocr"] }
// ```
//
// Model discovery (`OcrConfig`) is always compiled so that callers can report
// why OCR is unavailable.
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`) locates text regions.
// - **Recognition model** (`text-recognition.rten`) decodes characters.
//
// Running `ocrs-cli` once downloads both into `$XDG_CACHE_HOME/ocrs`
// (typically `~/.cache/ocrs`). `SCANMERGE_OCR_MODELS` points at another
// directory.

use std::path::{Path, PathBuf};

use scanmerge_core::error::ScanmergeError;

/// Environment variable naming a directory that holds both model files.
pub const MODEL_DIR_ENV: &str = "SCANMERGE_OCR_MODELS";

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Directory searched for model files when none is configured.
///
/// `$SCANMERGE_OCR_MODELS`, then `$XDG_CACHE_HOME/ocrs`, then
/// `~/.cache/ocrs`.
pub fn model_directory() -> PathBuf {
    if let Ok(dir) = std::env::var(MODEL_DIR_ENV) {
        PathBuf::from(dir)
    } else if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where the OCR engine loads its models from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    /// Path to the text-detection model file (`.rten`).
    pub detection_model_path: PathBuf,
    /// Path to the text-recognition model file (`.rten`).
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(model_directory())
    }
}

impl OcrConfig {
    /// Expect `text-detection.rten` and `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Both model files are present.
    pub fn models_present(&self) -> bool {
        self.detection_model_path.is_file() && self.recognition_model_path.is_file()
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<(), ScanmergeError> {
        for (role, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.is_file() {
                return Err(ScanmergeError::OcrError(format!(
                    "{} model not found at {}; run `ocrs-cli` once to download models \
                     or set {}",
                    role,
                    path.display(),
                    MODEL_DIR_ENV
                )));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "ocr")]
pub use engine::OcrEngine;

#[cfg(feature = "ocr")]
mod engine {
    use image::DynamicImage;
    use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
    use rten::Model;
    use scanmerge_core::error::ScanmergeError;
    use tracing::{debug, info, instrument};

    use super::OcrConfig;

    /// Extracts text lines from page images.
    ///
    /// Model loading is the expensive step; build one engine per run and reuse
    /// it for every page. `ocrs` and `rten` are 10-100x slower in debug builds.
    pub struct OcrEngine {
        engine: OcrsEngine,
    }

    impl OcrEngine {
        /// Load the models named by `config`.
        #[instrument(skip_all, fields(
            detection = %config.detection_model_path.display(),
            recognition = %config.recognition_model_path.display(),
        ))]
        pub fn new(config: &OcrConfig) -> Result<Self, ScanmergeError> {
            config.validate()?;

            let load = |path: &std::path::Path| {
                Model::load_file(path).map_err(|err| {
                    ScanmergeError::OcrError(format!("failed to load model from {}: {}", path.display(), err))
                })
            };
            let detection_model = load(&config.detection_model_path)?;
            let recognition_model = load(&config.recognition_model_path)?;

            let engine = OcrsEngine::new(OcrEngineParams {
                detection_model: Some(detection_model),
                recognition_model: Some(recognition_model),
                ..Default::default()
            })
            .map_err(|err| ScanmergeError::OcrError(format!("failed to initialise OCR engine: {}", err)))?;

            info!("OCR engine initialised");
            Ok(Self { engine })
        }

        /// Recognised text lines of `image`, top to bottom, empty lines
        /// dropped.
        #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
        pub fn recognize_lines(&self, image: &DynamicImage) -> Result<Vec<String>, ScanmergeError> {
            let rgb = image.to_rgb8();
            let (width, height) = rgb.dimensions();

            let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
                ScanmergeError::OcrError(format!("failed to create image source ({}x{}): {}", width, height, err))
            })?;
            let input = self
                .engine
                .prepare_input(source)
                .map_err(|err| ScanmergeError::OcrError(format!("OCR preprocessing failed: {}", err)))?;
            let text = self
                .engine
                .get_text(&input)
                .map_err(|err| ScanmergeError::OcrError(format!("OCR text recognition failed: {}", err)))?;

            let lines: Vec<String> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect();
            debug!(line_count = lines.len(), "OCR recognition complete");
            Ok(lines)
        }
    }
}
