//! Input validation for video generation requests.
//!
//! Every check reports problems through its return value: a failed check is
//! `valid == false` with a human-readable `error`, never an `Err` or a panic.
//! File checks fold any I/O failure (missing file, permission denied, stat
//! error) into the same generic failure.
//!
//! The limits below are fixed and not configurable at runtime.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image extensions accepted as reference images.
pub const SUPPORTED_IMAGE_FORMATS: &[&str] =
    &[".jpg", ".jpeg", ".png", ".webp", ".gif", ".bmp", ".tiff"];

/// Video extensions accepted as video inputs.
pub const SUPPORTED_VIDEO_FORMATS: &[&str] =
    &[".mp4", ".mov", ".avi", ".webm", ".mkv", ".m4v", ".wmv"];

/// Maximum image file size (20 MiB).
pub const MAX_IMAGE_SIZE: u64 = 20 * 1024 * 1024;

/// Maximum video file size (500 MiB).
pub const MAX_VIDEO_SIZE: u64 = 500 * 1024 * 1024;

/// MIME types by lowercased extension.
const MIME_TYPES: &[(&str, &str)] = &[
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".png", "image/png"),
    (".webp", "image/webp"),
    (".gif", "image/gif"),
    (".bmp", "image/bmp"),
    (".tiff", "image/tiff"),
    (".mp4", "video/mp4"),
    (".mov", "video/quicktime"),
    (".avi", "video/x-msvideo"),
    (".webm", "video/webm"),
    (".mkv", "video/x-matroska"),
    (".m4v", "video/x-m4v"),
    (".wmv", "video/x-ms-wmv"),
];

/// Fallback MIME type for unknown extensions.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Video duration bounds in seconds (inclusive).
pub const MIN_DURATION_SECONDS: f64 = 5.0;
pub const MAX_DURATION_SECONDS: f64 = 20.0;

/// Width bounds in pixels (inclusive).
pub const MIN_WIDTH: u32 = 256;
pub const MAX_WIDTH: u32 = 1920;

/// Height bounds in pixels (inclusive).
pub const MIN_HEIGHT: u32 = 256;
pub const MAX_HEIGHT: u32 = 1080;

/// Width and height must be multiples of this.
pub const DIMENSION_STEP: u32 = 8;

/// Accepted aspect ratios.
pub const VALID_ASPECT_RATIOS: &[&str] = &["16:9", "1:1", "9:16", "4:3", "3:4"];

/// Prompt length bounds in characters (inclusive).
pub const MIN_PROMPT_LENGTH: usize = 3;
pub const MAX_PROMPT_LENGTH: usize = 1000;

/// Prompts shorter than this get a "too short" warning.
pub const SHORT_PROMPT_WARNING_LENGTH: usize = 20;

/// Prompts longer than this get a "too long" warning.
pub const LONG_PROMPT_WARNING_LENGTH: usize = 500;

/// Characters that trigger the special-character warning.
pub const PROMPT_SPECIAL_CHARACTERS: &[char] = &['<', '>', '{', '}', '\\'];

/// Video ID length bounds (inclusive).
pub const MIN_VIDEO_ID_LENGTH: usize = 3;
pub const MAX_VIDEO_ID_LENGTH: usize = 100;

/// Allowed distance between the blend weight sum and 1.0.
pub const BLEND_WEIGHT_TOLERANCE: f64 = 0.01;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Extension and size of a file that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    /// Lowercased extension including the leading dot
    pub extension: String,
    /// Size in bytes
    pub size: u64,
}

/// Outcome of a single validation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal advice; only present on valid results with something to say
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FileMetadata>,
}

impl ValidationResult {
    /// A passing result with nothing attached.
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            warnings: None,
            metadata: None,
        }
    }

    /// A failing result with the given reason.
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            warnings: None,
            metadata: None,
        }
    }

    fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = (!warnings.is_empty()).then_some(warnings);
        self
    }

    fn with_metadata(mut self, metadata: FileMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Warnings as a slice, empty when there are none.
    pub fn warnings(&self) -> &[String] {
        self.warnings.as_deref().unwrap_or_default()
    }

    /// Convert a failed result into `Error::Validation`, passing valid
    /// results through unchanged.
    pub fn into_result(self) -> Result<Self, Error> {
        if self.valid {
            Ok(self)
        } else {
            Err(Error::validation(
                self.error.unwrap_or_else(|| "validation failed".to_string()),
            ))
        }
    }
}

/// Result of [`check_file_size`].
///
/// `size` is 0 when the file could not be inspected, so a failed stat and an
/// oversized file both show up as `valid == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSizeCheck {
    pub valid: bool,
    pub size: u64,
}

/// Optional video generation parameters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VideoParams {
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_seconds: Option<f64>,
    /// Frame width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    /// Frame height in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    /// Aspect ratio such as "16:9"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

/// Result of [`validate_video_params`]; lists every violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamsValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// The kinds of media file the server accepts from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Video,
}

impl FileKind {
    /// Allowed extensions, lowercased with leading dot.
    pub fn supported_formats(self) -> &'static [&'static str] {
        match self {
            FileKind::Image => SUPPORTED_IMAGE_FORMATS,
            FileKind::Video => SUPPORTED_VIDEO_FORMATS,
        }
    }

    /// Maximum accepted size in bytes.
    pub fn max_size(self) -> u64 {
        match self {
            FileKind::Image => MAX_IMAGE_SIZE,
            FileKind::Video => MAX_VIDEO_SIZE,
        }
    }

    fn label(self) -> (&'static str, &'static str) {
        match self {
            FileKind::Image => ("image", "Image"),
            FileKind::Video => ("video", "Video"),
        }
    }
}

/// Lowercased extension of `path` with its leading dot, or an empty string.
///
/// Matches the usual `extname` rules: dotfiles such as `.env` have no
/// extension and a trailing dot yields `"."`.
pub fn extension_of(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// Whether `path` exists and is readable by this process.
///
/// This is an access check only; the file is never opened, so FIFOs and
/// device nodes answer immediately. Any failure yields `false`.
pub async fn check_file_exists(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || is_readable(&path))
        .await
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_readable(path: &Path) -> bool {
    nix::unistd::access(path, nix::unistd::AccessFlags::R_OK).is_ok()
}

#[cfg(not(unix))]
fn is_readable(path: &Path) -> bool {
    std::fs::metadata(path).is_ok()
}

/// Compare the size of `path` against `max_bytes`.
pub async fn check_file_size(path: impl AsRef<Path>, max_bytes: u64) -> FileSizeCheck {
    match tokio::fs::metadata(path.as_ref()).await {
        Ok(metadata) => FileSizeCheck {
            valid: metadata.len() <= max_bytes,
            size: metadata.len(),
        },
        Err(_) => FileSizeCheck {
            valid: false,
            size: 0,
        },
    }
}

/// Validate a file of the given kind: existence, then extension, then size.
///
/// Only the first failing check is reported.
pub async fn validate_file(path: impl AsRef<Path>, kind: FileKind) -> ValidationResult {
    let path = path.as_ref();
    let (noun, title) = kind.label();

    if !check_file_exists(path).await {
        return ValidationResult::invalid(format!("File not found: {}", path.display()));
    }

    let extension = extension_of(path);
    let formats = kind.supported_formats();
    if !formats.contains(&extension.as_str()) {
        return ValidationResult::invalid(format!(
            "Unsupported {} format: {}. Supported formats: {}",
            noun,
            extension,
            formats.join(", ")
        ));
    }

    let max_size = kind.max_size();
    let size_check = check_file_size(path, max_size).await;
    if !size_check.valid {
        return ValidationResult::invalid(format!(
            "{} file too large: {:.2}MB. Maximum size: {}MB",
            title,
            size_check.size as f64 / BYTES_PER_MIB,
            max_size / (1024 * 1024)
        ));
    }

    ValidationResult::ok().with_metadata(FileMetadata {
        extension,
        size: size_check.size,
    })
}

/// Validate an image file (see [`SUPPORTED_IMAGE_FORMATS`], [`MAX_IMAGE_SIZE`]).
pub async fn validate_image_file(path: impl AsRef<Path>) -> ValidationResult {
    validate_file(path, FileKind::Image).await
}

/// Validate a video file (see [`SUPPORTED_VIDEO_FORMATS`], [`MAX_VIDEO_SIZE`]).
pub async fn validate_video_file(path: impl AsRef<Path>) -> ValidationResult {
    validate_file(path, FileKind::Video).await
}

/// MIME type for `path`, matched case-insensitively on the extension.
///
/// ```
/// use sora_mcp_common::validation::get_mime_type;
///
/// assert_eq!(get_mime_type("a.PNG"), "image/png");
/// assert_eq!(get_mime_type("a.xyz"), "application/octet-stream");
/// ```
pub fn get_mime_type(path: impl AsRef<Path>) -> &'static str {
    let extension = extension_of(path);
    MIME_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Check duration, dimensions and aspect ratio, collecting every violation.
pub fn validate_video_params(params: &VideoParams) -> ParamsValidation {
    let mut errors = Vec::new();

    if let Some(seconds) = params.n_seconds {
        if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&seconds) {
            errors.push(format!(
                "Video duration must be between {} and {} seconds",
                MIN_DURATION_SECONDS, MAX_DURATION_SECONDS
            ));
        }
    }

    if let Some(width) = params.width {
        check_dimension("Width", width, MIN_WIDTH, MAX_WIDTH, &mut errors);
    }

    if let Some(height) = params.height {
        check_dimension("Height", height, MIN_HEIGHT, MAX_HEIGHT, &mut errors);
    }

    // An empty aspect ratio counts as not given.
    if let Some(ratio) = params.aspect_ratio.as_deref() {
        if !ratio.is_empty() && !VALID_ASPECT_RATIOS.contains(&ratio) {
            errors.push(format!(
                "Invalid aspect ratio. Valid options: {}",
                VALID_ASPECT_RATIOS.join(", ")
            ));
        }
    }

    ParamsValidation {
        valid: errors.is_empty(),
        errors,
    }
}

fn check_dimension(name: &str, value: i64, min: u32, max: u32, errors: &mut Vec<String>) {
    if value < i64::from(min) || value > i64::from(max) {
        errors.push(format!("{} must be between {} and {} pixels", name, min, max));
    }
    if value % i64::from(DIMENSION_STEP) != 0 {
        errors.push(format!("{} must be divisible by {}", name, DIMENSION_STEP));
    }
}

/// Check prompt length and collect advisory warnings.
///
/// Length is counted in Unicode scalar values, so a character outside the
/// Basic Multilingual Plane (most emoji) counts once rather than as a UTF-16
/// surrogate pair. A prompt outside the hard bounds fails immediately
/// without warnings.
pub fn validate_prompt(prompt: &str) -> ValidationResult {
    let length = prompt.chars().count();

    if length < MIN_PROMPT_LENGTH {
        return ValidationResult::invalid(format!(
            "Prompt is too short. Minimum {} characters required.",
            MIN_PROMPT_LENGTH
        ));
    }

    if length > MAX_PROMPT_LENGTH {
        return ValidationResult::invalid(format!(
            "Prompt is too long. Maximum {} characters allowed.",
            MAX_PROMPT_LENGTH
        ));
    }

    let mut warnings = Vec::new();

    if length < SHORT_PROMPT_WARNING_LENGTH {
        warnings.push(
            "Short prompts may produce less specific results. Consider adding more detail."
                .to_string(),
        );
    }

    if length > LONG_PROMPT_WARNING_LENGTH {
        warnings.push(
            "Very long prompts may be less effective. Consider focusing on key elements."
                .to_string(),
        );
    }

    if prompt.contains(PROMPT_SPECIAL_CHARACTERS) {
        warnings.push("Special characters detected. These may be interpreted literally.".to_string());
    }

    ValidationResult::ok().with_warnings(warnings)
}

/// Whether `video_id` is 3-100 characters of `[A-Za-z0-9_-]`.
pub fn validate_video_id(video_id: &str) -> bool {
    (MIN_VIDEO_ID_LENGTH..=MAX_VIDEO_ID_LENGTH).contains(&video_id.len())
        && video_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check a set of blend weights: count, then sum, then per-weight range.
pub fn validate_blend_weights(weights: &[f64], expected_count: usize) -> ValidationResult {
    if weights.len() != expected_count {
        return ValidationResult::invalid(format!(
            "Number of weights ({}) must match number of videos ({})",
            weights.len(),
            expected_count
        ));
    }

    let sum: f64 = weights.iter().sum();
    // Written as a negated `<=` so a NaN sum fails too.
    if !((sum - 1.0).abs() <= BLEND_WEIGHT_TOLERANCE) {
        return ValidationResult::invalid(format!(
            "Weights must sum to 1.0 (current sum: {})",
            sum
        ));
    }

    if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
        return ValidationResult::invalid("Each weight must be between 0 and 1");
    }

    ValidationResult::ok()
}
