//! Sora API handler for the MCP Video server.
//!
//! This module provides the `SoraHandler` struct, the parameter types for
//! each operation and the wire types of the OpenAI videos API.

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sora_mcp_common::config::Config;
use sora_mcp_common::error::Error;
use sora_mcp_common::validation::{
    VideoParams, get_mime_type, validate_image_file, validate_prompt, validate_video_id,
    validate_video_params,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default model for video generation.
pub const DEFAULT_MODEL: &str = "sora-2";

/// Models accepted by the `model` parameter.
pub const SUPPORTED_MODELS: &[&str] = &["sora-2", "sora-2-pro"];

/// Default output size (16:9).
pub const DEFAULT_SIZE: &str = "1920x1080";

/// Default duration in seconds.
pub const DEFAULT_SECONDS: f64 = 5.0;

/// Default page size for `list_videos`.
pub const DEFAULT_LIST_LIMIT: u32 = 10;

/// Largest page size accepted by the videos list endpoint.
pub const MAX_LIST_LIMIT: u32 = 100;

/// Status reported by the API once the video file is available.
pub const STATUS_COMPLETED: &str = "completed";

/// Status reported by the API when generation failed.
pub const STATUS_FAILED: &str = "failed";

/// Validation error details for tool parameters.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn into_validation_error(errors: Vec<ValidationError>) -> Error {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    Error::validation(messages.join("; "))
}

/// Parse a `WIDTHxHEIGHT` size string.
pub fn parse_size(size: &str) -> Option<(u32, u32)> {
    let (width, height) = size.trim().split_once(['x', 'X'])?;
    let width: u32 = width.trim().parse().ok()?;
    let height: u32 = height.trim().parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

/// Render a duration the way the API expects it in form and JSON fields.
pub fn format_seconds(seconds: f64) -> String {
    seconds.to_string()
}

fn check_prompt(prompt: &str, errors: &mut Vec<ValidationError>) {
    let result = validate_prompt(prompt);
    if let Some(message) = result.error {
        errors.push(ValidationError::new("prompt", message));
    }
}

fn check_video_id(video_id: &str, errors: &mut Vec<ValidationError>) {
    if !validate_video_id(video_id) {
        errors.push(ValidationError::new(
            "video_id",
            format!(
                "Invalid video ID '{}'. Expected 3-100 characters of letters, digits, '_' or '-'",
                video_id
            ),
        ));
    }
}

fn check_generation_settings(model: &str, size: &str, seconds: f64, errors: &mut Vec<ValidationError>) {
    if !SUPPORTED_MODELS.contains(&model) {
        errors.push(ValidationError::new(
            "model",
            format!("Unknown model '{}'. Valid models: {}", model, SUPPORTED_MODELS.join(", ")),
        ));
    }

    if parse_size(size).is_none() {
        errors.push(ValidationError::new(
            "size",
            format!("Invalid size '{}'. Expected WIDTHxHEIGHT, e.g. '1920x1080'", size),
        ));
    }

    let duration = validate_video_params(&VideoParams {
        n_seconds: Some(seconds),
        ..Default::default()
    });
    errors.extend(
        duration
            .errors
            .into_iter()
            .map(|message| ValidationError::new("seconds", message)),
    );
}

/// Text-to-video generation parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateVideoParams {
    /// Text description of the video to generate.
    pub prompt: String,
    /// Model to use.
    pub model: String,
    /// Output size as `WIDTHxHEIGHT`.
    pub size: String,
    /// Duration in seconds.
    pub seconds: f64,
}

impl GenerateVideoParams {
    /// Validate the parameters, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_prompt(&self.prompt, &mut errors);
        check_generation_settings(&self.model, &self.size, self.seconds, &mut errors);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Image-guided generation parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReferenceVideoParams {
    /// How to animate the reference image.
    pub prompt: String,
    /// Local path of the reference image.
    pub reference_image: String,
    pub model: String,
    pub size: String,
    pub seconds: f64,
}

impl ReferenceVideoParams {
    /// Validate the non-file parameters. The image itself is checked by
    /// the handler since that needs the filesystem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_prompt(&self.prompt, &mut errors);
        if self.reference_image.trim().is_empty() {
            errors.push(ValidationError::new("reference_image", "reference_image path is required"));
        }
        check_generation_settings(&self.model, &self.size, self.seconds, &mut errors);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Remix parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemixParams {
    /// ID of the video to remix.
    pub video_id: String,
    /// New prompt for the remix.
    pub prompt: String,
}

impl RemixParams {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_video_id(&self.video_id, &mut errors);
        check_prompt(&self.prompt, &mut errors);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Check a bare video ID.
pub fn validate_id_param(video_id: &str) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_video_id(video_id, &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Check a `list_videos` page size.
pub fn validate_limit(limit: u32) -> Result<(), Vec<ValidationError>> {
    if (1..=MAX_LIST_LIMIT).contains(&limit) {
        Ok(())
    } else {
        Err(vec![ValidationError::new(
            "limit",
            format!("limit must be between 1 and {}, got {}", MAX_LIST_LIMIT, limit),
        )])
    }
}

/// Handler for Sora API operations.
///
/// Cheap to clone; the underlying HTTP client shares its connection pool.
#[derive(Clone)]
pub struct SoraHandler {
    /// Application configuration
    pub config: Config,
    /// HTTP client for API calls
    pub http: reqwest::Client,
    api_key: String,
}

impl std::fmt::Debug for SoraHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoraHandler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SoraHandler {
    /// Create a new handler.
    ///
    /// # Errors
    /// Returns `Error::Config` if no API key is configured.
    pub fn new(config: Config) -> Result<Self, Error> {
        let api_key = config.require_api_key()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::api(&config.api_base, 0, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http, api_key })
    }

    /// Send a request and turn non-2xx responses into `Error::Api`.
    async fn execute(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::api(endpoint, 0, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_response_body(
                endpoint,
                status.as_u16(),
                &body,
                status.canonical_reason().unwrap_or("Request failed"),
            ));
        }

        Ok(response)
    }

    async fn execute_json<T: DeserializeOwned>(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<T, Error> {
        let response = self.execute(endpoint, request).await?;
        let status = response.status().as_u16();
        response
            .json::<T>()
            .await
            .map_err(|e| Error::api(endpoint, status, format!("Failed to parse response: {}", e)))
    }

    /// Start a text-to-video generation job.
    #[instrument(level = "info", name = "create_video", skip(self, params), fields(model = %params.model, size = %params.size))]
    pub async fn create_video(&self, params: &GenerateVideoParams) -> Result<VideoJob, Error> {
        params.validate().map_err(into_validation_error)?;

        let request = CreateVideoRequest {
            model: &params.model,
            prompt: &params.prompt,
            size: &params.size,
            seconds: format_seconds(params.seconds),
        };

        let endpoint = self.config.endpoint("videos");
        debug!(endpoint = %endpoint, "Calling Sora API");

        let video: VideoJob = self
            .execute_json(&endpoint, self.http.post(&endpoint).json(&request))
            .await?;

        info!(video_id = %video.id, status = %video.status, "Video generation started");
        Ok(video)
    }

    /// Start a generation job guided by a local reference image.
    #[instrument(level = "info", name = "create_video_with_reference", skip(self, params), fields(model = %params.model, reference_image = %params.reference_image))]
    pub async fn create_video_with_reference(&self, params: &ReferenceVideoParams) -> Result<VideoJob, Error> {
        params.validate().map_err(into_validation_error)?;

        let image_path = Path::new(&params.reference_image);
        validate_image_file(image_path).await.into_result()?;

        // Reading a FIFO or device node would block or never end.
        if !tokio::fs::metadata(image_path).await?.is_file() {
            return Err(Error::validation(format!(
                "Reference image is not a regular file: {}",
                image_path.display()
            )));
        }

        let image_data = tokio::fs::read(image_path).await?;
        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reference".to_string());
        let mime_type = get_mime_type(image_path);

        let part = Part::bytes(image_data)
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| Error::validation(format!("Invalid MIME type {}: {}", mime_type, e)))?;

        let form = Form::new()
            .text("model", params.model.clone())
            .text("prompt", params.prompt.clone())
            .text("size", params.size.clone())
            .text("seconds", format_seconds(params.seconds))
            .part("input_reference", part);

        let endpoint = self.config.endpoint("videos");
        debug!(endpoint = %endpoint, mime_type, "Calling Sora API with reference image");

        let video: VideoJob = self
            .execute_json(&endpoint, self.http.post(&endpoint).multipart(form))
            .await?;

        info!(video_id = %video.id, status = %video.status, "Video generation with reference started");
        Ok(video)
    }

    /// Start a remix of an existing video.
    #[instrument(level = "info", name = "remix_video", skip(self, params), fields(video_id = %params.video_id))]
    pub async fn remix_video(&self, params: &RemixParams) -> Result<VideoJob, Error> {
        params.validate().map_err(into_validation_error)?;

        let endpoint = self.config.endpoint("videos/remix");
        let request = RemixVideoRequest {
            video_id: &params.video_id,
            prompt: &params.prompt,
        };

        let video: VideoJob = self
            .execute_json(&endpoint, self.http.post(&endpoint).json(&request))
            .await?;

        info!(video_id = %video.id, "Video remix started");
        Ok(video)
    }

    /// Fetch the current state of a video job.
    #[instrument(level = "debug", skip(self))]
    pub async fn retrieve_video(&self, video_id: &str) -> Result<VideoJob, Error> {
        validate_id_param(video_id).map_err(into_validation_error)?;

        let endpoint = self.config.endpoint(&format!("videos/{}", video_id));
        self.execute_json(&endpoint, self.http.get(&endpoint)).await
    }

    /// List recent videos, newest first as returned by the API.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_videos(&self, limit: u32) -> Result<Vec<VideoJob>, Error> {
        validate_limit(limit).map_err(into_validation_error)?;

        let endpoint = self.config.endpoint("videos");
        let page: VideoList = self
            .execute_json(&endpoint, self.http.get(&endpoint).query(&[("limit", limit)]))
            .await?;

        Ok(page.data)
    }

    /// Download a completed video to `output_path`, creating parent
    /// directories as needed.
    ///
    /// Returns [`DownloadOutcome::NotReady`] without touching the filesystem
    /// if the job has not completed.
    #[instrument(level = "info", skip(self))]
    pub async fn download_video(&self, video_id: &str, output_path: &str) -> Result<DownloadOutcome, Error> {
        let mut errors = Vec::new();
        check_video_id(video_id, &mut errors);
        if output_path.trim().is_empty() {
            errors.push(ValidationError::new("output_path", "output_path cannot be empty"));
        }
        if !errors.is_empty() {
            return Err(into_validation_error(errors));
        }

        let video = self.retrieve_video(video_id).await?;
        if !video.is_completed() {
            info!(status = %video.status, "Video not ready for download");
            return Ok(DownloadOutcome::NotReady { status: video.status });
        }

        let endpoint = self.config.endpoint(&format!("videos/{}/content", video_id));
        let response = self.execute(&endpoint, self.http.get(&endpoint)).await?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::api(&endpoint, status, format!("Failed to read video content: {}", e)))?;

        let full_path = std::path::absolute(output_path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, &bytes).await?;

        info!(path = %full_path.display(), bytes = bytes.len(), "Video downloaded");
        Ok(DownloadOutcome::Saved {
            path: full_path,
            size: bytes.len() as u64,
        })
    }
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// JSON body for `POST /videos`.
#[derive(Debug, Serialize)]
pub struct CreateVideoRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub size: &'a str,
    /// The API takes the duration as a string
    pub seconds: String,
}

/// JSON body for `POST /videos/remix`.
#[derive(Debug, Serialize)]
pub struct RemixVideoRequest<'a> {
    pub video_id: &'a str,
    pub prompt: &'a str,
}

/// A video job as returned by the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoJob {
    pub id: String,
    #[serde(default)]
    pub status: String,
    /// Unix timestamp or date string, depending on API version
    #[serde(default)]
    pub created_at: Option<serde_json::Value>,
    /// Completion percentage
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub error: Option<VideoJobError>,
}

/// Failure details attached to a failed job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoJobError {
    #[serde(default)]
    pub message: Option<String>,
}

impl VideoJob {
    /// Whether the video file can be downloaded.
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    /// Whether the job failed.
    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED
    }

    /// Whether the job is waiting or running.
    pub fn is_pending(&self) -> bool {
        matches!(self.status.as_str(), "queued" | "in_progress")
    }

    /// `created_at` rendered for display.
    pub fn created_at_display(&self) -> Option<String> {
        match self.created_at.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Failure message, or "Unknown error" when the API gave none.
    pub fn error_message(&self) -> &str {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .unwrap_or("Unknown error")
    }
}

/// Envelope of `GET /videos`.
#[derive(Debug, Deserialize)]
pub struct VideoList {
    #[serde(default)]
    pub data: Vec<VideoJob>,
}

// =============================================================================
// Result Types
// =============================================================================

/// Result of [`SoraHandler::download_video`].
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// The job has not completed yet.
    NotReady { status: String },
    /// The video was written to disk.
    Saved { path: PathBuf, size: u64 },
}
