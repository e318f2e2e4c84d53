//! MCP Server implementation for the Sora server.
//!
//! This module provides the MCP server handler that exposes:
//! - `generate_video` and `generate_video_with_reference` to start jobs
//! - `remix_video`, `retrieve_video`, `list_videos` and `download_video`
//! - `list_presets` for prompt guidance
//! - Resources for presets and models

use crate::handler::{
    DEFAULT_LIST_LIMIT, DEFAULT_MODEL, DEFAULT_SECONDS, DEFAULT_SIZE, DownloadOutcome,
    GenerateVideoParams, ReferenceVideoParams, RemixParams, SoraHandler, ValidationError,
    VideoJob, format_seconds, validate_id_param, validate_limit,
};
use crate::resources;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{
        CallToolResult, Content, ErrorCode, Implementation, JsonObject, ListResourcesResult,
        ListToolsResult, ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo,
        Tool,
    },
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sora_mcp_common::config::Config;
use sora_mcp_common::error::Error;
use sora_mcp_common::validation::validate_prompt;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Text returned by every upstream tool when no API key is configured.
pub const MISSING_API_KEY_MESSAGE: &str =
    "Error: OPENAI_API_KEY not configured. Please set OPENAI_API_KEY environment variable.";

/// Name reported in the MCP handshake.
pub const SERVER_NAME: &str = "sora-mcp-video";

/// MCP Server for Sora video generation.
#[derive(Clone)]
pub struct SoraServer {
    /// Built on first upstream call so the server starts without a key
    handler: Arc<RwLock<Option<SoraHandler>>>,
    config: Config,
}

/// Tool parameters for generate_video.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateVideoToolParams {
    /// Text description of the video to generate
    pub prompt: String,
    /// Video size (e.g., '720x1280' for 9:16, '1920x1080' for 16:9, '1080x1080' for 1:1). Default: '1920x1080'
    #[serde(default)]
    pub size: Option<String>,
    /// Duration in seconds (5-20). Default: 5
    #[serde(default)]
    pub seconds: Option<f64>,
    /// Model to use: 'sora-2' (default) or 'sora-2-pro' (note: pro model may experience delays)
    #[serde(default)]
    pub model: Option<String>,
}

impl From<GenerateVideoToolParams> for GenerateVideoParams {
    fn from(params: GenerateVideoToolParams) -> Self {
        Self {
            prompt: params.prompt,
            model: params.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            size: params.size.unwrap_or_else(|| DEFAULT_SIZE.to_string()),
            seconds: params.seconds.unwrap_or(DEFAULT_SECONDS),
        }
    }
}

/// Tool parameters for generate_video_with_reference.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateVideoWithReferenceToolParams {
    /// Text description of how to animate the image
    pub prompt: String,
    /// Absolute path to reference image file (PNG, JPG, etc.)
    pub reference_image: String,
    /// Video size. Default: '1920x1080'
    #[serde(default)]
    pub size: Option<String>,
    /// Duration in seconds (5-20). Default: 5
    #[serde(default)]
    pub seconds: Option<f64>,
    /// Model to use. Default: 'sora-2'
    #[serde(default)]
    pub model: Option<String>,
}

impl From<GenerateVideoWithReferenceToolParams> for ReferenceVideoParams {
    fn from(params: GenerateVideoWithReferenceToolParams) -> Self {
        Self {
            prompt: params.prompt,
            reference_image: params.reference_image,
            model: params.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            size: params.size.unwrap_or_else(|| DEFAULT_SIZE.to_string()),
            seconds: params.seconds.unwrap_or(DEFAULT_SECONDS),
        }
    }
}

/// Tool parameters for remix_video.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemixVideoToolParams {
    /// ID of the video to remix
    pub video_id: String,
    /// New prompt for remixing the video
    pub prompt: String,
}

impl From<RemixVideoToolParams> for RemixParams {
    fn from(params: RemixVideoToolParams) -> Self {
        Self {
            video_id: params.video_id,
            prompt: params.prompt,
        }
    }
}

/// Tool parameters for retrieve_video.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RetrieveVideoToolParams {
    /// The video ID to retrieve
    pub video_id: String,
}

/// Tool parameters for list_videos.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListVideosToolParams {
    /// Number of videos to return (default: 10, max: 100)
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Tool parameters for download_video.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DownloadVideoToolParams {
    /// ID of the video to download
    pub video_id: String,
    /// Local path to save the video (e.g., '/home/me/videos/output.mp4')
    pub output_path: String,
}

/// list_presets takes no arguments.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPresetsToolParams {}

impl SoraServer {
    /// Create a new SoraServer with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            config,
        }
    }

    /// Get the handler, building it on first use.
    async fn handler(&self) -> Result<SoraHandler, Error> {
        if let Some(handler) = self.handler.read().await.as_ref() {
            return Ok(handler.clone());
        }

        let mut slot = self.handler.write().await;
        match slot.as_ref() {
            Some(handler) => Ok(handler.clone()),
            None => {
                let handler = SoraHandler::new(self.config.clone())?;
                *slot = Some(handler.clone());
                Ok(handler)
            }
        }
    }

    /// Route a tool call by name.
    ///
    /// Upstream and validation failures come back as error tool results;
    /// only malformed arguments and unknown tools are protocol errors.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult, McpError> {
        debug!(tool = name, "Dispatching tool call");

        match name {
            "generate_video" => self.generate_video(parse_args(arguments)?).await,
            "generate_video_with_reference" => self.generate_video_with_reference(parse_args(arguments)?).await,
            "remix_video" => self.remix_video(parse_args(arguments)?).await,
            "retrieve_video" => self.retrieve_video(parse_args(arguments)?).await,
            "list_videos" => self.list_videos(parse_args(arguments)?).await,
            "download_video" => self.download_video(parse_args(arguments)?).await,
            "list_presets" => {
                let _: ListPresetsToolParams = parse_args(arguments)?;
                Ok(CallToolResult::success(vec![Content::text(resources::presets_text())]))
            }
            _ => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", name),
                None,
            )),
        }
    }

    /// Start a text-to-video job.
    pub async fn generate_video(&self, params: GenerateVideoToolParams) -> Result<CallToolResult, McpError> {
        const ACTION: &str = "generating video";
        let params: GenerateVideoParams = params.into();
        info!(model = %params.model, size = %params.size, "Generating video");

        if let Err(errors) = params.validate() {
            return Ok(validation_failure(ACTION, errors));
        }

        let handler = match self.handler().await {
            Ok(handler) => handler,
            Err(e) => return Ok(handler_unavailable(ACTION, e)),
        };

        match handler.create_video(&params).await {
            Ok(job) => Ok(CallToolResult::success(vec![Content::text(format_generate_result(&job, &params))])),
            Err(e) => {
                let mut text = format!("Error {}: {}", ACTION, e.user_message());
                if let Some(details) = e.details() {
                    text.push_str(&format!("\n\nDetails:\n{}", details));
                }
                warn!(error = %e, "Video generation failed");
                Ok(CallToolResult::error(vec![Content::text(text)]))
            }
        }
    }

    /// Start an image-guided job.
    pub async fn generate_video_with_reference(
        &self,
        params: GenerateVideoWithReferenceToolParams,
    ) -> Result<CallToolResult, McpError> {
        const ACTION: &str = "generating video with reference";
        let params: ReferenceVideoParams = params.into();
        info!(reference_image = %params.reference_image, "Generating video with reference");

        if let Err(errors) = params.validate() {
            return Ok(validation_failure(ACTION, errors));
        }

        let handler = match self.handler().await {
            Ok(handler) => handler,
            Err(e) => return Ok(handler_unavailable(ACTION, e)),
        };

        match handler.create_video_with_reference(&params).await {
            Ok(job) => Ok(CallToolResult::success(vec![Content::text(format_reference_result(&job, &params))])),
            Err(e) => Ok(upstream_failure(ACTION, &e)),
        }
    }

    /// Start a remix of an existing video.
    pub async fn remix_video(&self, params: RemixVideoToolParams) -> Result<CallToolResult, McpError> {
        const ACTION: &str = "remixing video";
        let params: RemixParams = params.into();
        info!(video_id = %params.video_id, "Remixing video");

        if let Err(errors) = params.validate() {
            return Ok(validation_failure(ACTION, errors));
        }

        let handler = match self.handler().await {
            Ok(handler) => handler,
            Err(e) => return Ok(handler_unavailable(ACTION, e)),
        };

        match handler.remix_video(&params).await {
            Ok(job) => Ok(CallToolResult::success(vec![Content::text(format_remix_result(&job, &params))])),
            Err(e) => Ok(upstream_failure(ACTION, &e)),
        }
    }

    /// Report the status of a job.
    pub async fn retrieve_video(&self, params: RetrieveVideoToolParams) -> Result<CallToolResult, McpError> {
        const ACTION: &str = "retrieving video status";

        if let Err(errors) = validate_id_param(&params.video_id) {
            return Ok(validation_failure(ACTION, errors));
        }

        let handler = match self.handler().await {
            Ok(handler) => handler,
            Err(e) => return Ok(handler_unavailable(ACTION, e)),
        };

        match handler.retrieve_video(&params.video_id).await {
            Ok(job) => Ok(CallToolResult::success(vec![Content::text(format_video_status(&job, &params.video_id))])),
            Err(e) => Ok(upstream_failure(ACTION, &e)),
        }
    }

    /// List recent jobs.
    pub async fn list_videos(&self, params: ListVideosToolParams) -> Result<CallToolResult, McpError> {
        const ACTION: &str = "listing videos";
        let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

        if let Err(errors) = validate_limit(limit) {
            return Ok(validation_failure(ACTION, errors));
        }

        let handler = match self.handler().await {
            Ok(handler) => handler,
            Err(e) => return Ok(handler_unavailable(ACTION, e)),
        };

        match handler.list_videos(limit).await {
            Ok(videos) => Ok(CallToolResult::success(vec![Content::text(format_video_list(&videos))])),
            Err(e) => Ok(upstream_failure(ACTION, &e)),
        }
    }

    /// Save a completed video locally.
    pub async fn download_video(&self, params: DownloadVideoToolParams) -> Result<CallToolResult, McpError> {
        const ACTION: &str = "downloading video";

        if let Err(errors) = validate_id_param(&params.video_id) {
            return Ok(validation_failure(ACTION, errors));
        }

        let handler = match self.handler().await {
            Ok(handler) => handler,
            Err(e) => return Ok(handler_unavailable(ACTION, e)),
        };

        match handler.download_video(&params.video_id, &params.output_path).await {
            Ok(outcome) => Ok(CallToolResult::success(vec![Content::text(format_download_outcome(&outcome))])),
            Err(e) => Ok(upstream_failure(ACTION, &e)),
        }
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Option<JsonObject>) -> Result<T, McpError> {
    let value = serde_json::Value::Object(arguments.unwrap_or_default());
    serde_json::from_value(value)
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))
}

fn validation_failure(action: &str, errors: Vec<ValidationError>) -> CallToolResult {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    let error = Error::validation(messages.join("; "));
    debug!(action, error = %error, "Rejected tool arguments");
    CallToolResult::error(vec![Content::text(format!("Error {}: {}", action, error))])
}

fn handler_unavailable(action: &str, error: Error) -> CallToolResult {
    match error {
        Error::Config(_) => CallToolResult::success(vec![Content::text(MISSING_API_KEY_MESSAGE)]),
        other => upstream_failure(action, &other),
    }
}

fn upstream_failure(action: &str, error: &Error) -> CallToolResult {
    warn!(action, error = %error, "Tool call failed");
    CallToolResult::error(vec![Content::text(format!("Error {}: {}", action, error.user_message()))])
}

fn warnings_suffix(prompt: &str) -> String {
    let result = validate_prompt(prompt);
    let warnings = result.warnings();
    if warnings.is_empty() {
        return String::new();
    }

    let lines: Vec<String> = warnings.iter().map(|w| format!("- {}", w)).collect();
    format!("\n\nWarnings:\n{}", lines.join("\n"))
}

/// Success text for `generate_video`.
pub fn format_generate_result(job: &VideoJob, params: &GenerateVideoParams) -> String {
    format!(
        "Video generation started successfully!\n\nVideo ID: {id}\nStatus: {status}\n\n\
         Prompt: \"{prompt}\"\nModel: {model}\nSize: {size}\nDuration: {seconds} seconds\n\n\
         Use 'retrieve_video' with video ID \"{id}\" to check progress.\n\n\
         Note: Video generation typically takes 1-3 minutes.{warnings}",
        id = job.id,
        status = job.status,
        prompt = params.prompt,
        model = params.model,
        size = params.size,
        seconds = format_seconds(params.seconds),
        warnings = warnings_suffix(&params.prompt),
    )
}

/// Success text for `generate_video_with_reference`.
pub fn format_reference_result(job: &VideoJob, params: &ReferenceVideoParams) -> String {
    format!(
        "Video generation with reference started!\n\nVideo ID: {id}\nStatus: {status}\n\n\
         Reference Image: {image}\nPrompt: \"{prompt}\"\nModel: {model}\nSize: {size}\n\
         Duration: {seconds} seconds\n\n\
         Use 'retrieve_video' with video ID \"{id}\" to check progress.{warnings}",
        id = job.id,
        status = job.status,
        image = params.reference_image,
        prompt = params.prompt,
        model = params.model,
        size = params.size,
        seconds = format_seconds(params.seconds),
        warnings = warnings_suffix(&params.prompt),
    )
}

/// Success text for `remix_video`.
pub fn format_remix_result(job: &VideoJob, params: &RemixParams) -> String {
    format!(
        "Video remix started!\n\nNew Video ID: {id}\nStatus: {status}\n\n\
         Original Video: {original}\nNew Prompt: \"{prompt}\"\n\n\
         Use 'retrieve_video' with video ID \"{id}\" to check progress.{warnings}",
        id = job.id,
        status = job.status,
        original = params.video_id,
        prompt = params.prompt,
        warnings = warnings_suffix(&params.prompt),
    )
}

/// Status text for `retrieve_video`.
pub fn format_video_status(job: &VideoJob, requested_id: &str) -> String {
    let mut text = format!("Video ID: {}\nStatus: {}", job.id, job.status);

    if let Some(created) = job.created_at_display() {
        text.push_str(&format!("\nCreated: {}", created));
    }
    if let Some(progress) = job.progress {
        text.push_str(&format!("\nProgress: {}%", progress));
    }

    if job.is_completed() {
        text.push_str("\n\n✓ Video generation completed!");
        text.push_str(&format!(
            "\n\nUse 'download_video' with video ID \"{}\" to save the video locally.",
            requested_id
        ));
    } else if job.is_failed() {
        text.push_str(&format!("\n\n✗ Video generation failed: {}", job.error_message()));
    } else if job.is_pending() {
        text.push_str("\n\n⏳ Video is still processing. Check again in a few moments.");
    }

    text
}

/// Listing text for `list_videos`.
pub fn format_video_list(videos: &[VideoJob]) -> String {
    if videos.is_empty() {
        return "No videos found.".to_string();
    }

    let mut text = format!("Found {} video(s):\n\n", videos.len());
    for (index, video) in videos.iter().enumerate() {
        text.push_str(&format!("{}. Video ID: {}\n", index + 1, video.id));
        text.push_str(&format!("   Status: {}\n", video.status));
        if let Some(created) = video.created_at_display() {
            text.push_str(&format!("   Created: {}\n", created));
        }
        text.push('\n');
    }
    text.push_str("Use 'retrieve_video' to get details about a specific video.");

    text
}

/// Result text for `download_video`.
pub fn format_download_outcome(outcome: &DownloadOutcome) -> String {
    match outcome {
        DownloadOutcome::NotReady { status } => format!(
            "Cannot download video. Current status: {}\n\nPlease wait for the video to complete generation.",
            status
        ),
        DownloadOutcome::Saved { path, size } => format!(
            "Video downloaded successfully!\n\nSaved to: {}\nFile size: {:.2} MB",
            path.display(),
            *size as f64 / 1024.0 / 1024.0
        ),
    }
}

fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema).unwrap_or_default() {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    }
}

fn tool(name: &'static str, description: &'static str, input_schema: Arc<JsonObject>) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        description: Some(Cow::Borrowed(description)),
        input_schema,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }
}

/// The seven tools advertised by the server.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        tool(
            "generate_video",
            "Generate a video using OpenAI Sora 2 model with text prompt. Uses sora-2 model by default.",
            input_schema::<GenerateVideoToolParams>(),
        ),
        tool(
            "generate_video_with_reference",
            "Generate a video using a reference image. The image will be animated according to the prompt.",
            input_schema::<GenerateVideoWithReferenceToolParams>(),
        ),
        tool(
            "remix_video",
            "Remix an existing video with a new prompt while maintaining visual consistency",
            input_schema::<RemixVideoToolParams>(),
        ),
        tool(
            "retrieve_video",
            "Retrieve the status and details of a video generation job",
            input_schema::<RetrieveVideoToolParams>(),
        ),
        tool("list_videos", "List all recent videos", input_schema::<ListVideosToolParams>()),
        tool(
            "download_video",
            "Download a completed video to local storage",
            input_schema::<DownloadVideoToolParams>(),
        ),
        tool(
            "list_presets",
            "List available video generation presets and best practices",
            input_schema::<ListPresetsToolParams>(),
        ),
    ]
}

fn resource(uri: &str, name: &str, description: &str) -> rmcp::model::Resource {
    rmcp::model::Resource {
        raw: rmcp::model::RawResource {
            uri: uri.to_string(),
            name: name.to_string(),
            title: None,
            description: Some(description.to_string()),
            mime_type: Some("application/json".to_string()),
            size: None,
            icons: None,
            meta: None,
        },
        annotations: None,
    }
}

impl ServerHandler for SoraServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Video generation server using the OpenAI Sora API. \
                 Use generate_video or generate_video_with_reference to start a job, \
                 retrieve_video to poll its status and download_video to save the result."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                tools: tool_definitions(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.dispatch(params.name.as_ref(), params.arguments).await }
    }

    fn list_resources(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            debug!("Listing resources");

            Ok(ListResourcesResult {
                resources: vec![
                    resource(
                        resources::PRESETS_URI,
                        "Video Generation Presets",
                        "Style presets with prompt tips and recommended settings",
                    ),
                    resource(
                        resources::MODELS_URI,
                        "Available Sora Models",
                        "Supported models, defaults and recommended output sizes",
                    ),
                ],
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn read_resource(
        &self,
        params: rmcp::model::ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let uri = &params.uri;
            debug!(uri = %uri, "Reading resource");

            let content = match uri.as_str() {
                resources::PRESETS_URI => resources::presets_resource_json(),
                resources::MODELS_URI => resources::models_resource_json(),
                _ => {
                    return Err(McpError::resource_not_found(
                        format!("Unknown resource: {}", uri),
                        None,
                    ));
                }
            };

            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(content, uri.clone())],
            })
        }
    }
}
