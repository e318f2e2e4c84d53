//! MCP Resources and preset catalogue for the Sora server.
//!
//! This module provides resource implementations for:
//! - `sora://presets` - Style presets with recommended settings
//! - `sora://models` - Supported models and output sizes
//!
//! It also renders the `list_presets` tool text.

use crate::handler::{DEFAULT_MODEL, DEFAULT_SIZE};
use serde::Serialize;
use std::fmt::Write;

/// URI of the presets resource.
pub const PRESETS_URI: &str = "sora://presets";

/// URI of the models resource.
pub const MODELS_URI: &str = "sora://models";

/// A named style preset.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Preset {
    pub name: &'static str,
    /// Phrases that work well in prompts for this style
    pub prompt_tips: &'static str,
    pub recommended_settings: RecommendedSettings,
}

/// Suggested generation settings for a preset.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RecommendedSettings {
    pub seconds: u32,
    pub size: &'static str,
}

/// Information about a supported model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub description: &'static str,
    pub is_default: bool,
}

/// A recommended output size.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SizeInfo {
    pub aspect_ratio: &'static str,
    pub orientation: &'static str,
    pub size: &'static str,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "Cinematic",
        prompt_tips: "Use 'cinematic shot', 'dramatic lighting', 'wide angle'",
        recommended_settings: RecommendedSettings { seconds: 10, size: "1920x1080" },
    },
    Preset {
        name: "Social Media",
        prompt_tips: "Use 'vertical format', 'engaging', 'dynamic movement'",
        recommended_settings: RecommendedSettings { seconds: 15, size: "720x1280" },
    },
    Preset {
        name: "Product Demo",
        prompt_tips: "Use 'clean background', 'product focus', 'smooth rotation'",
        recommended_settings: RecommendedSettings { seconds: 5, size: "1080x1080" },
    },
    Preset {
        name: "Animation",
        prompt_tips: "Use 'animated style', 'cartoon', 'vibrant colors'",
        recommended_settings: RecommendedSettings { seconds: 20, size: "1920x1080" },
    },
];

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "sora-2",
        description: "Standard model (recommended, reliable)",
        is_default: true,
    },
    ModelInfo {
        id: "sora-2-pro",
        description: "Higher quality but may experience delays",
        is_default: false,
    },
];

pub const SIZES: &[SizeInfo] = &[
    SizeInfo { aspect_ratio: "16:9", orientation: "horizontal", size: "1920x1080" },
    SizeInfo { aspect_ratio: "9:16", orientation: "vertical", size: "720x1280" },
    SizeInfo { aspect_ratio: "1:1", orientation: "square", size: "1080x1080" },
];

const BEST_PRACTICES: &[&str] = &[
    "Be specific and descriptive in your prompts",
    "Include style references (cinematic, realistic, animated)",
    "Specify camera movements if needed",
    "Mention lighting and atmosphere details",
    "Keep prompts under 500 characters for best results",
];

#[derive(Serialize)]
struct ModelsResource {
    default_model: &'static str,
    default_size: &'static str,
    models: &'static [ModelInfo],
    sizes: &'static [SizeInfo],
}

/// Text returned by the `list_presets` tool.
pub fn presets_text() -> String {
    let mut text = String::from("Available Video Generation Presets:\n\n");

    for preset in PRESETS {
        let settings = serde_json::to_string(&preset.recommended_settings).unwrap_or_default();
        let _ = writeln!(text, "{}:", preset.name);
        let _ = writeln!(text, "  Prompt tips: {}", preset.prompt_tips);
        let _ = writeln!(text, "  Recommended: {}\n", settings);
    }

    text.push_str("Best Practices:\n");
    for (index, practice) in BEST_PRACTICES.iter().enumerate() {
        let _ = writeln!(text, "{}. {}", index + 1, practice);
    }

    text.push_str("\nRecommended Video Sizes:\n");
    for size in SIZES {
        let _ = writeln!(text, "- {} ({}): {}", size.aspect_ratio, size.orientation, size.size);
    }

    text.push_str("\nModels:\n");
    let models: Vec<String> = MODELS
        .iter()
        .map(|model| format!("- {}: {}", model.id, model.description))
        .collect();
    text.push_str(&models.join("\n"));

    text
}

/// Get presets resource as JSON string.
pub fn presets_resource_json() -> String {
    serde_json::to_string_pretty(PRESETS).unwrap_or_else(|_| "[]".to_string())
}

/// Get models resource as JSON string.
pub fn models_resource_json() -> String {
    let resource = ModelsResource {
        default_model: DEFAULT_MODEL,
        default_size: DEFAULT_SIZE,
        models: MODELS,
        sizes: SIZES,
    };
    serde_json::to_string_pretty(&resource).unwrap_or_else(|_| "{}".to_string())
}
