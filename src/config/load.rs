use std::path::PathBuf;

use crate::bootstrap::AppPaths;
use crate::config::schema::{AppConfig, BackendKind, OutputMode, VisionMode};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub vision_mode: Option<VisionMode>,
    pub clip_length_seconds: Option<f64>,
    pub frame_interval_ms: Option<u64>,
    pub output_mode: Option<OutputMode>,
}

pub fn load_config(paths: &AppPaths, overrides: &CliOverrides) -> AppResult<AppConfig> {
    let config_path = overrides
        .config_path
        .clone()
        .unwrap_or_else(|| paths.config_file.clone());

    let mut config = if config_path.exists() {
        let raw = std::fs::read_to_string(&config_path)?;
        toml::from_str::<AppConfig>(&raw)?
    } else {
        let defaults = AppConfig::default();
        write_default_config(&config_path, &defaults)?;
        defaults
    };

    apply_env_overrides(&mut config);
    apply_cli_overrides(&mut config, overrides);

    validate(&config)?;
    Ok(config)
}

fn write_default_config(path: &PathBuf, defaults: &AppConfig) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(defaults)?;
    std::fs::write(path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(())
}

pub(crate) fn validate(config: &AppConfig) -> AppResult<()> {
    let vision = &config.vision;
    if !(vision.clip_length_seconds.is_finite() && vision.clip_length_seconds > 0.0) {
        return Err(AppError::Config(
            "vision.clip_length_seconds must be > 0".to_owned(),
        ));
    }
    if !(vision.delay_seconds.is_finite() && vision.delay_seconds > 0.0) {
        return Err(AppError::Config(
            "vision.delay_seconds must be > 0".to_owned(),
        ));
    }
    if !(vision.frame_interval_seconds.is_finite() && vision.frame_interval_seconds > 0.0) {
        return Err(AppError::Config(
            "vision.frame_interval_seconds must be > 0".to_owned(),
        ));
    }
    if vision.fps == 0 {
        return Err(AppError::Config("vision.fps must be > 0".to_owned()));
    }
    if !(vision.sampling_ratio > 0.0 && vision.sampling_ratio <= 1.0) {
        return Err(AppError::Config(
            "vision.sampling_ratio must be within (0, 1]".to_owned(),
        ));
    }
    if !(2..=31).contains(&vision.jpeg_quality) {
        return Err(AppError::Config(
            "vision.jpeg_quality must be within 2..=31".to_owned(),
        ));
    }
    if vision.request_timeout_seconds == 0 {
        return Err(AppError::Config(
            "vision.request_timeout_seconds must be > 0".to_owned(),
        ));
    }

    let live = &config.live;
    if live.frame_interval_ms == 0 {
        return Err(AppError::Config(
            "live.frame_interval_ms must be > 0".to_owned(),
        ));
    }
    if !(2..=31).contains(&live.jpeg_quality) {
        return Err(AppError::Config(
            "live.jpeg_quality must be within 2..=31".to_owned(),
        ));
    }
    if live.connect_timeout_seconds == 0 {
        return Err(AppError::Config(
            "live.connect_timeout_seconds must be > 0".to_owned(),
        ));
    }

    Ok(())
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(value) = std::env::var("FRAMECAST_BACKEND") {
        if let Some(parsed) = parse_backend_kind(&value) {
            config.session.backend = parsed;
        }
    }
    if let Ok(value) = std::env::var("FRAMECAST_VISION_ENDPOINT") {
        if !value.trim().is_empty() {
            config.vision.endpoint = value;
        }
    }
    if let Ok(value) = std::env::var("FRAMECAST_VISION_API_KEY") {
        config.vision.api_key = non_empty(value);
    }
    if let Ok(value) = std::env::var("FRAMECAST_VISION_MODEL") {
        if !value.trim().is_empty() {
            config.vision.model = value;
        }
    }
    if let Ok(value) = std::env::var("FRAMECAST_VISION_MODE") {
        if let Some(parsed) = parse_vision_mode(&value) {
            config.vision.mode = parsed;
        }
    }
    if let Ok(value) = std::env::var("FRAMECAST_PROMPT") {
        if !value.trim().is_empty() {
            config.vision.prompt = value.clone();
            config.live.system_instruction = value;
        }
    }
    if let Ok(value) = std::env::var("FRAMECAST_LIVE_ENDPOINT") {
        if !value.trim().is_empty() {
            config.live.endpoint = value;
        }
    }
    if let Ok(value) = std::env::var("FRAMECAST_LIVE_API_KEY") {
        config.live.api_key = non_empty(value);
    }
    if let Ok(value) = std::env::var("FRAMECAST_LIVE_MODEL") {
        if !value.trim().is_empty() {
            config.live.model = value;
        }
    }
    if let Ok(value) = std::env::var("FRAMECAST_FRAME_INTERVAL_MS") {
        if let Ok(parsed) = value.trim().parse::<u64>() {
            config.live.frame_interval_ms = parsed;
        }
    }
    if let Ok(value) = std::env::var("FRAMECAST_OUTPUT_MODE") {
        if let Some(parsed) = parse_output_mode(&value) {
            config.output.mode = parsed;
        }
    }
    if let Ok(value) = std::env::var("FRAMECAST_LOG_LEVEL") {
        config.diagnostics.log_level = value;
    }
}

fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(value) = overrides.backend {
        config.session.backend = value;
    }
    if let Some(value) = &overrides.model {
        match config.session.backend {
            BackendKind::Vision => config.vision.model = value.clone(),
            BackendKind::Live => config.live.model = value.clone(),
        }
    }
    if let Some(value) = &overrides.prompt {
        config.vision.prompt = value.clone();
        config.live.system_instruction = value.clone();
    }
    if let Some(value) = overrides.vision_mode {
        config.vision.mode = value;
    }
    if let Some(value) = overrides.clip_length_seconds {
        config.vision.clip_length_seconds = value;
    }
    if let Some(value) = overrides.frame_interval_ms {
        config.live.frame_interval_ms = value;
    }
    if let Some(value) = overrides.output_mode {
        config.output.mode = value;
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

pub(crate) fn parse_backend_kind(value: &str) -> Option<BackendKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "vision" | "http" => Some(BackendKind::Vision),
        "live" | "websocket" | "ws" => Some(BackendKind::Live),
        _ => None,
    }
}

pub(crate) fn parse_vision_mode(value: &str) -> Option<VisionMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "windowed" | "clip" => Some(VisionMode::Windowed),
        "point" | "frame" => Some(VisionMode::Point),
        _ => None,
    }
}

pub(crate) fn parse_output_mode(value: &str) -> Option<OutputMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "clipboard_only" | "clipboard-only" | "clipboard" => Some(OutputMode::ClipboardOnly),
        "stdout" => Some(OutputMode::Stdout),
        "disabled" | "none" => Some(OutputMode::Disabled),
        _ => None,
    }
}
