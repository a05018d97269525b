use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::load::parse_output_mode;
use crate::config::{BackendKind, CliOverrides, VisionMode};

#[derive(Debug, Parser)]
#[command(name = "framecast")]
#[command(about = "Stream a video to a vision model and collect timestamped descriptions")]
pub struct Cli {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, global = true)]
    pub backend: Option<BackendKind>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub prompt: Option<String>,

    #[arg(long, value_enum, global = true)]
    pub vision_mode: Option<VisionMode>,

    #[arg(long, global = true)]
    pub clip_length_seconds: Option<f64>,

    #[arg(long, global = true)]
    pub frame_interval_ms: Option<u64>,

    /// clipboard_only, stdout or disabled.
    #[arg(long, global = true)]
    pub output_mode: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream VIDEO and print results as they arrive.
    Watch {
        video: PathBuf,
        /// Export and exit once the whole video has been processed.
        #[arg(long)]
        exit_when_done: bool,
    },
    Doctor {
        #[arg(long)]
        json: bool,
    },
    Status,
}

impl Cli {
    pub fn to_overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            backend: self.backend,
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            vision_mode: self.vision_mode,
            clip_length_seconds: self.clip_length_seconds,
            frame_interval_ms: self.frame_interval_ms,
            output_mode: self.output_mode.as_deref().and_then(parse_output_mode),
        }
    }
}
