pub mod ffmpeg;

pub use ffmpeg::MediaTool;
