use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary `{binary}` missing from PATH")]
    BinaryMissing { binary: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("media tooling failed: {0}")]
    Media(String),

    #[error("backend failed: {0}")]
    Backend(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("clipboard output failed: {0}")]
    Clipboard(String),

    #[error("controller error: {0}")]
    Controller(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;
    use serde::ser::Error as _;

    #[test]
    fn display_messages_cover_all_variants() {
        let cases = vec![
            (
                AppError::Io(std::io::Error::other("disk gone")),
                "io error: disk gone",
            ),
            (
                AppError::TomlParse(toml::from_str::<toml::Value>("not= [valid").unwrap_err()),
                "toml parse error: ",
            ),
            (
                AppError::TomlSerialize(toml::ser::Error::custom("serialize failed")),
                "toml serialize error: serialize failed",
            ),
            (
                AppError::Json(serde_json::from_str::<serde_json::Value>("{bad").unwrap_err()),
                "json parse error: ",
            ),
            (
                AppError::BinaryMissing {
                    binary: "ffprobe".to_owned(),
                },
                "binary `ffprobe` missing from PATH",
            ),
            (
                AppError::Config("bad config".to_owned()),
                "invalid configuration: bad config",
            ),
            (
                AppError::Media("no video stream".to_owned()),
                "media tooling failed: no video stream",
            ),
            (
                AppError::Backend("503".to_owned()),
                "backend failed: 503",
            ),
            (
                AppError::Session("already running".to_owned()),
                "session error: already running",
            ),
            (
                AppError::Clipboard("clipboard dead".to_owned()),
                "clipboard output failed: clipboard dead",
            ),
            (
                AppError::Controller("controller dead".to_owned()),
                "controller error: controller dead",
            ),
            (
                AppError::ChannelClosed("closed".to_owned()),
                "channel closed: closed",
            ),
            (
                AppError::WebSocket(tokio_tungstenite::tungstenite::Error::ConnectionClosed),
                "websocket error: ",
            ),
        ];

        for (error, expected_prefix) in cases {
            let display = format!("{error}");
            let debug = format!("{error:?}");
            assert!(
                display.starts_with(expected_prefix),
                "display message `{display}` did not start with `{expected_prefix}`"
            );
            assert!(!display.trim().is_empty());
            assert!(!debug.trim().is_empty());
        }
    }
}
