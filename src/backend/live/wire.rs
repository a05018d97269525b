use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::LiveConfig;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Setup {
    model: String,
    generation_config: GenerationConfig,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_audio_transcription: Option<Empty>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct Empty {}

impl SetupMessage {
    pub fn from_config(config: &LiveConfig) -> Self {
        let modality = config.response_modality.trim().to_ascii_uppercase();
        // Audio replies only carry text through the transcription side channel.
        let output_audio_transcription = (modality == "AUDIO").then_some(Empty {});
        Self {
            setup: Setup {
                model: config.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec![modality],
                },
                system_instruction: Content {
                    parts: vec![TextPart {
                        text: config.system_instruction.clone(),
                    }],
                },
                output_audio_transcription,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInput {
    media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaChunk {
    mime_type: String,
    data: String,
}

impl RealtimeInputMessage {
    pub fn jpeg(frame: &[u8]) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: "image/jpeg".to_owned(),
                    data: STANDARD.encode(frame),
                }],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    setup_complete: Option<serde_json::Value>,
    server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<ModelTurn>,
    output_transcription: Option<Transcription>,
}

#[derive(Debug, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<ModelPart>,
}

#[derive(Debug, Deserialize)]
struct ModelPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Transcription {
    text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveInbound {
    SetupComplete,
    Text(String),
    Other,
}

pub fn parse_inbound(raw: &str) -> AppResult<LiveInbound> {
    let message: ServerMessage = serde_json::from_str(raw)?;

    if message.setup_complete.is_some() {
        return Ok(LiveInbound::SetupComplete);
    }

    let Some(content) = message.server_content else {
        return Ok(LiveInbound::Other);
    };

    if let Some(text) = content
        .output_transcription
        .and_then(|transcription| transcription.text)
        .filter(|text| !text.is_empty())
    {
        return Ok(LiveInbound::Text(text));
    }

    let text: String = content
        .model_turn
        .map(|turn| {
            turn.parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.is_empty() {
        Ok(LiveInbound::Other)
    } else {
        Ok(LiveInbound::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_inbound, LiveInbound, RealtimeInputMessage, SetupMessage};
    use crate::config::LiveConfig;
    use crate::error::AppError;
    use serde_json::Value;

    #[test]
    fn setup_message_carries_model_modality_and_instruction() {
        let config = LiveConfig {
            model: "models/test-live".to_owned(),
            system_instruction: "narrate".to_owned(),
            response_modality: "text".to_owned(),
            ..LiveConfig::default()
        };
        let value = serde_json::to_value(SetupMessage::from_config(&config)).expect("serialize");

        assert_eq!(
            value.pointer("/setup/model").and_then(Value::as_str),
            Some("models/test-live")
        );
        assert_eq!(
            value
                .pointer("/setup/generationConfig/responseModalities/0")
                .and_then(Value::as_str),
            Some("TEXT")
        );
        assert_eq!(
            value
                .pointer("/setup/systemInstruction/parts/0/text")
                .and_then(Value::as_str),
            Some("narrate")
        );
        assert!(value.pointer("/setup/outputAudioTranscription").is_none());
    }

    #[test]
    fn audio_modality_requests_transcription() {
        let config = LiveConfig {
            response_modality: "AUDIO".to_owned(),
            ..LiveConfig::default()
        };
        let value = serde_json::to_value(SetupMessage::from_config(&config)).expect("serialize");
        assert!(value
            .pointer("/setup/outputAudioTranscription")
            .is_some_and(Value::is_object));
    }

    #[test]
    fn realtime_input_base64_encodes_jpeg() {
        let value =
            serde_json::to_value(RealtimeInputMessage::jpeg(b"\xff\xd8jpeg")).expect("serialize");
        assert_eq!(
            value
                .pointer("/realtimeInput/mediaChunks/0/mimeType")
                .and_then(Value::as_str),
            Some("image/jpeg")
        );
        assert_eq!(
            value
                .pointer("/realtimeInput/mediaChunks/0/data")
                .and_then(Value::as_str),
            Some("/9hqcGVn")
        );
    }

    #[test]
    fn inbound_setup_complete_is_recognised() {
        assert_eq!(
            parse_inbound(r#"{"setupComplete":{}}"#).expect("parse"),
            LiveInbound::SetupComplete
        );
    }

    #[test]
    fn inbound_model_turn_parts_are_joined() {
        let raw = r#"{"serverContent":{"modelTurn":{"parts":[{"text":"a cyclist "},{"inlineData":{}},{"text":"turns left"}]}}}"#;
        assert_eq!(
            parse_inbound(raw).expect("parse"),
            LiveInbound::Text("a cyclist turns left".to_owned())
        );
    }

    #[test]
    fn inbound_transcription_wins_over_model_turn() {
        let raw = r#"{"serverContent":{"outputTranscription":{"text":"spoken"},"modelTurn":{"parts":[{"text":"written"}]}}}"#;
        assert_eq!(
            parse_inbound(raw).expect("parse"),
            LiveInbound::Text("spoken".to_owned())
        );
    }

    #[test]
    fn inbound_turn_complete_without_text_is_other() {
        assert_eq!(
            parse_inbound(r#"{"serverContent":{"turnComplete":true}}"#).expect("parse"),
            LiveInbound::Other
        );
        assert_eq!(
            parse_inbound(r#"{"usageMetadata":{"totalTokenCount":12}}"#).expect("parse"),
            LiveInbound::Other
        );
    }

    #[test]
    fn inbound_garbage_is_a_json_error() {
        assert!(matches!(parse_inbound("not json"), Err(AppError::Json(_))));
    }
}
