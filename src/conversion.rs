use crate::models::chat::{ChatRequest, HistoryTurn, Role};
use crate::models::gemini::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};
use crate::system_prompt_config::SystemInstructionMode;
use serde_json::Value;

/// Nucleus sampling cutoff sent with every generation call.
pub const TOP_P: f64 = 0.9;
/// Top-k sampling cutoff sent with every generation call.
pub const TOP_K: u32 = 40;
/// Output length cap sent with every generation call.
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Reply used when the first candidate carries no text.
pub const FALLBACK_REPLY: &str = "Mình chưa có dữ liệu phù hợp.";

/// System instruction plus how to inject it.
#[derive(Debug, Clone, Copy)]
pub struct Instruction<'a> {
    pub prompt: &'a str,
    pub acknowledgement: &'a str,
    pub mode: SystemInstructionMode,
}

/// Map inbound history into canonical turns.
///
/// - role: "model" stays "model"; anything else (missing, "assistant", typos) becomes "user".
/// - text: first non-empty of `parts[0].text` and `text`.
/// - turns with no text are dropped; order is preserved.
///
/// A non-array value yields no turns.
pub fn normalize_history(v: &Value) -> Vec<HistoryTurn> {
    let arr = match v.as_array() {
        Some(a) => a,
        None => return Vec::new(),
    };

    arr.iter()
        .filter_map(|turn| {
            let role = Role::from_wire(turn.get("role").and_then(|r| r.as_str()));
            let text = turn_text(turn)?;
            Some(HistoryTurn {
                role,
                text: text.to_string(),
            })
        })
        .collect()
}

fn turn_text(turn: &Value) -> Option<&str> {
    let from_parts = turn
        .get("parts")
        .and_then(|p| p.as_array())
        .and_then(|p| p.first())
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str());
    let flat = turn.get("text").and_then(|t| t.as_str());

    [from_parts, flat]
        .into_iter()
        .flatten()
        .find(|t| !t.is_empty())
}

/// Build the `generateContent` body for a chat request.
///
/// Turn order:
/// - system instruction (turn pair or `systemInstruction` field, per `instruction.mode`)
/// - normalized history
/// - the current message as the final user turn
pub fn build_generate_request(
    req: &ChatRequest,
    instruction: Instruction<'_>,
) -> GenerateContentRequest {
    let mut contents: Vec<Content> = Vec::with_capacity(req.history.len() + 3);
    let mut system_instruction = None;

    match instruction.mode {
        SystemInstructionMode::TurnPair => {
            contents.push(Content::turn(Role::User, instruction.prompt));
            contents.push(Content::turn(Role::Model, instruction.acknowledgement));
        }
        SystemInstructionMode::Field => {
            system_instruction = Some(Content::instruction(instruction.prompt));
        }
    }

    contents.extend(
        req.history
            .iter()
            .filter(|t| !t.text.is_empty())
            .map(|t| Content::turn(t.role, t.text.clone())),
    );
    contents.push(Content::turn(Role::User, req.message.clone()));

    GenerateContentRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            temperature: req.temperature,
            top_p: TOP_P,
            top_k: TOP_K,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// Join the first candidate's text parts with newlines and trim.
/// Falls back to [`FALLBACK_REPLY`] when nothing is left.
pub fn extract_reply(resp: &GenerateContentResponse) -> String {
    let joined = resp
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let trimmed = joined.trim();
    if trimmed.is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        trimmed.to_string()
    }
}
