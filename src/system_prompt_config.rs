use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Built-in culinary assistant instruction for the review site.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
Bạn là trợ lý ẩm thực Việt Nam (ưu tiên Hà Nội) cho website review \"Tinh Hoa Hương Vị Việt\".
- Gợi ý 3–5 quán phù hợp. Mỗi quán: Tên • Địa chỉ ngắn • Giờ mở cửa • Giá tham khảo • Điểm nổi bật (1 câu) • Mẹo nhỏ.
- Ngắn gọn, không văn vẻ. Tôn trọng ràng buộc (khu vực/giờ/ngân sách/món).
- Không bịa số liệu; dùng \"khoảng/tham khảo\" khi cần. Trả lời tiếng Việt, thân thiện.";

/// Model turn that follows the instruction when it is injected as a turn pair.
pub const DEFAULT_ACKNOWLEDGEMENT: &str = "Đã nhận hướng dẫn.";

/// How the system instruction reaches the upstream model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemInstructionMode {
    /// Leading user turn with the prompt, then a model acknowledgement turn.
    TurnPair,
    /// Dedicated `systemInstruction` request field.
    Field,
}

impl SystemInstructionMode {
    /// `v1beta` understands `systemInstruction`; `v1` and anything unknown get the turn pair.
    pub fn for_api_version(version: &str) -> Self {
        if version.trim().eq_ignore_ascii_case("v1beta") {
            SystemInstructionMode::Field
        } else {
            SystemInstructionMode::TurnPair
        }
    }

    /// Parse "turn_pair" | "turn-pair" | "field" (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "turn_pair" | "turn-pair" | "turns" => Some(SystemInstructionMode::TurnPair),
            "field" | "system_instruction" => Some(SystemInstructionMode::Field),
            _ => None,
        }
    }
}

/// System prompt configuration loaded from a JSON file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SystemPromptConfig {
    /// Instruction text; the built-in prompt is used when absent
    #[serde(default)]
    pub prompt: Option<String>,

    /// Model acknowledgement turn for `turn_pair` injection
    #[serde(default)]
    pub acknowledgement: Option<String>,

    /// Forces an injection mode regardless of API version
    #[serde(default)]
    pub injection_mode: Option<SystemInstructionMode>,
}

impl SystemPromptConfig {
    /// Load system prompt configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read system prompt config file: {}",
                path.as_ref().display()
            )
        })?;

        let config: SystemPromptConfig = serde_json::from_str(&content)
            .with_context(|| "Failed to parse system prompt config JSON")?;

        Ok(config)
    }

    /// Instruction sent with every request; a blank override keeps the built-in prompt.
    pub fn get_prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn acknowledgement(&self) -> &str {
        self.acknowledgement
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(DEFAULT_ACKNOWLEDGEMENT)
    }
}
