//! Data models for the inbound chat endpoint and the upstream Gemini API.
//!
//! This module groups two submodules:
//! - `chat`: What the website sends to the relay and what it gets back.
//! - `gemini`: A minimal yet robust subset of the Gemini `generateContent` and
//!   `models` listing schemas.
//!
//! The mapping logic between them lives in `crate::conversion`.

pub mod chat;
pub mod gemini;

pub use chat::{ChatReply, ChatRequest, HistoryTurn, Role};
pub use gemini::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ModelDescriptor,
    Part,
};
