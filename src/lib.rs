#![forbid(unsafe_code)]
#![doc = r#"
Huongvi Relay

Chat relay for the "Tinh Hoa Hương Vị Việt" restaurant-review site. Accepts a chat
message plus prior turns from the browser, picks a generation-capable Gemini model,
forwards the conversation and returns `{ reply, modelUsed }` or the provider's error
verbatim.

Modules
- `models`: Inbound chat shapes and the Gemini wire subset.
- `conversion`: History normalization, request construction, reply extraction.
- `selection`: Model ranking policy and the shared selection cache.
- `upstream`: Provider trait and the Gemini REST client.
- `relay`: One chat invocation end to end.
- `server`: Axum router/handlers (the binary uses this).
- `util`: Env configuration, tracing, HTTP client, shared state.
"#]

pub mod conversion;
pub mod error;
pub mod models;
pub mod relay;
pub mod selection;
pub mod server;
pub mod system_prompt_config;
pub mod upstream;
pub mod util;

pub use crate::error::RelayError;
pub use crate::relay::Relay;
pub use crate::selection::{select_model, ModelCache};
pub use crate::upstream::{GeminiClient, GenerativeProvider};

// Re-export model namespaces for convenience (downstream users can do `use huongvi_relay::chat`).
pub use crate::models::{chat, gemini};
