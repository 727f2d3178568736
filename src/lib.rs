//! Wesley - voice-enabled chat client core and completion relay
//!
//! This library provides:
//! - Conversation history and request payload derivation
//! - Chat orchestration (send, reply, apology, typing and voice state)
//! - Voice input/output adapters over platform speech capabilities
//! - Persisted user settings
//! - A relay server that hides the upstream credential from clients
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Front-ends                        │
//! │     Browser UI   │   Terminal   │   (ChatView impls)  │
//! └────────────────────────┬─────────────────────────────┘
//!                          │
//! ┌────────────────────────▼─────────────────────────────┐
//! │                  ChatOrchestrator                     │
//! │  History  │  Settings  │  VoiceInput  │  VoiceOutput  │
//! └────────────────────────┬─────────────────────────────┘
//!                          │ CompletionClient
//!              ┌───────────┴────────────┐
//! ┌────────────▼───────────┐   ┌────────▼─────────────────┐
//! │  Relay (/api/chat)     │──►│  Upstream completion API  │
//! └────────────────────────┘   └──────────────────────────┘
//! ```

pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod persona;
pub mod relay;
pub mod settings;
pub mod terminal;
pub mod voice;

pub use completion::{ChatMessage, CompletionClient, Endpoint, HttpCompletionClient, Role};
pub use config::{ClientConfig, RelayConfig};
pub use conversation::{ConversationHistory, Message, Sender};
pub use error::{Error, Result};
pub use orchestrator::{ChatOrchestrator, ChatState, ChatView};
pub use persona::Persona;
pub use relay::RelayServer;
pub use settings::{Settings, SettingsStore};
