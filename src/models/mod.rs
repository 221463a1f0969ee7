pub mod generation;
pub mod request;
pub mod script;
pub mod visual;

pub use generation::{AgentLogEntry, AgentLogStatus, GenerationRecord, GenerationStatus};
pub use request::GenerationRequest;
pub use script::{CharacterProfile, CharacterRegistry, DialogueLine, Scene};
pub use visual::{PromptKind, RenderedPanel, VisualPrompt};
