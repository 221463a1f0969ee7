pub mod image_client;
pub mod llm_client;

pub use image_client::{GeminiImageClient, ImageGenerator};
pub use llm_client::{LlmClient, TextGenerator};
