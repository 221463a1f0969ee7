pub mod embedding;
pub mod store;

pub use embedding::LocalEmbedding;
pub use store::{
    CharacterTemplate, ContentStore, ContentType, GenerationPattern, SimilarContent,
    SqliteStore, StatusUpdate, SNAPSHOT_MAX_CHARS,
};
