pub mod logging;

pub use logging::{truncate_chars, truncate_text};
