//! Memory store implementations for Kangae.
//!
//! Both stores keep the same ordered [`MessageLog`] and the same JSON file
//! format; they differ only in how `search` ranks messages.

pub mod conversation;
pub mod log;
pub mod vector;

pub use conversation::ConversationMemory;
pub use log::MessageLog;
pub use vector::{VectorMemory, cosine_similarity, tfidf_rank};
