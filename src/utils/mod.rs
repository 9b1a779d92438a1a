//! Utility modules for common functionality

pub mod text;

pub use text::{LineBuffer, Utf8ChunkDecoder};
