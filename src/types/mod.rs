//! Core types for turnkit.

pub mod message;
pub mod stream;

pub use message::*;
pub use stream::*;
