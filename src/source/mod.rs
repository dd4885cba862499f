//! Reading type metadata from the documented application's Rust sources.

pub mod conventions;
pub mod index;
pub mod parser;
pub mod scanner;

pub use conventions::Conventions;
pub use index::SourceIndex;
