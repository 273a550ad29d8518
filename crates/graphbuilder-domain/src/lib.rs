//! GraphBuilder Domain Layer
//!
//! This crate contains the data model shared by every other GraphBuilder
//! crate and the trait boundary to the language model. It holds no
//! extraction logic and performs no I/O.
//!
//! ## Key Concepts
//!
//! - **Document**: page text plus arbitrary metadata handed to the engine
//! - **Node**: a typed, identified entity extracted from text
//! - **Relationship**: a typed directed edge between two node references
//! - **GraphDocument**: the per-document bundle of nodes and relationships,
//!   together with an [`ExtractionOutcome`] telling whether the model output
//!   could be used at all
//! - **LanguageModel**: the opaque capability that turns chat messages into
//!   text or schema-shaped output
//!
//! ## Architecture
//!
//! - Pure data and label normalization only
//! - Infrastructure implementations (model providers) live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod label;
pub mod node;
pub mod relationship;
pub mod traits;

// Re-exports for convenience
pub use document::{Document, ExtractionOutcome, FailureKind, GraphDocument};
pub use node::{Node, NodeRef};
pub use relationship::Relationship;
pub use traits::{ChatMessage, LanguageModel, OutputContract, Role, StructuredResponse};
