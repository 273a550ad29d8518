//! GraphBuilder Extractor
//!
//! Extracts knowledge graphs (typed entities and typed relationships) from
//! unstructured text with an LLM.
//!
//! # Overview
//!
//! A [`GraphTransformer`] is built once from a [`TransformerConfig`] and a
//! [`LanguageModel`](graphbuilder_domain::LanguageModel). At construction it
//! builds the [`TypeSchema`] from the allowed labels, probes the model for
//! structured-output support and fixes the [`ExtractionMode`]. Every document
//! then goes through the same path.
//!
//! # Architecture
//!
//! ```text
//! Document → PromptTemplate → LLM → decode/repair → normalize → strict filter → GraphDocument
//! ```
//!
//! # Key Features
//!
//! - **Dual strategy**: schema-bound structured output when the model has
//!   it, prompt-driven triples with JSON repair when it does not
//! - **Normalization**: title-cased node types, upper-snake-case
//!   relationship types, camel-cased property keys
//! - **Strict mode**: drops anything outside the allowed types
//! - **Failure isolation**: a failed document becomes an empty, degraded
//!   graph document; batches always return one result per input
//! - **Chunking**: word windows with overlap for large documents
//!
//! # Example Usage
//!
//! ```
//! use graphbuilder_domain::Document;
//! use graphbuilder_extractor::{GraphTransformer, TransformerConfig};
//! use graphbuilder_llm::MockProvider;
//!
//! # tokio_test::block_on(async {
//! let llm = MockProvider::new(
//!     r#"[{"head": "Alice", "head_type": "Person", "relation": "WORKS_FOR",
//!          "tail": "Acme", "tail_type": "Company"}]"#,
//! );
//! let config = TransformerConfig::strict(
//!     vec!["Person".to_string(), "Company".to_string()],
//!     vec!["WORKS_FOR".to_string()],
//! );
//! let transformer = GraphTransformer::new(llm, config).unwrap();
//!
//! let graphs = transformer
//!     .convert(vec![Document::new("Alice works at Acme Corp.")])
//!     .await;
//!
//! assert_eq!(graphs[0].nodes.len(), 2);
//! assert_eq!(graphs[0].relationships[0].rel_type, "WORKS_FOR");
//! # });
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod error;
mod filter;
mod normalize;
mod prompt;
mod repair;
mod schema;
mod strategy;
mod transformer;

#[cfg(test)]
mod tests;

pub use chunking::{chunk_id, combine_chunks, TextChunker};
pub use config::{parse_label_list, ChunkingConfig, FewShotExample, NodeProperties, TransformerConfig};
pub use error::ExtractorError;
pub use filter::apply_strict_mode;
pub use normalize::{normalize_graph, normalize_triples, to_payload, NormalizedGraph};
pub use prompt::{default_examples, PromptTemplate};
pub use repair::{decode_json, decode_response, repair_json};
pub use schema::{PropertyPolicy, TypeSchema, CONTRACT_NAME};
pub use strategy::{select_mode, ExtractionMode};
pub use transformer::GraphTransformer;
