//! Core GraphTransformer implementation

use crate::config::TransformerConfig;
use crate::error::ExtractorError;
use crate::filter::apply_strict_mode;
use crate::normalize::{normalize_graph, normalize_triples, NormalizedGraph};
use crate::prompt::PromptTemplate;
use crate::repair::{decode_json, decode_response};
use crate::schema::TypeSchema;
use crate::strategy::{select_mode, ExtractionMode};
use futures::stream::{FuturesUnordered, StreamExt};
use graphbuilder_domain::{Document, FailureKind, GraphDocument, LanguageModel, OutputContract};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The GraphTransformer converts documents into graph documents
///
/// Everything it holds is read-only after construction, so one instance
/// can serve any number of documents, sequentially or concurrently.
pub struct GraphTransformer<M>
where
    M: LanguageModel,
{
    model: Arc<M>,
    schema: TypeSchema,
    prompt: PromptTemplate,
    contract: OutputContract,
    mode: ExtractionMode,
    strict_mode: bool,
    materialize_endpoints: bool,
}

impl<M> GraphTransformer<M>
where
    M: LanguageModel,
{
    /// Create a new GraphTransformer
    ///
    /// Validates the configuration, probes the model for structured-output
    /// support and fixes the extraction mode for the lifetime of the
    /// transformer. Fails with [`ExtractorError::Config`] when the
    /// configuration is invalid or asks for property extraction from a model
    /// without structured output.
    pub fn new(model: M, config: TransformerConfig) -> Result<Self, ExtractorError> {
        Self::with_shared_model(Arc::new(model), config)
    }

    /// Create a GraphTransformer around a model shared with other owners
    pub fn with_shared_model(model: Arc<M>, config: TransformerConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        let requested = TypeSchema::from_config(&config);
        let supports_native = model.supports_structured_output();
        let (mode, schema) = select_mode(supports_native, config.use_function_call, &requested)?;

        let prompt = PromptTemplate::new(
            &schema,
            &config.examples,
            config.additional_instructions.as_deref(),
        );
        let contract = schema.output_contract();

        info!(
            model = model.model_name(),
            mode = %mode,
            node_types = schema.node_types().len(),
            relationship_types = schema.relationship_types().len(),
            strict_mode = config.strict_mode,
            "Graph transformer ready"
        );

        Ok(Self {
            model,
            schema,
            prompt,
            contract,
            mode,
            strict_mode: config.strict_mode,
            materialize_endpoints: config.materialize_endpoints,
        })
    }

    /// Extraction mode chosen at construction
    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// Schema in effect
    pub fn schema(&self) -> &TypeSchema {
        &self.schema
    }

    /// Underlying model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Extract a graph from one document
    ///
    /// Never fails: a failed model call or undecodable output yields an
    /// empty graph document marked as degraded.
    pub async fn process_document(&self, document: Document) -> GraphDocument {
        if document.text.trim().is_empty() {
            debug!("Document has no text; skipping model call");
            return GraphDocument::complete(document, Vec::new(), Vec::new());
        }

        let start_time = Instant::now();
        info!(text_len = document.text.len(), mode = %self.mode, "Starting extraction");

        match self.extract(&document.text).await {
            Ok(graph) => {
                let graph = if self.strict_mode {
                    apply_strict_mode(graph, &self.schema)
                } else {
                    graph
                };
                info!(
                    nodes = graph.nodes.len(),
                    relationships = graph.relationships.len(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Extraction complete"
                );
                GraphDocument::complete(document, graph.nodes, graph.relationships)
            }
            Err(e) => {
                let failure = match e {
                    ExtractorError::Llm(_) => FailureKind::Transport,
                    _ => FailureKind::Decode,
                };
                warn!(%failure, error = %e, "Extraction failed; returning empty graph");
                GraphDocument::degraded(document, failure, e.to_string())
            }
        }
    }

    async fn extract(&self, text: &str) -> Result<NormalizedGraph, ExtractorError> {
        match self.mode {
            ExtractionMode::NativeStructured => {
                let messages = self.prompt.render_native(text);
                let response = self
                    .model
                    .generate_structured(&messages, &self.contract)
                    .await
                    .map_err(|e| ExtractorError::Llm(e.to_string()))?;
                let payload = decode_response(response)?;
                normalize_graph(&payload, &self.schema, self.materialize_endpoints)
            }
            ExtractionMode::UnstructuredWithRepair => {
                let messages = self.prompt.render(text);
                debug!(
                    prompt_len = messages.iter().map(|m| m.content.len()).sum::<usize>(),
                    "Calling model"
                );
                let response = self
                    .model
                    .generate(&messages)
                    .await
                    .map_err(|e| ExtractorError::Llm(e.to_string()))?;
                debug!(response_len = response.len(), "Model responded");
                let payload = decode_json(&response)?;
                normalize_triples(&payload, &self.schema)
            }
        }
    }

    /// Process documents one after another
    ///
    /// The result has one entry per input document, in input order.
    pub async fn convert(&self, documents: Vec<Document>) -> Vec<GraphDocument> {
        info!(documents = documents.len(), "Converting documents sequentially");
        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            results.push(self.process_document(document).await);
        }
        log_summary(&results);
        results
    }

    /// Blocking variant of [`GraphTransformer::convert`] for callers without
    /// an async runtime
    ///
    /// Must not be called from within a Tokio runtime.
    pub fn convert_blocking(&self, documents: Vec<Document>) -> Result<Vec<GraphDocument>, ExtractorError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ExtractorError::Runtime(e.to_string()))?;
        Ok(runtime.block_on(self.convert(documents)))
    }

    /// Process all documents at once
    ///
    /// One extraction future per document, with no concurrency cap; they
    /// overlap while awaiting the model. Each result is tagged with its
    /// input index and stored in a pre-sized slot, so the output order
    /// matches the input order whatever order the calls finish in.
    pub async fn convert_concurrent(&self, documents: Vec<Document>) -> Vec<GraphDocument> {
        let total = documents.len();
        info!(documents = total, "Converting documents concurrently");

        let mut slots: Vec<Option<GraphDocument>> = vec![None; total];
        let mut pending: FuturesUnordered<_> = documents
            .into_iter()
            .enumerate()
            .map(|(index, document)| async move { (index, self.process_document(document).await) })
            .collect();

        while let Some((index, graph)) = pending.next().await {
            debug!(index, "Document finished");
            slots[index] = Some(graph);
        }

        let results: Vec<GraphDocument> = slots.into_iter().flatten().collect();
        log_summary(&results);
        results
    }
}

fn log_summary(results: &[GraphDocument]) {
    let degraded = results.iter().filter(|doc| doc.is_degraded()).count();
    let nodes: usize = results.iter().map(|doc| doc.nodes.len()).sum();
    let relationships: usize = results.iter().map(|doc| doc.relationships.len()).sum();
    info!(
        documents = results.len(),
        degraded,
        nodes,
        relationships,
        "Conversion finished"
    );
}
