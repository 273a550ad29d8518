//! Extract command implementation.

use super::apply_label_overrides;
use crate::cli::ExtractArgs;
use crate::config::{Config, Provider};
use crate::error::{CliError, Result};
use crate::output::{graphs_json, Formatter};
use graphbuilder_domain::{Document, GraphDocument, LanguageModel};
use graphbuilder_extractor::{combine_chunks, ChunkingConfig, GraphTransformer, TextChunker};
use graphbuilder_llm::{OllamaProvider, OpenAiProvider};
use std::fs;
use std::io::{self, Read};
use std::time::Duration;
use tracing::info;

/// Execute the extract command.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let model = &config.model;
    let timeout = Duration::from_secs(model.timeout_secs);

    let graphs = match model.provider {
        Provider::Ollama => {
            let llm = OllamaProvider::new(&model.endpoint, &model.model)
                .with_timeout(timeout)
                .with_max_retries(model.max_retries)
                .with_structured_output(model.structured_output);
            run_extraction(llm, &args, config).await?
        }
        Provider::OpenAi => {
            let mut llm = OpenAiProvider::new(&model.endpoint, &model.model)
                .with_timeout(timeout)
                .with_max_retries(model.max_retries)
                .with_function_calling(model.structured_output);
            if let Some(key) = config.api_key()? {
                llm = llm.with_api_key(key);
            }
            run_extraction(llm, &args, config).await?
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, graphs_json(&graphs)?)?;
            eprintln!("{}", formatter.success(&format!("Wrote {}", path.display())));
        }
        None => println!("{}", formatter.format_graphs(&graphs)?),
    }
    eprintln!("{}", formatter.batch_summary(&graphs));

    Ok(())
}

/// Load the inputs and run them through a transformer over `model`.
pub async fn run_extraction<M>(model: M, args: &ExtractArgs, config: &Config) -> Result<Vec<GraphDocument>>
where
    M: LanguageModel,
{
    let mut transformer_config = config.transformer.clone();
    apply_label_overrides(
        &mut transformer_config,
        args.allowed_nodes.as_deref(),
        args.allowed_relationships.as_deref(),
    );
    if args.no_strict {
        transformer_config.strict_mode = false;
    }

    let transformer = GraphTransformer::new(model, transformer_config)?;
    let documents = load_documents(args, &config.chunking)?;
    info!(documents = documents.len(), mode = %transformer.mode(), "Inputs loaded");

    let graphs = if args.sequential || !config.settings.concurrent {
        transformer.convert(documents).await
    } else {
        transformer.convert_concurrent(documents).await
    };
    Ok(graphs)
}

/// Read every input into documents tagged with their `source`.
///
/// With chunking on, each file is split into word windows and every
/// `chunks_to_combine` windows are merged into one document carrying its
/// 1-based `position` within the file.
pub fn load_documents(args: &ExtractArgs, chunking: &ChunkingConfig) -> Result<Vec<Document>> {
    let mut inputs = Vec::new();
    if args.stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        inputs.push(Document::new(buffer).with_metadata("source", "<stdin>"));
    }
    for path in &args.files {
        let text = fs::read_to_string(path)?;
        inputs.push(Document::new(text).with_metadata("source", path.display().to_string()));
    }

    if inputs.is_empty() {
        return Err(CliError::InvalidInput(
            "Must specify input files or --stdin".to_string(),
        ));
    }

    if !args.chunk {
        return Ok(inputs);
    }

    let chunker = TextChunker::new(chunking.clone());
    let mut documents = Vec::new();
    for input in inputs {
        let chunks = chunker.split(&input);
        let combined = combine_chunks(&chunks, chunking.chunks_to_combine);
        for (index, mut document) in combined.into_iter().enumerate() {
            if let Some(source) = input.metadata.get("source") {
                document.metadata.insert("source".to_string(), source.clone());
            }
            documents.push(document.with_metadata("position", index + 1));
        }
    }
    Ok(documents)
}
