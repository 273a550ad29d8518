//! Schema command implementation.

use super::apply_label_overrides;
use crate::cli::SchemaArgs;
use crate::config::Config;
use crate::error::Result;
use graphbuilder_extractor::{PromptTemplate, TypeSchema};

/// Execute the schema command.
pub fn execute_schema(args: SchemaArgs, config: &Config) -> Result<()> {
    println!("{}", render_schema(&args, config)?);
    Ok(())
}

/// Describe the schema, output contract and optionally the prompt.
pub fn render_schema(args: &SchemaArgs, config: &Config) -> Result<String> {
    let mut transformer_config = config.transformer.clone();
    apply_label_overrides(
        &mut transformer_config,
        args.allowed_nodes.as_deref(),
        args.allowed_relationships.as_deref(),
    );
    transformer_config.validate().map_err(crate::error::CliError::Config)?;

    let schema = TypeSchema::from_config(&transformer_config);
    let mut out = String::new();
    out.push_str(&format!("Node types: {}\n", list_or_any(schema.node_types())));
    out.push_str(&format!(
        "Relationship types: {}\n",
        list_or_any(schema.relationship_types())
    ));

    let contract = schema.output_contract();
    out.push_str(&format!("\nOutput contract '{}':\n", contract.name));
    out.push_str(&serde_json::to_string_pretty(&contract.schema)?);

    if args.prompt {
        let prompt = PromptTemplate::new(
            &schema,
            &transformer_config.examples,
            transformer_config.additional_instructions.as_deref(),
        );
        out.push_str("\n\nSystem prompt:\n");
        out.push_str(prompt.unstructured_system());
    }
    Ok(out)
}

fn list_or_any(labels: &[String]) -> String {
    if labels.is_empty() {
        "(any)".to_string()
    } else {
        labels.join(", ")
    }
}
