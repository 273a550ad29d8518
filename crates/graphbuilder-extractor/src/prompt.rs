//! LLM prompt engineering for graph extraction

use crate::config::FewShotExample;
use crate::schema::{PropertyPolicy, TypeSchema};
use graphbuilder_domain::ChatMessage;

/// Prompt template built once per transformer
///
/// The system messages depend only on the schema, the examples and the
/// extra instructions, so they are rendered at construction. The input text
/// is substituted per call by [`PromptTemplate::render`] and
/// [`PromptTemplate::render_native`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    unstructured_system: String,
    native_system: String,
    format_instructions: String,
}

impl PromptTemplate {
    /// Build the template
    ///
    /// When `examples` is empty the built-in example set is used.
    pub fn new(
        schema: &TypeSchema,
        examples: &[FewShotExample],
        additional_instructions: Option<&str>,
    ) -> Self {
        let type_clauses = type_clauses(schema);
        let extra = additional_instructions
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut unstructured_system = String::new();
        unstructured_system.push_str(SYSTEM_PREAMBLE);
        unstructured_system.push_str("\n\n");
        unstructured_system.push_str(LABELING_RULES);
        unstructured_system.push_str("\n\n");
        if !type_clauses.is_empty() {
            unstructured_system.push_str(&type_clauses);
            unstructured_system.push('\n');
        }
        unstructured_system.push_str(&examples_clause(examples));
        unstructured_system.push('\n');
        unstructured_system.push_str(STRICT_COMPLIANCE);
        if let Some(extra) = extra {
            unstructured_system.push_str("\n\n");
            unstructured_system.push_str(extra);
        }

        let mut native_system = String::new();
        native_system.push_str(SYSTEM_PREAMBLE);
        native_system.push_str("\n\n");
        native_system.push_str(LABELING_RULES);
        if !type_clauses.is_empty() {
            native_system.push_str("\n\n");
            native_system.push_str(type_clauses.trim_end());
        }
        native_system.push_str("\n\n");
        native_system.push_str(STRICT_COMPLIANCE);
        if let Some(extra) = extra {
            native_system.push_str("\n\n");
            native_system.push_str(extra);
        }

        Self {
            unstructured_system,
            native_system,
            format_instructions: format_instructions(schema),
        }
    }

    /// Messages for the free-text path
    pub fn render(&self, text: &str) -> Vec<ChatMessage> {
        let mut human = String::new();
        human.push_str(&self.format_instructions);
        human.push_str("\n\n");
        human.push_str(
            "Based on the instructions and examples above, extract entities and \
             relationships from the following text.\n",
        );
        human.push_str("Text to analyze:\n---\n");
        human.push_str(text);
        human.push_str("\n---\n\n");
        human.push_str(OUTPUT_REMINDER);

        vec![
            ChatMessage::system(self.unstructured_system.clone()),
            ChatMessage::user(human),
        ]
    }

    /// Messages for the structured-output path
    pub fn render_native(&self, text: &str) -> Vec<ChatMessage> {
        let human = format!(
            "Tip: Make sure to answer in the correct format and do not include any \
             explanations. Use the given format to extract information from the \
             following input: {}",
            text
        );
        vec![
            ChatMessage::system(self.native_system.clone()),
            ChatMessage::user(human),
        ]
    }

    /// System prompt used on the free-text path
    pub fn unstructured_system(&self) -> &str {
        &self.unstructured_system
    }

    /// System prompt used on the structured-output path
    pub fn native_system(&self) -> &str {
        &self.native_system
    }
}

/// Allowed-type clauses; each is omitted when its list is empty
fn type_clauses(schema: &TypeSchema) -> String {
    let mut clauses = String::new();
    if !schema.node_types().is_empty() {
        clauses.push_str(&format!(
            "The \"head_type\" and \"tail_type\" keys must contain one of the allowed node types: {}\n",
            quoted_list(schema.node_types())
        ));
    }
    if !schema.relationship_types().is_empty() {
        clauses.push_str(&format!(
            "The \"relation\" key must contain one of the allowed relationship types: {}\n",
            quoted_list(schema.relationship_types())
        ));
    }
    clauses
}

fn examples_clause(examples: &[FewShotExample]) -> String {
    let builtin;
    let examples = if examples.is_empty() {
        builtin = default_examples();
        builtin.as_slice()
    } else {
        examples
    };

    let mut clause = String::from(
        "Below are a number of examples of text and the entities and relationships extracted from it:\n",
    );
    for example in examples {
        clause.push_str(&format!(
            "- text: \"{}\" => {{\"head\": \"{}\", \"head_type\": \"{}\", \"relation\": \"{}\", \"tail\": \"{}\", \"tail_type\": \"{}\"}}\n",
            example.text,
            example.head,
            example.head_type,
            example.relation,
            example.tail,
            example.tail_type
        ));
    }
    clause
}

fn format_instructions(schema: &TypeSchema) -> String {
    let mut out = String::from(
        "Output format (a JSON array only, no additional text). Each element must have these keys:\n\
         - \"head\": extracted head entity, the most complete identifier found in the text\n\
         - \"head_type\": type of the head entity\n\
         - \"relation\": type of relation between the head and the tail\n\
         - \"tail\": extracted tail entity\n\
         - \"tail_type\": type of the tail entity\n",
    );
    match schema.properties() {
        PropertyPolicy::Disabled => {}
        PropertyPolicy::Any => out.push_str(
            "- \"head_properties\" and \"tail_properties\" (optional): objects mapping property names to string values\n",
        ),
        PropertyPolicy::Named(names) => out.push_str(&format!(
            "- \"head_properties\" and \"tail_properties\" (optional): objects whose keys are among {}\n",
            quoted_list(names)
        )),
    }
    out
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{}\"", item))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Built-in few-shot examples
pub fn default_examples() -> Vec<FewShotExample> {
    let adam = "Adam is a software engineer in Microsoft since 2009, and last year he got an award as the Best Talent";
    let word = "Microsoft is a tech company that provide several products such as Microsoft Word";
    let word_features = "Microsoft Word is a lightweight app that accessible offline";
    vec![
        example(adam, "Adam", "Person", "WORKS_FOR", "Microsoft", "Company"),
        example(adam, "Adam", "Person", "HAS_AWARD", "Best Talent", "Award"),
        example(word, "Microsoft Word", "Product", "PRODUCED_BY", "Microsoft", "Company"),
        example(word_features, "Microsoft Word", "Product", "HAS_CHARACTERISTIC", "lightweight app", "Characteristic"),
        example(word_features, "Microsoft Word", "Product", "HAS_CHARACTERISTIC", "accessible offline", "Characteristic"),
    ]
}

fn example(
    text: &str,
    head: &str,
    head_type: &str,
    relation: &str,
    tail: &str,
    tail_type: &str,
) -> FewShotExample {
    FewShotExample {
        text: text.to_string(),
        head: head.to_string(),
        head_type: head_type.to_string(),
        relation: relation.to_string(),
        tail: tail.to_string(),
        tail_type: tail_type.to_string(),
    }
}

const SYSTEM_PREAMBLE: &str = r#"You are a top-tier algorithm designed for extracting information in structured formats to build a knowledge graph.
Your task is to identify the entities and relations requested with the user prompt from a given text.
Try to capture as much information from the text as possible without sacrificing accuracy. Do not add any information that is not explicitly mentioned in the text."#;

const LABELING_RULES: &str = r#"Rules:
- Nodes represent entities and concepts. Aim for simplicity and clarity so the graph is accessible for a vast audience.
- Use available types for node labels. Ensure you use basic or elementary types: when you identify an entity representing a person, always label it as "Person" and avoid more specific terms like "Mathematician" or "Scientist".
- Node IDs: never use integers. Node IDs should be names or human-readable identifiers found in the text.
- Coreference resolution: if an entity is mentioned by different names or pronouns throughout the text (e.g. "John Doe", "Joe", "he"), always use the most complete identifier for that entity.
- Relationships: use general and timeless relationship types instead of specific and momentary ones. Prefer "PROFESSOR" over "BECAME_PROFESSOR"."#;

const STRICT_COMPLIANCE: &str =
    "Adhere to these rules strictly. Non-compliance will result in termination.";

const OUTPUT_REMINDER: &str =
    "Remember: return ONLY valid JSON, no markdown code blocks, no explanations.";
