//! Integration tests for the GraphTransformer

#[cfg(test)]
mod tests {
    use crate::{
        combine_chunks, ChunkingConfig, ExtractionMode, ExtractorError, GraphTransformer,
        NodeProperties, TextChunker, TransformerConfig,
    };
    use graphbuilder_domain::{Document, ExtractionOutcome, FailureKind, Node, NodeRef};
    use graphbuilder_llm::MockProvider;
    use std::time::Duration;

    const ADAM_TEXT: &str = "Adam is a software engineer at Microsoft since 2009, and last year he got an award as the Best Talent";

    const ADAM_TRIPLES: &str = r#"[
        {"head": "Adam", "head_type": "Person", "relation": "WORKS_FOR", "tail": "Microsoft", "tail_type": "Company"},
        {"head": "Adam", "head_type": "Person", "relation": "EMPLOYED_SINCE", "tail": "2009", "tail_type": "Year"},
        {"head": "Adam", "head_type": "person", "relation": "has award", "tail": "Best Talent", "tail_type": "award"}
    ]"#;

    fn adam_config() -> TransformerConfig {
        TransformerConfig::strict(
            vec!["Person".into(), "Company".into(), "Award".into()],
            vec!["WORKS_FOR".into(), "HAS_AWARD".into()],
        )
    }

    fn triple(head: &str, tail: &str) -> String {
        format!(
            r#"[{{"head": "{}", "head_type": "Person", "relation": "KNOWS", "tail": "{}", "tail_type": "Person"}}]"#,
            head, tail
        )
    }

    #[tokio::test]
    async fn test_adam_scenario_unstructured() {
        let mut llm = MockProvider::new("[]");
        llm.add_response(ADAM_TEXT, ADAM_TRIPLES);

        let transformer = GraphTransformer::new(llm, adam_config()).unwrap();
        assert_eq!(transformer.mode(), ExtractionMode::UnstructuredWithRepair);

        let graphs = transformer.convert(vec![Document::new(ADAM_TEXT)]).await;
        assert_eq!(graphs.len(), 1);
        let graph = &graphs[0];

        assert_eq!(
            graph.nodes,
            vec![
                Node::new("Adam", "Person"),
                Node::new("Microsoft", "Company"),
                Node::new("Best Talent", "Award"),
            ]
        );
        let rels: Vec<(&str, &str, &str)> = graph
            .relationships
            .iter()
            .map(|r| (r.source.id.as_str(), r.rel_type.as_str(), r.target.id.as_str()))
            .collect();
        assert_eq!(
            rels,
            vec![
                ("Adam", "WORKS_FOR", "Microsoft"),
                ("Adam", "HAS_AWARD", "Best Talent"),
            ]
        );
    }

    #[tokio::test]
    async fn test_adam_scenario_native() {
        let payload = r#"{
            "nodes": [
                {"id": "Adam", "type": "Person"},
                {"id": "Microsoft", "type": "Company"},
                {"id": "Best Talent", "type": "Award"}
            ],
            "relationships": [
                {"source_node_id": "Adam", "source_node_type": "Person",
                 "target_node_id": "Microsoft", "target_node_type": "Company", "type": "WORKS_FOR"},
                {"source_node_id": "Adam", "target_node_id": "Best Talent", "type": "HAS_AWARD"}
            ]
        }"#;
        let mut llm = MockProvider::new("{}").with_decoded_objects();
        llm.add_response(ADAM_TEXT, payload);

        let transformer = GraphTransformer::new(llm, adam_config()).unwrap();
        assert_eq!(transformer.mode(), ExtractionMode::NativeStructured);

        let graphs = transformer.convert(vec![Document::new(ADAM_TEXT)]).await;
        let graph = &graphs[0];
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.relationships.len(), 2);
        // Endpoint types were filled in from the node list
        assert_eq!(graph.relationships[1].source, NodeRef::new("Adam", "Person"));
        assert_eq!(graph.relationships[1].target, NodeRef::new("Best Talent", "Award"));
    }

    #[tokio::test]
    async fn test_concurrent_preserves_order() {
        let mut llm = MockProvider::new("[]");
        llm.add_delayed_response("doc-zero", triple("Zero", "A"), Duration::from_millis(60));
        llm.add_delayed_response("doc-one", triple("One", "B"), Duration::from_millis(30));
        llm.add_delayed_response("doc-two", triple("Two", "C"), Duration::from_millis(1));

        let transformer = GraphTransformer::new(llm, TransformerConfig::default()).unwrap();
        let docs = vec![
            Document::new("doc-zero text").with_metadata("index", 0),
            Document::new("doc-one text").with_metadata("index", 1),
            Document::new("doc-two text").with_metadata("index", 2),
        ];

        let results = transformer.convert_concurrent(docs).await;
        assert_eq!(results.len(), 3);
        let heads: Vec<&str> = results.iter().map(|g| g.nodes[0].id.as_str()).collect();
        assert_eq!(heads, vec!["Zero", "One", "Two"]);
        for (i, graph) in results.iter().enumerate() {
            assert_eq!(graph.source.metadata["index"], i as u64);
        }
    }

    #[tokio::test]
    async fn test_concurrent_calls_overlap() {
        let mut llm = MockProvider::new("[]");
        for key in ["slow-a", "slow-b", "slow-c", "slow-d"] {
            llm.add_delayed_response(key, triple(key, "X"), Duration::from_millis(80));
        }
        let transformer = GraphTransformer::new(llm, TransformerConfig::default()).unwrap();
        let docs = ["slow-a", "slow-b", "slow-c", "slow-d"]
            .iter()
            .map(|k| Document::new(*k))
            .collect();

        let start = std::time::Instant::now();
        let results = transformer.convert_concurrent(docs).await;
        assert_eq!(results.len(), 4);
        // Four sequential calls would take at least 320ms
        assert!(start.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_decode_failure_isolated() {
        let mut llm = MockProvider::new("[]");
        llm.add_response("first-doc", triple("Ann", "Bob"));
        llm.add_response("second-doc", "I am sorry, I cannot help with that.");
        llm.add_response("third-doc", triple("Cid", "Dee"));

        let transformer = GraphTransformer::new(llm, TransformerConfig::default()).unwrap();
        let docs = vec![
            Document::new("first-doc"),
            Document::new("second-doc"),
            Document::new("third-doc"),
        ];

        for results in [
            transformer.convert(docs.clone()).await,
            transformer.convert_concurrent(docs).await,
        ] {
            assert_eq!(results.len(), 3);
            assert_eq!(results[0].nodes.len(), 2);
            assert!(results[1].is_empty());
            assert!(matches!(
                results[1].outcome,
                ExtractionOutcome::Degraded {
                    failure: FailureKind::Decode,
                    ..
                }
            ));
            assert_eq!(results[2].nodes.len(), 2);
            assert!(!results[0].is_degraded());
            assert!(!results[2].is_degraded());
        }
    }

    #[tokio::test]
    async fn test_transport_failure_isolated() {
        let mut llm = MockProvider::new("[]");
        llm.add_response("healthy-doc", triple("Ann", "Bob"));
        llm.add_error("broken-doc");

        let transformer = GraphTransformer::new(llm, TransformerConfig::default()).unwrap();
        let results = transformer
            .convert_concurrent(vec![Document::new("broken-doc"), Document::new("healthy-doc")])
            .await;

        assert_eq!(results.len(), 2);
        match &results[0].outcome {
            ExtractionOutcome::Degraded { failure, message } => {
                assert_eq!(*failure, FailureKind::Transport);
                assert!(message.contains("broken-doc"));
            }
            other => panic!("expected degraded outcome, got {:?}", other),
        }
        assert_eq!(results[1].relationships.len(), 1);
    }

    #[tokio::test]
    async fn test_legitimately_empty_is_not_degraded() {
        let transformer = GraphTransformer::new(MockProvider::new("[]"), TransformerConfig::default()).unwrap();
        let results = transformer.convert(vec![Document::new("The weather is mild.")]).await;
        assert!(results[0].is_empty());
        assert_eq!(results[0].outcome, ExtractionOutcome::Complete);
    }

    #[tokio::test]
    async fn test_strict_mode_without_constraints_keeps_everything() {
        let response = r#"[
            {"head": "Ann", "head_type": "Robot", "relation": "BUILT_BY", "tail": "Zed", "tail_type": "Alien"}
        ]"#;
        let strict = GraphTransformer::new(MockProvider::new(response), TransformerConfig::default()).unwrap();
        let lax = GraphTransformer::new(
            MockProvider::new(response),
            TransformerConfig {
                strict_mode: false,
                ..TransformerConfig::default()
            },
        )
        .unwrap();

        let a = strict.convert(vec![Document::new("robots")]).await;
        let b = lax.convert(vec![Document::new("robots")]).await;
        assert_eq!(a[0].nodes, b[0].nodes);
        assert_eq!(a[0].relationships, b[0].relationships);
        assert_eq!(a[0].nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_permissive_keeps_disallowed_types() {
        let config = TransformerConfig::permissive(vec!["Person".into()], vec!["KNOWS".into()]);
        let response = r#"[{"head": "Ann", "head_type": "Robot", "relation": "BUILT", "tail": "Zed", "tail_type": "Alien"}]"#;
        let transformer = GraphTransformer::new(MockProvider::new(response), config).unwrap();
        let results = transformer.convert(vec![Document::new("robots")]).await;
        assert_eq!(results[0].relationships.len(), 1);
    }

    #[test]
    fn test_properties_without_native_support_is_config_error() {
        let config = TransformerConfig {
            node_properties: NodeProperties::Named(vec!["description".into()]),
            ..TransformerConfig::default()
        };
        match GraphTransformer::new(MockProvider::new("[]"), config) {
            Err(ExtractorError::Config(msg)) => {
                assert!(msg.contains("property extraction requires native structured-output support"))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected a configuration error"),
        }
    }

    #[tokio::test]
    async fn test_native_properties_extracted() {
        let payload = r#"{"nodes": [{"id": "Microsoft", "type": "Company",
            "properties": [{"key": "founded year", "value": "1975"}]}], "relationships": []}"#;
        let llm = MockProvider::new(payload).with_structured_output();
        let config = TransformerConfig {
            node_properties: NodeProperties::Enabled(true),
            ..TransformerConfig::default()
        };
        let transformer = GraphTransformer::new(llm.clone(), config).unwrap();
        let results = transformer.convert(vec![Document::new("Microsoft history")]).await;

        assert_eq!(
            results[0].nodes[0].properties.get("foundedYear").map(String::as_str),
            Some("1975")
        );
        let contract = &llm.recorded_contracts()[0];
        assert!(contract.schema["properties"]["nodes"]["items"]["properties"]
            .get("properties")
            .is_some());
    }

    #[tokio::test]
    async fn test_native_malformed_arguments_repaired() {
        // Trailing comma and truncation after the last relationship
        let arguments = r#"{"nodes": [{"id": "Ann", "type": "Person"}, {"id": "Bob", "type": "Person"},],
            "relationships": [{"source_node_id": "Ann", "source_node_type": "Person",
            "target_node_id": "Bob", "target_node_type": "Person", "type": "KNOWS"}"#;
        let llm = MockProvider::new(arguments).with_structured_output();
        let transformer = GraphTransformer::new(llm, TransformerConfig::default()).unwrap();

        let results = transformer.convert(vec![Document::new("Ann knows Bob")]).await;
        assert!(!results[0].is_degraded());
        assert_eq!(results[0].nodes.len(), 2);
        assert_eq!(results[0].relationships[0].rel_type, "KNOWS");
    }

    #[tokio::test]
    async fn test_native_garbage_degrades() {
        let llm = MockProvider::new("no graph here").with_structured_output();
        let transformer = GraphTransformer::new(llm, TransformerConfig::default()).unwrap();
        let results = transformer.convert(vec![Document::new("anything")]).await;
        assert!(results[0].is_degraded());
    }

    #[tokio::test]
    async fn test_forced_unstructured_on_capable_model() {
        let llm = MockProvider::new(triple("Ann", "Bob")).with_structured_output();
        let config = TransformerConfig {
            use_function_call: false,
            ..TransformerConfig::default()
        };
        let transformer = GraphTransformer::new(llm.clone(), config).unwrap();
        assert_eq!(transformer.mode(), ExtractionMode::UnstructuredWithRepair);

        let results = transformer.convert(vec![Document::new("Ann and Bob")]).await;
        assert_eq!(results[0].relationships.len(), 1);
        assert!(llm.recorded_contracts().is_empty());
    }

    #[tokio::test]
    async fn test_model_called_once_per_document() {
        let llm = MockProvider::new(triple("Ann", "Bob"));
        let transformer = GraphTransformer::new(llm.clone(), TransformerConfig::default()).unwrap();
        transformer
            .convert_concurrent(vec![Document::new("a"), Document::new("b"), Document::new("c")])
            .await;
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_chunked_pipeline() {
        let text = (0..25).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        let source = Document::new(text).with_metadata("file", "long.txt");
        let chunker = TextChunker::new(ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 2,
            max_chunks_allowed: 100,
            chunks_to_combine: 2,
        });
        let chunks = chunker.split(&source);
        assert_eq!(chunks.len(), 3);
        let combined = combine_chunks(&chunks, 2);
        assert_eq!(combined.len(), 2);

        let transformer = GraphTransformer::new(MockProvider::new(triple("Ann", "Bob")), TransformerConfig::default()).unwrap();
        let results = transformer.convert_concurrent(combined).await;
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].source.metadata["combined_chunk_ids"].as_array().map(Vec::len),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_config_from_toml_drives_transformer() {
        let config = TransformerConfig::from_toml(
            r#"
            allowed_nodes = ["Person"]
            allowed_relationships = ["KNOWS"]
            strict_mode = true
            "#,
        )
        .unwrap();
        let response = r#"[
            {"head": "Ann", "head_type": "Person", "relation": "KNOWS", "tail": "Bob", "tail_type": "Person"},
            {"head": "Ann", "head_type": "Person", "relation": "OWNS", "tail": "Rex", "tail_type": "Dog"}
        ]"#;
        let transformer = GraphTransformer::new(MockProvider::new(response), config).unwrap();
        let results = transformer.convert(vec![Document::new("Ann, Bob and Rex")]).await;

        assert_eq!(results[0].nodes.len(), 2);
        assert_eq!(results[0].relationships.len(), 1);
    }
}
