//! Decoding of model output into JSON
//!
//! Models wrap JSON in markdown fences, leave trailing commas, forget to
//! escape quotes and get cut off mid-answer. Decoding runs an ordered set of
//! fallbacks: strict decode, strict decode of the fenced body, then a
//! lenient repair pass. Only when all of them fail is a
//! [`ExtractorError::Decode`] returned.

use crate::error::ExtractorError;
use graphbuilder_domain::StructuredResponse;
use serde_json::Value;
use tracing::debug;

/// Decode a structured-output response
pub fn decode_response(response: StructuredResponse) -> Result<Value, ExtractorError> {
    match response {
        StructuredResponse::Object(value) => Ok(value),
        StructuredResponse::Arguments(text) => decode_json(&text),
    }
}

/// Decode model text as JSON, repairing it when strict parsing fails
pub fn decode_json(text: &str) -> Result<Value, ExtractorError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let body = strip_code_fences(trimmed);
    match serde_json::from_str(body) {
        Ok(value) => return Ok(value),
        Err(e) => debug!(error = %e, len = body.len(), "Strict JSON decode failed, repairing"),
    }

    let repaired = repair_json(body)
        .ok_or_else(|| ExtractorError::Decode("no JSON object or array in output".to_string()))?;
    let value = serde_json::from_str(&repaired)?;
    Ok(value)
}

/// Extract the body of the first markdown code block, if any
fn strip_code_fences(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    // Skip the language tag line
    let Some(newline) = after.find('\n') else {
        return text;
    };
    let body = &after[newline + 1..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectState {
    ExpectKey,
    AfterKey,
    ExpectValue,
    AfterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object(ObjectState),
    Array { after_value: bool },
}

impl Frame {
    fn closer(self) -> char {
        match self {
            Frame::Object(_) => '}',
            Frame::Array { .. } => ']',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Key,
    Value,
}

/// Best-effort rewrite of almost-JSON into JSON
///
/// Starts at the first `{` or `[` and stops once that container closes, so
/// prose before and after the payload is dropped. Handles single-quoted
/// strings, unescaped inner quotes, raw newlines in strings, Python
/// literals, bare words, trailing and missing commas, and output truncated
/// inside a string, key, literal or nested container. Returns `None` when
/// the text contains no container at all.
pub fn repair_json(text: &str) -> Option<String> {
    let start = text.find(['{', '['])?;
    let chars: Vec<char> = text[start..].chars().collect();
    let mut out = String::with_capacity(chars.len() + 16);
    let mut stack: Vec<Frame> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' | '[' => {
                let role = begin_token(&mut stack, &mut out);
                if role == Role::Key {
                    // A container cannot be a key; give it a placeholder one
                    out.push_str("\"\":");
                    set_object_state(&mut stack, ObjectState::ExpectValue);
                }
                out.push(c);
                stack.push(if c == '{' {
                    Frame::Object(ObjectState::ExpectKey)
                } else {
                    Frame::Array { after_value: false }
                });
                i += 1;
            }
            '}' | ']' => {
                i += 1;
                if !stack.iter().any(|frame| frame.closer() == c) {
                    continue;
                }
                while let Some(frame) = stack.pop() {
                    close_frame(frame, &mut out);
                    end_token(&mut stack, Role::Value);
                    if frame.closer() == c {
                        break;
                    }
                }
                if stack.is_empty() {
                    return Some(out);
                }
            }
            ',' => {
                let prev = out.trim_end().chars().last();
                if !matches!(prev, Some(',') | Some('{') | Some('[') | Some(':')) {
                    out.push(',');
                }
                match stack.last_mut() {
                    Some(Frame::Object(state)) => *state = ObjectState::ExpectKey,
                    Some(Frame::Array { after_value }) => *after_value = false,
                    None => {}
                }
                i += 1;
            }
            ':' => {
                if let Some(Frame::Object(state)) = stack.last_mut() {
                    if *state == ObjectState::AfterKey {
                        out.push(':');
                        *state = ObjectState::ExpectValue;
                    }
                }
                i += 1;
            }
            '"' | '\'' => {
                let role = begin_token(&mut stack, &mut out);
                let (content, next) = read_string(&chars, i, c);
                out.push('"');
                out.push_str(&content);
                out.push('"');
                end_token(&mut stack, role);
                i = next;
            }
            c if c.is_whitespace() => {
                out.push(c);
                i += 1;
            }
            c if is_word_char(c) => {
                let mut j = i;
                while j < chars.len() && is_word_char(chars[j]) {
                    j += 1;
                }
                let word: String = chars[i..j].iter().collect();
                let truncated = j == chars.len();
                let role = begin_token(&mut stack, &mut out);
                if role == Role::Key {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&bare_value(&word, truncated));
                }
                end_token(&mut stack, role);
                i = j;
            }
            _ => {
                i += 1;
            }
        }
    }

    // Input ended before the outer container closed
    while let Some(frame) = stack.pop() {
        close_frame(frame, &mut out);
        // The closed container is the parent's value
        end_token(&mut stack, Role::Value);
    }
    Some(out)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '.')
}

/// Comma and colon bookkeeping before a scalar or container
fn begin_token(stack: &mut [Frame], out: &mut String) -> Role {
    match stack.last_mut() {
        Some(Frame::Object(state)) => match *state {
            ObjectState::ExpectKey => Role::Key,
            ObjectState::AfterValue => {
                out.push(',');
                *state = ObjectState::ExpectKey;
                Role::Key
            }
            ObjectState::AfterKey => {
                out.push(':');
                *state = ObjectState::ExpectValue;
                Role::Value
            }
            ObjectState::ExpectValue => Role::Value,
        },
        Some(Frame::Array { after_value }) => {
            if *after_value {
                out.push(',');
            }
            Role::Value
        }
        None => Role::Value,
    }
}

fn end_token(stack: &mut [Frame], role: Role) {
    match stack.last_mut() {
        Some(Frame::Object(state)) => {
            *state = match role {
                Role::Key => ObjectState::AfterKey,
                Role::Value => ObjectState::AfterValue,
            }
        }
        Some(Frame::Array { after_value }) => *after_value = true,
        None => {}
    }
}

fn set_object_state(stack: &mut [Frame], new_state: ObjectState) {
    if let Some(Frame::Object(state)) = stack.last_mut() {
        *state = new_state;
    }
}

fn close_frame(frame: Frame, out: &mut String) {
    strip_trailing_comma(out);
    match frame {
        Frame::Object(ObjectState::AfterKey) => out.push_str(":null"),
        Frame::Object(ObjectState::ExpectValue) => out.push_str("null"),
        _ => {}
    }
    out.push(frame.closer());
}

fn strip_trailing_comma(out: &mut String) {
    let len = out.trim_end().len();
    out.truncate(len);
    if out.ends_with(',') {
        out.pop();
    }
}

/// Read a quoted string starting at `chars[start]`
///
/// Returns the JSON-escaped content and the index after the string; an
/// unterminated string runs to the end of input. A quote only closes the
/// string when the next non-whitespace character could follow a JSON
/// string; any other quote is escaped as part of the content.
fn read_string(chars: &[char], start: usize, quote: char) -> (String, usize) {
    let mut content = String::new();
    let mut j = start + 1;

    while j < chars.len() {
        let ch = chars[j];
        if ch == '\\' {
            match chars.get(j + 1) {
                Some(&next) if matches!(next, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => {
                    content.push('\\');
                    content.push(next);
                }
                Some(&'u') if is_unicode_escape(&chars[j + 2..]) => {
                    content.push_str("\\u");
                }
                Some(&'\'') => content.push('\''),
                Some(&next) => {
                    content.push_str("\\\\");
                    content.push(next);
                }
                None => return (content, j + 1),
            }
            j += 2;
            continue;
        }

        if ch == quote && closes_string(&chars[j + 1..]) {
            return (content, j + 1);
        }

        match ch {
            '"' => content.push_str("\\\""),
            '\n' => content.push_str("\\n"),
            '\r' => content.push_str("\\r"),
            '\t' => content.push_str("\\t"),
            c if c.is_control() => {}
            c => content.push(c),
        }
        j += 1;
    }

    (content, j)
}

/// Whether a quote followed by `rest` ends the current string
///
/// Besides the structural characters, a quote also closes when the next
/// token is itself a quoted string that ends a member or element, which is
/// what a missing comma between two members looks like.
fn closes_string(rest: &[char]) -> bool {
    let Some(k) = rest.iter().position(|c| !c.is_whitespace()) else {
        return true;
    };
    match rest[k] {
        ',' | '}' | ']' | ':' => true,
        q @ ('"' | '\'') => quoted_token_ends(&rest[k + 1..], q),
        _ => false,
    }
}

/// Whether the quoted token whose body starts `rest` is followed by a
/// separator, a closer or the end of input
fn quoted_token_ends(rest: &[char], quote: char) -> bool {
    let mut k = 0;
    while k < rest.len() {
        match rest[k] {
            '\\' => k += 2,
            c if c == quote => {
                let after = rest[k + 1..].iter().find(|c| !c.is_whitespace());
                return matches!(after, None | Some(',') | Some('}') | Some(']') | Some(':'));
            }
            _ => k += 1,
        }
    }
    // Truncated inside the next token
    true
}

fn is_unicode_escape(rest: &[char]) -> bool {
    rest.len() >= 4 && rest[..4].iter().all(|c| c.is_ascii_hexdigit())
}

/// JSON rendering of an unquoted value
fn bare_value(word: &str, truncated: bool) -> String {
    match word {
        "true" | "True" | "TRUE" => return "true".to_string(),
        "false" | "False" | "FALSE" => return "false".to_string(),
        "null" | "Null" | "NULL" | "None" | "none" | "NaN" | "Infinity" | "-Infinity" => {
            return "null".to_string()
        }
        _ => {}
    }

    if truncated {
        let lower = word.to_lowercase();
        for literal in ["true", "false", "null", "none"] {
            if literal.starts_with(&lower) {
                return if literal == "none" { "null" } else { literal }.to_string();
            }
        }
    }

    let number = word.trim_start_matches('+').trim_end_matches('.');
    if let Ok(Value::Number(n)) = serde_json::from_str::<Value>(number) {
        return n.to_string();
    }

    let escaped = word.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_graph;
    use crate::schema::{PropertyPolicy, TypeSchema};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_valid_json_untouched() {
        let value = decode_json(r#"{"nodes": [], "relationships": []}"#).unwrap();
        assert_eq!(value, json!({"nodes": [], "relationships": []}));
    }

    #[test]
    fn test_markdown_fences_stripped() {
        let text = "```json\n[{\"head\": \"Adam\"}]\n```";
        assert_eq!(decode_json(text).unwrap(), json!([{"head": "Adam"}]));
    }

    #[test]
    fn test_fenced_block_inside_prose() {
        let text = "Here you go:\n```\n{\"a\": 1}\n```\nAnything else?";
        assert_eq!(decode_json(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_trailing_commas() {
        let text = r#"{"nodes": [{"id": "A", "type": "Person",},], "relationships": [],}"#;
        assert_eq!(
            decode_json(text).unwrap(),
            json!({"nodes": [{"id": "A", "type": "Person"}], "relationships": []})
        );
    }

    #[test]
    fn test_prose_around_payload() {
        let text = r#"Sure! The triples are [{"head": "Adam", "relation": "WORKS_FOR"}] hope that helps."#;
        assert_eq!(
            decode_json(text).unwrap(),
            json!([{"head": "Adam", "relation": "WORKS_FOR"}])
        );
    }

    #[test]
    fn test_python_literals_and_single_quotes() {
        let text = "{'ok': True, 'missing': None, 'bad': False}";
        assert_eq!(
            decode_json(text).unwrap(),
            json!({"ok": true, "missing": null, "bad": false})
        );
    }

    #[test]
    fn test_unescaped_inner_quotes() {
        let text = r#"{"text": "He said "hi" today", "n": 1}"#;
        assert_eq!(
            decode_json(text).unwrap(),
            json!({"text": "He said \"hi\" today", "n": 1})
        );
    }

    #[test]
    fn test_raw_newline_in_string() {
        let text = "{\"text\": \"line one\nline two\"}";
        assert_eq!(decode_json(text).unwrap(), json!({"text": "line one\nline two"}));
    }

    #[test]
    fn test_truncated_inside_string() {
        let text = r#"[{"head": "Adam", "relation": "WORKS_FO"#;
        assert_eq!(
            decode_json(text).unwrap(),
            json!([{"head": "Adam", "relation": "WORKS_FO"}])
        );
    }

    #[test]
    fn test_truncated_after_colon_and_key() {
        assert_eq!(decode_json(r#"{"a": 1, "b":"#).unwrap(), json!({"a": 1, "b": null}));
        assert_eq!(decode_json(r#"{"a": 1, "b""#).unwrap(), json!({"a": 1, "b": null}));
    }

    #[test]
    fn test_truncated_literal_and_number() {
        assert_eq!(decode_json(r#"{"flag": tr"#).unwrap(), json!({"flag": true}));
        assert_eq!(decode_json(r#"[1, 2."#).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_truncated_nested_containers() {
        let text = r#"{"nodes": [{"id": "Adam", "type": "Person"}, {"id": "Micro"#;
        let value = decode_json(text).unwrap();
        assert_eq!(value["nodes"][0]["id"], "Adam");
        assert_eq!(value["nodes"][1]["id"], "Micro");
    }

    #[test]
    fn test_truncated_between_nested_nodes() {
        let text = r#"{"nodes": [{"id": "Adam", "type": "Person"}, {"id": "Micro"#;
        assert_eq!(
            repair_json(text).unwrap(),
            r#"{"nodes": [{"id": "Adam", "type": "Person"}, {"id": "Micro"}]}"#
        );
        assert_eq!(
            decode_json(r#"{"nodes": [[1, [2"#).unwrap(),
            json!({"nodes": [[1, [2]]]})
        );
    }

    #[test]
    fn test_missing_commas() {
        let text = r#"{"a": "x" "b": "y"}"#;
        assert_eq!(decode_json(text).unwrap(), json!({"a": "x", "b": "y"}));
        assert_eq!(decode_json(r#"[1 2 3]"#).unwrap(), json!([1, 2, 3]));
        assert_eq!(decode_json(r#"["a" "b"]"#).unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn test_missing_comma_across_lines() {
        let text = "{\"head\":\"Adam\",\"head_type\":\"Person\"\n \"relation\":\"WORKS_FOR\"}";
        assert_eq!(
            decode_json(text).unwrap(),
            json!({"head": "Adam", "head_type": "Person", "relation": "WORKS_FOR"})
        );
    }

    #[test]
    fn test_bare_keys_and_values() {
        let text = "{head: Adam, relation: WORKS_FOR}";
        assert_eq!(
            decode_json(text).unwrap(),
            json!({"head": "Adam", "relation": "WORKS_FOR"})
        );
    }

    #[test]
    fn test_no_json_is_decode_error() {
        let err = decode_json("I could not find any entities.").unwrap_err();
        assert!(matches!(err, ExtractorError::Decode(_)));
    }

    #[test]
    fn test_repair_returns_none_without_container() {
        assert!(repair_json("plain words").is_none());
    }

    #[test]
    fn test_decode_response_variants() {
        let object = decode_response(StructuredResponse::Object(json!({"nodes": []}))).unwrap();
        assert_eq!(object, json!({"nodes": []}));

        let args = decode_response(StructuredResponse::Arguments(r#"{"nodes": [],}"#.to_string()))
            .unwrap();
        assert_eq!(args, json!({"nodes": []}));
    }

    fn graph_payload() -> impl Strategy<Value = Value> {
        let label = "[A-Za-z][A-Za-z0-9_]{0,10}";
        let node = (label, label).prop_map(|(id, node_type)| json!({"id": id, "type": node_type}));
        let rel = (label, label, label, label, label).prop_map(|(s, st, t, tt, rt)| {
            json!({
                "source_node_id": s, "source_node_type": st,
                "target_node_id": t, "target_node_type": tt,
                "type": rt
            })
        });
        (
            prop::collection::vec(node, 0..5),
            prop::collection::vec(rel, 0..4),
        )
            .prop_map(|(nodes, relationships)| json!({"nodes": nodes, "relationships": relationships}))
    }

    proptest! {
        #[test]
        fn prop_truncated_graph_decodes(payload in graph_payload()) {
            let text = serde_json::to_string(&payload).unwrap();
            let schema = TypeSchema::new(&[], &[], PropertyPolicy::Disabled);
            let nodes = payload["nodes"].as_array().cloned().unwrap_or_default();

            for end in (1..=text.len()).filter(|&end| text.is_char_boundary(end)) {
                let prefix = &text[..end];
                let decoded = decode_json(prefix);
                prop_assert!(decoded.is_ok(), "failed to decode {:?}: {:?}", prefix, decoded);
                let graph = normalize_graph(&decoded.unwrap(), &schema, false).unwrap();

                for node in &nodes {
                    if !prefix.contains(&serde_json::to_string(node).unwrap()) {
                        continue;
                    }
                    let id = node["id"].as_str().unwrap_or_default();
                    prop_assert!(
                        graph.nodes.iter().any(|n| n.id == id),
                        "node {} lost from {:?}",
                        id,
                        prefix
                    );
                }
            }
        }
    }
}
