//! Response decoding for tool-call payloads.
//!
//! The service answers every tool call with a single text payload. Most of the
//! time that text is a compact, indentation-based notation rather than JSON:
//!
//! ```text
//! success: true
//! data:
//!   pagination:
//!     tableName: tbl_8f2c
//!     totalRows: 2
//!     totalPages: 1
//!   results[2]{id,text,likeCount}:
//!     "1874266108200673750","gm, frens",12
//!     "1874266108200673751",hello,null
//! ```
//!
//! [`parse_response_text`] turns that text into a [`Payload`]: an ordered map
//! of scalars, nested maps and lists of maps. Three shapes are recognised:
//!
//! - **Flat key/value runs** when the first line starts with `operationId:`
//!   (the "operation started" acknowledgement).
//! - **Nested records**, where a `key:` line with an empty value opens a map
//!   whose entries sit two spaces deeper.
//! - **Record arrays**, either tabular (`key[N]{f1,f2}:` followed by one
//!   comma-separated row per line) or YAML-style (`key[N]:` followed by
//!   `- field: value` items).
//!
//! Top-level quirks are kept as the server emits them: `data:` merges its
//! children into the top-level map, `success:` lines are dropped, and a
//! `data[N]...` array lands under `results`.
//!
//! # Scalars
//!
//! Every value goes through the same coercion, in order:
//!
//! ```text
//! ""                -> null
//! "\"quoted\""      -> "quoted"     (quotes stripped, nothing unescaped)
//! true / false      -> bool
//! null / None       -> null
//! 42                -> 42           (only within ±9007199254740991)
//! 9007199254740993  -> "9007199254740993"
//! 1.5               -> 1.5
//! anything else     -> string
//! ```
//!
//! Decoding never fails. Text that matches none of the shapes simply yields
//! fewer keys; JSON that fails to parse falls back to the text grammar.

use regex::Regex;
use serde_json::{Number, Value};
use std::sync::LazyLock;

use crate::types::Payload;

/// Largest integer magnitude representable without loss in an IEEE double
pub const MAX_SAFE_INTEGER: i128 = 9_007_199_254_740_991;

const FLAT_SENTINEL: &str = "operationId:";

static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+?):\s*(.*)").expect("valid key/value pattern"));
static TABULAR_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\[(\d+)\]\{(.+)\}:").expect("valid tabular pattern"));
static LIST_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\[(\d+)\]:").expect("valid list pattern"));
static DATA_TABULAR_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data\[(\d+)\]\{(.+)\}:").expect("valid tabular pattern"));
static DATA_LIST_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data\[(\d+)\]:").expect("valid list pattern"));

/// Decode a tool-call text payload.
///
/// Text starting with `{` is parsed as JSON first; a JSON object is returned
/// unchanged. Anything else, including broken JSON, goes through the
/// indentation grammar described in the module docs.
///
/// # Examples
///
/// ```rust
/// use xpoz::decoder::parse_response_text;
///
/// let payload = parse_response_text("data[2]{id,name}:\n  1,alice\n  2,\"bob, jr\"\n");
/// let rows = payload["results"].as_array().unwrap();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[1]["name"], "bob, jr");
/// ```
pub fn parse_response_text(text: &str) -> Payload {
    if text.trim().is_empty() {
        return Payload::new();
    }

    if text.trim_start().starts_with('{') {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => return map,
            Ok(_) => {}
            Err(e) => log::debug!("payload looks like JSON but did not parse: {}", e),
        }
    }

    let mut cursor = LineCursor::new(text);

    if cursor.peek().is_some_and(|l| l.starts_with(FLAT_SENTINEL)) {
        return parse_flat_key_values(&cursor);
    }

    parse_document(&mut cursor)
}

/// A read position over the payload's lines, shared by the block parsers.
struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn line_at(&self, index: usize) -> Option<&'a str> {
        self.lines.get(index).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Skip every line indented by at least `indent` spaces, plus blank lines.
    fn skip_indented(&mut self, indent: usize) {
        let prefix = " ".repeat(indent);
        while let Some(line) = self.peek() {
            if !line.starts_with(&prefix) && !line.trim().is_empty() {
                break;
            }
            self.advance();
        }
    }
}

fn parse_flat_key_values(cursor: &LineCursor<'_>) -> Payload {
    let mut result = Payload::new();
    for line in &cursor.lines {
        if let Some((key, value)) = split_key_value(line) {
            result.insert(key.to_string(), coerce(value));
        }
    }
    result
}

fn parse_document(cursor: &mut LineCursor<'_>) -> Payload {
    let mut result = Payload::new();

    while let Some(line) = cursor.peek() {
        if line.trim().is_empty() {
            cursor.advance();
            continue;
        }

        if let Some(caps) = DATA_TABULAR_HEADER.captures(line) {
            let fields = split_field_list(&caps[2]);
            cursor.advance();
            let rows = parse_tabular_rows(cursor, 2, &fields);
            result.insert("results".to_string(), Value::Array(rows));
            cursor.skip_indented(2);
            continue;
        }

        if DATA_LIST_HEADER.is_match(line) {
            cursor.advance();
            let rows = parse_list_items(cursor, 2);
            result.insert("results".to_string(), Value::Array(rows));
            cursor.skip_indented(2);
            continue;
        }

        if line == "data:" {
            cursor.advance();
            let data = parse_block(cursor, 2);
            result.extend(data);
            continue;
        }

        if line.starts_with("success:") {
            cursor.advance();
            continue;
        }

        if let Some((key, value)) = split_key_value(line) {
            result.insert(key.to_string(), coerce(value));
        }
        cursor.advance();
    }

    result
}

/// Parse the map whose entries sit exactly `indent` spaces deep.
fn parse_block(cursor: &mut LineCursor<'_>, indent: usize) -> Payload {
    let mut result = Payload::new();
    let prefix = " ".repeat(indent);
    let child_prefix = " ".repeat(indent + 2);

    while let Some(line) = cursor.peek() {
        if !line.starts_with(&prefix) {
            break;
        }
        // deeper lines belong to an entry we did not open
        if line.as_bytes().get(indent) == Some(&b' ') {
            break;
        }

        let stripped = &line[indent..];

        if let Some(caps) = TABULAR_HEADER.captures(stripped) {
            let key = caps[1].to_string();
            let fields = split_field_list(&caps[3]);
            cursor.advance();
            let rows = parse_tabular_rows(cursor, indent + 2, &fields);
            result.insert(key, Value::Array(rows));
            cursor.skip_indented(indent + 2);
            continue;
        }

        if let Some(caps) = LIST_HEADER.captures(stripped) {
            let key = caps[1].to_string();
            cursor.advance();
            let rows = parse_list_items(cursor, indent + 2);
            result.insert(key, Value::Array(rows));
            cursor.skip_indented(indent + 2);
            continue;
        }

        if let Some((key, value)) = split_key_value(stripped) {
            let key = key.to_string();
            cursor.advance();
            if !value.is_empty() {
                result.insert(key, coerce(value));
            } else if cursor.peek().is_some_and(|next| next.starts_with(&child_prefix)) {
                let nested = parse_block(cursor, indent + 2);
                result.insert(key, Value::Object(nested));
            } else {
                result.insert(key, Value::Null);
            }
            continue;
        }

        cursor.advance();
    }

    result
}

/// Read YAML-style items (`- field: value` plus continuation lines) without
/// moving the cursor; the caller skips the block afterwards.
fn parse_list_items(cursor: &LineCursor<'_>, indent: usize) -> Vec<Value> {
    let prefix = " ".repeat(indent);
    let item_prefix = format!("{}- ", prefix);
    let continuation_prefix = format!("{}  ", prefix);

    let mut rows = Vec::new();
    let mut i = cursor.pos;

    while let Some(line) = cursor.line_at(i) {
        if !line.starts_with(&prefix) {
            break;
        }
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        let Some(first) = line.strip_prefix(&item_prefix) else {
            i += 1;
            continue;
        };

        let mut row = Payload::new();
        if let Some((key, value)) = split_key_value(first) {
            row.insert(key.to_string(), coerce(value));
        }
        i += 1;

        while let Some(cline) = cursor.line_at(i) {
            if !cline.starts_with(&continuation_prefix) || cline.starts_with(&item_prefix) {
                break;
            }
            if let Some((key, value)) = split_key_value(&cline[continuation_prefix.len()..]) {
                row.insert(key.to_string(), coerce(value));
            }
            i += 1;
        }

        rows.push(Value::Object(row));
    }

    rows
}

/// Read tabular rows matched positionally against `fields` without moving the
/// cursor; missing trailing values become null.
fn parse_tabular_rows(cursor: &LineCursor<'_>, indent: usize, fields: &[String]) -> Vec<Value> {
    let prefix = " ".repeat(indent);
    let mut rows = Vec::new();
    let mut i = cursor.pos;

    while let Some(line) = cursor.line_at(i) {
        if !line.starts_with(&prefix) {
            break;
        }
        i += 1;

        let raw_row = &line[indent..];
        if raw_row.trim().is_empty() {
            continue;
        }

        let values = split_row(raw_row);
        let mut row = Payload::new();
        for (j, field) in fields.iter().enumerate() {
            let value = values.get(j).map_or(Value::Null, |v| coerce(v));
            row.insert(field.clone(), value);
        }
        rows.push(Value::Object(row));
    }

    rows
}

fn split_field_list(list: &str) -> Vec<String> {
    list.split(',').map(|f| f.trim().to_string()).collect()
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let caps = KEY_VALUE.captures(line)?;
    let key = caps.get(1)?.as_str();
    let value = caps.get(2).map_or("", |m| m.as_str());
    Some((key, value))
}

/// Split a tabular row on commas outside double quotes.
///
/// Quotes are kept in the values (coercion strips them). Inside quotes a
/// backslash and the character after it are copied through as one unit.
pub fn split_row(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if in_quotes && chars.peek().is_some() => {
                buf.push(ch);
                if let Some(escaped) = chars.next() {
                    buf.push(escaped);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                buf.push(ch);
            }
            ',' if !in_quotes => {
                values.push(buf.trim().to_string());
                buf.clear();
            }
            _ => buf.push(ch),
        }
    }

    if !buf.is_empty() || !values.is_empty() {
        values.push(buf.trim().to_string());
    }

    values
}

/// Coerce one raw value into a typed scalar.
pub fn coerce(value: &str) -> Value {
    if value.is_empty() {
        return Value::Null;
    }

    if value.starts_with('"') && value.ends_with('"') {
        let inner = if value.len() >= 2 {
            &value[1..value.len() - 1]
        } else {
            ""
        };
        return Value::String(inner.to_string());
    }

    match value {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "None" => return Value::Null,
        _ => {}
    }

    let trimmed = value.trim();

    if is_integer_literal(trimmed) {
        return match trimmed.parse::<i128>() {
            Ok(n) if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&n) => {
                Value::Number(Number::from(n as i64))
            }
            _ => Value::String(value.to_string()),
        };
    }

    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }

    Value::String(value.to_string())
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
