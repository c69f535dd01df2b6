//! Micro-parsing of REST request paths and newline-delimited request bodies.

use crate::classify::classify_action;
use crate::error::{MetricError, Result};
use crate::model::QueryType;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// `[/target]/_action`, first occurrence anywhere in the path.
const REST_PATH_PATTERN: &str = r"(?:/(?P<target>[^/]*))?/(?P<action>_\w+)";

fn rest_path_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(REST_PATH_PATTERN).expect("REST path pattern is valid"))
}

/// What a REST path says about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRequest<'a> {
    pub query_type: QueryType,
    pub target: Option<&'a str>,
}

/// Extracts the action tag and the optional target from a REST path.
///
/// Paths without an `_action` segment classify as `other` with no target.
pub fn parse_rest_path(path: Option<&str>) -> RestRequest<'_> {
    let captures = path.and_then(|path| rest_path_regex().captures(path));
    match captures {
        Some(caps) => RestRequest {
            query_type: caps
                .name("action")
                .map_or(QueryType::Other, |action| classify_action(action.as_str())),
            target: caps
                .name("target")
                .map(|target| target.as_str())
                .filter(|target| !target.is_empty()),
        },
        None => RestRequest {
            query_type: QueryType::Other,
            target: None,
        },
    }
}

/// Index names named by the command lines of a `_bulk` body.
///
/// Each command is `{"<operation>": {"_index": "..."}}`; commands without an
/// `_index` are skipped.
pub fn bulk_indices(body: &str) -> Result<Vec<String>> {
    let mut indices = Vec::new();
    for (line, command) in command_lines(body) {
        let command = parse_command(line, command)?;
        let index = command
            .values()
            .next()
            .and_then(|operation| operation.get("_index"))
            .and_then(Value::as_str);
        if let Some(index) = index {
            indices.push(index.to_string());
        }
    }
    Ok(indices)
}

/// Index names named by the header lines of a `_msearch` body. A header's
/// `index` is either one name or a list of names.
pub fn msearch_indices(body: &str) -> Result<Vec<String>> {
    let mut indices = Vec::new();
    for (line, header) in command_lines(body) {
        let header = parse_command(line, header)?;
        match header.get("index") {
            Some(Value::String(index)) => indices.push(index.clone()),
            Some(Value::Array(list)) => indices.extend(
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string),
            ),
            _ => {}
        }
    }
    Ok(indices)
}

/// Lines at even offsets, paired with their 1-based line number. Data lines
/// sit at odd offsets; blank command lines are ignored.
fn command_lines(body: &str) -> impl Iterator<Item = (usize, &str)> {
    body.lines()
        .enumerate()
        .step_by(2)
        .map(|(offset, text)| (offset + 1, text))
        .filter(|(_, text)| !text.trim().is_empty())
}

fn parse_command(line: usize, text: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(text) {
        Ok(Value::Object(command)) => Ok(command),
        Ok(_) => Err(MetricError::RequestBodyShape { line }),
        Err(source) => Err(MetricError::RequestBody { line, source }),
    }
}
