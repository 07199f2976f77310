use crate::shell;
use serde_json::Value;

/// Tools that operate on one or more files via `file_path`
const FILE_TOOLS: &[&str] = &["Read", "Write", "Edit", "MultiEdit", "NotebookEdit"];

/// Tools that search or list under a directory via `path`
const SEARCH_TOOLS: &[&str] = &["Glob", "Grep", "LS"];

/// Extract candidate paths from a tool invocation, in the order they should be checked.
/// Unknown tools yield nothing.
pub fn extract_paths(tool_name: &str, tool_input: &Value) -> Vec<String> {
    let mut paths = Vec::new();

    if FILE_TOOLS.contains(&tool_name) {
        push_str_field(&mut paths, tool_input, "file_path");
        if tool_name == "NotebookEdit" {
            push_str_field(&mut paths, tool_input, "notebook_path");
        }
        // MultiEdit may carry per-edit file paths
        if let Some(edits) = tool_input.get("edits").and_then(Value::as_array) {
            for edit in edits {
                push_str_field(&mut paths, edit, "file_path");
            }
        }
    } else if SEARCH_TOOLS.contains(&tool_name) {
        push_str_field(&mut paths, tool_input, "path");
    } else if tool_name == "Bash" {
        if let Some(command) = non_empty_str(tool_input, "command") {
            paths.extend(shell::paths_from_command(command));
        }
    }

    paths
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn push_str_field(paths: &mut Vec<String>, value: &Value, key: &str) {
    if let Some(s) = non_empty_str(value, key) {
        paths.push(s.to_string());
    }
}
