use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;

/// Input JSON from the Claude Code PreToolUse hook
#[derive(Debug, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: String,
    /// Tool-specific parameters, left untyped since each tool has its own shape
    #[serde(default)]
    pub tool_input: Value,
}

/// Read and parse a single hook payload from `reader`.
pub fn read_input(mut reader: impl Read) -> Result<HookInput> {
    let mut buffer = String::new();
    reader
        .read_to_string(&mut buffer)
        .context("Failed to read hook input")?;
    let input: HookInput = serde_json::from_str(&buffer).context("Failed to parse hook input")?;
    Ok(input)
}
