/// Best-effort path extraction from a Bash command string.
///
/// Splits with POSIX quoting rules, then keeps tokens that look like paths
/// (contain `/` or start with `~`). Flags are skipped. Variables, globs,
/// comments and pipelines are not interpreted; the filter sees the raw tokens.
/// Returns nothing if the command cannot be split.
pub fn paths_from_command(command: &str) -> Vec<String> {
    let Some(tokens) = shlex::split(&escape_hashes(command)) else {
        return Vec::new();
    };

    tokens
        .into_iter()
        .filter(|token| !token.starts_with('-'))
        .filter(|token| token.contains('/') || token.starts_with('~'))
        .collect()
}

/// Backslash-escape every unquoted `#` so the splitter keeps it as a literal
/// character instead of starting a comment.
fn escape_hashes(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    let mut chars = command.chars();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match (quote, c) {
            (None, '#') => out.push_str("\\#"),
            (None, '\\') | (Some('"'), '\\') => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (Some(q), _) if c == q => {
                quote = None;
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}
