use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod decision;
mod filter;
mod input;
mod paths;
mod shell;

use decision::Decision;
use filter::FilterCli;

/// Env var holding a tracing filter directive for diagnostics (off by default)
const LOG_ENV: &str = "SECURITY_FILTER_HOOK_LOG";

/// Diagnostics go to stderr, which the host also reads for the block
/// message, so nothing is emitted unless explicitly requested.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();

    let decision = run();
    if let Some(message) = decision.block_message() {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{}", message);
        }
    }

    ExitCode::from(decision.exit_code())
}

/// Run the hook pipeline. Every failure short of an explicit deny allows.
fn run() -> Decision {
    let config = config::load_or_default(&config::get_config_path());

    // Unconfigured: never block work because the filter is absent
    let program = match which::which(&config.filter_command) {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!(
                command = %config.filter_command,
                error = %e,
                "filter not found, allowing"
            );
            return Decision::Allow;
        }
    };

    let input = match input::read_input(io::stdin().lock()) {
        Ok(input) => input,
        Err(e) => {
            tracing::debug!(error = ?e, "unreadable hook input, allowing");
            return Decision::Allow;
        }
    };

    let paths = paths::extract_paths(&input.tool_name, &input.tool_input);
    tracing::debug!(tool = %input.tool_name, count = paths.len(), "extracted candidate paths");

    let judge = FilterCli::new(program.to_string_lossy(), config.timeout);
    decision::evaluate(&paths, &judge)
}
