//! Shared plumbing for the `seqsmith` and `treesmith` binaries.

use colored::Colorize;
use seqsmith_core::SeqsmithError;
use tracing_subscriber::EnvFilter;

/// Initialize logging with SEQSMITH_LOG environment variable support.
pub fn init_tracing() {
    let log_level = std::env::var("SEQSMITH_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Map error variants to process exit codes.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<SeqsmithError>() {
        Some(SeqsmithError::Configuration(_)) => 2,
        Some(SeqsmithError::Io(_)) => 3,
        Some(SeqsmithError::Parse(_)) | Some(SeqsmithError::Format(_)) => 4,
        Some(SeqsmithError::External(_)) => 5,
        _ => 1,
    }
}

/// Report a fatal error and return the exit code to use.
pub fn report_error(err: &anyhow::Error) -> i32 {
    eprintln!("{} {:#}", "Error:".red().bold(), err);
    exit_code(err)
}

/// stderr gated on `-q`
pub fn stderr_message(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
