//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use crate::domain::error::LifecycleError;

/// Report a command failure and exit non-zero.
///
/// Lifecycle errors keep their kind, identifier, and last observed status
/// in JSON mode so scripts can branch on them.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let lifecycle = err.downcast_ref::<LifecycleError>();
    let code = match lifecycle {
        Some(e) if !e.is_failure() => 130,
        _ => 1,
    };

    if json_mode {
        let body = serde_json::json!({
            "error": format!("{err:#}"),
            "kind": lifecycle.map(|e| e.kind().as_str()),
            "identifier": lifecycle.and_then(LifecycleError::identifier).map(ToString::to_string),
            "last_status": lifecycle
                .and_then(LifecycleError::last_status)
                .map(|s| s.as_str().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }

    std::process::exit(code);
}
