//! `clientfit detect`

use super::CommandContext;
use crate::client::{ClientContext, ConnectionMetadata};
use crate::error::{ClientFitError, Result};
use serde_json::Value;

/// Build connection metadata from CLI arguments
///
/// # Errors
///
/// Returns `ClientFitError::Config` if `capabilities` is not a JSON object
pub fn build_metadata(
    user_agent: Option<String>,
    client_name: Option<String>,
    capabilities: Option<&str>,
    use_env: bool,
) -> Result<ConnectionMetadata> {
    let capabilities = match capabilities {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Some(map),
            other => {
                return Err(ClientFitError::Config(format!(
                    "--capabilities must be a JSON object, got {}",
                    other
                ))
                .into())
            }
        },
        None => None,
    };

    let metadata = ConnectionMetadata {
        user_agent,
        client_name,
        capabilities,
        transport: Some("cli".to_string()),
        ..Default::default()
    };
    Ok(if use_env {
        metadata.with_process_env()
    } else {
        metadata
    })
}

/// Detect a client and resolve its capabilities through the config layers
pub fn resolve(ctx: &CommandContext, metadata: &ConnectionMetadata) -> ClientContext {
    let mut context = ctx.detector().detect(metadata);
    context.capabilities = ctx.manager.resolve_for(&context).capabilities();
    context
}

/// Print the resolved context as JSON
///
/// # Errors
///
/// Returns error if the capabilities argument is invalid
pub fn handle_detect(
    ctx: &CommandContext,
    user_agent: Option<String>,
    client_name: Option<String>,
    capabilities: Option<String>,
    use_env: bool,
) -> Result<()> {
    let metadata = build_metadata(user_agent, client_name, capabilities.as_deref(), use_env)?;
    let context = resolve(ctx, &metadata);
    tracing::debug!("Detected {} via {}", context.client_id(), context.detection_method);
    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}
