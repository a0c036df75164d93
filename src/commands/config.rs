//! `clientfit config`

use super::CommandContext;
use crate::cli::ConfigCommand;
use crate::error::Result;
use crate::manager::ClientConfig;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Resolve a client's configuration, optionally with a template applied
///
/// # Errors
///
/// Returns `ClientFitError::UnknownTemplate` for an unknown template name
pub fn show(ctx: &CommandContext, client_id: &str, template: Option<&str>) -> Result<ClientConfig> {
    if let Some(template) = template {
        ctx.manager.apply_template(client_id, template)?;
    }
    Ok(ctx.manager.get_config(client_id))
}

/// Where an export without `--output` is written, if anywhere
pub fn default_export_path(ctx: &CommandContext, client_id: &str) -> Option<PathBuf> {
    ctx.settings
        .persistence
        .export_dir
        .as_ref()
        .map(|dir| dir.join(format!("{}.json", client_id)))
}

/// Handle config commands
///
/// # Errors
///
/// Returns error if a template is unknown, a file cannot be written or
/// read, or an imported configuration fails validation
pub fn handle_config(ctx: &CommandContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show {
            client_id,
            template,
        } => {
            let config = show(ctx, &client_id, template.as_deref())?;
            for error in &config.dropped {
                eprintln!("{} {}", "dropped:".yellow(), error);
            }
            for warning in &config.warnings {
                eprintln!("{} {}", "warning:".yellow(), warning);
            }
            println!("{}", serde_json::to_string_pretty(&config.values)?);
        }
        ConfigCommand::Export { client_id, output } => {
            match output.or_else(|| default_export_path(ctx, &client_id)) {
                Some(path) => {
                    ctx.manager.export_config_to_file(&client_id, &path)?;
                    println!(
                        "{}",
                        format!("Exported {} to {}", client_id, path.display()).green()
                    );
                }
                None => {
                    let export = ctx.manager.export_config(&client_id);
                    println!("{}", serde_json::to_string_pretty(&export)?);
                }
            }
        }
        ConfigCommand::Import { file } => {
            let client_id = import(ctx, &file)?;
            println!("{}", format!("Imported configuration for {}", client_id).green());
            println!(
                "{}",
                serde_json::to_string_pretty(&ctx.manager.get_config(&client_id).values)?
            );
        }
    }
    Ok(())
}

fn import(ctx: &CommandContext, file: &Path) -> Result<String> {
    ctx.manager.import_config_from_file(file)
}
