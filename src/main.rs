//! ClientFit - client capability detection and adaptation
//!
//! Main entry point for the `clientfit` inspection CLI.

use anyhow::Result;

use clientfit::cli::{Cli, Commands};
use clientfit::commands::{self, CommandContext};
use clientfit::config::Settings;
use clientfit::logging::init_logging;

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load and validate settings before logging so the configured level applies
    let config_path = cli.config.as_deref().unwrap_or("config/clientfit.yaml");
    let settings = Settings::load(config_path, &cli)?;
    settings.validate()?;

    init_logging(&settings.logging)?;
    tracing::debug!("Loaded settings from {}", config_path);

    let ctx = CommandContext::new(settings)?;

    match cli.command {
        Commands::Detect {
            user_agent,
            client_name,
            capabilities,
            use_env,
        } => commands::detect::handle_detect(&ctx, user_agent, client_name, capabilities, use_env),
        Commands::Profiles => {
            commands::profiles::handle_profiles(&ctx);
            Ok(())
        }
        Commands::Config { command } => commands::config::handle_config(&ctx, command),
        Commands::Templates => {
            commands::templates::handle_templates();
            Ok(())
        }
    }
}
