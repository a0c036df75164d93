//! `clientfit profiles`

use super::CommandContext;
use crate::client::ClientProfile;
use colored::Colorize;
use prettytable::{format, row, Table};

/// Build the profile table in detection order, fallback last
pub fn profiles_table(ctx: &CommandContext) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "#".bold(),
        "ID".bold(),
        "Name".bold(),
        "Complexity".bold(),
        "Tools".bold(),
        "Output".bold(),
        "Escape".bold(),
        "Signature".bold()
    ]);

    for (index, profile) in ctx.profiles.iter().enumerate() {
        add_profile_row(&mut table, &(index + 1).to_string(), profile);
    }
    add_profile_row(&mut table, "fallback", ctx.profiles.fallback());
    table
}

fn add_profile_row(table: &mut Table, order: &str, profile: &ClientProfile) {
    let caps = &profile.capabilities;
    let signature = if profile.signature.is_some() { "yes" } else { "-" };
    table.add_row(row![
        order,
        profile.id.cyan(),
        profile.name,
        caps.tool_complexity,
        caps.max_tools_per_call,
        caps.output_format,
        caps.escape_handling,
        signature
    ]);
}

/// Print the profile table
pub fn handle_profiles(ctx: &CommandContext) {
    println!("\nClient profiles (detection order):");
    profiles_table(ctx).printstd();
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn test_table_lists_every_profile_and_fallback() {
        let ctx = CommandContext::new(Settings::default()).unwrap();
        let table = profiles_table(&ctx);
        // header + profiles + fallback
        assert_eq!(table.len(), ctx.profiles.len() + 2);
        let rendered = table.to_string();
        assert!(rendered.contains("claude-desktop"));
        assert!(rendered.contains("fallback"));
    }
}
