//! `clientfit templates`

use crate::manager::ConfigTemplate;
use colored::Colorize;
use prettytable::{format, row, Table};
use serde_json::Value;

/// Build the template table
pub fn templates_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["Name".bold(), "Description".bold(), "Patch".bold()]);
    for template in ConfigTemplate::ALL {
        table.add_row(row![
            template.name().cyan(),
            template.description(),
            Value::Object(template.patch())
        ]);
    }
    table
}

/// Print the template table
pub fn handle_templates() {
    println!("\nConfiguration templates:");
    templates_table().printstd();
    println!();
    println!(
        "Use {} to preview one.",
        "clientfit config show <CLIENT> --template <NAME>".cyan()
    );
    println!();
}
