//! The `evalua validate` command.

use std::path::PathBuf;

use anyhow::Result;

use evalua_core::parser;

pub fn execute(catalog_path: PathBuf) -> Result<()> {
    let catalog = parser::parse_catalog(&catalog_path)?;
    println!(
        "Catalog: {} ({} users, {} questions, {} exams)",
        catalog_path.display(),
        catalog.users.len(),
        catalog.questions.len(),
        catalog.exams.len()
    );

    let warnings = parser::validate_catalog(&catalog);
    for w in &warnings {
        let prefix = w
            .subject
            .as_ref()
            .map(|s| format!("  [{s}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Catalog valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
