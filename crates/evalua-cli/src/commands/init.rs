//! The `evalua init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    for (path, content) in [
        ("evalua.toml", SAMPLE_CONFIG),
        ("catalog.toml", EXAMPLE_CATALOG),
        ("answers.json", EXAMPLE_ANSWERS),
    ] {
        if Path::new(path).exists() {
            println!("{path} already exists, skipping.");
        } else {
            std::fs::write(path, content)?;
            println!("Created {path}");
        }
    }

    println!("\nNext steps:");
    println!("  1. Run: evalua validate --catalog catalog.toml");
    println!("  2. Run: evalua load --catalog catalog.toml");
    println!("  3. Run: evalua paper --as sam --exam \"Warm-up quiz\"");
    println!("  4. Run: evalua submit --as sam --exam \"Warm-up quiz\" --answers answers.json --at 2030-01-15T09:30:00Z");
    println!("  5. Run: evalua results --as tina");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# evalua configuration

state_path = "./evalua-state.json"
store_timeout_ms = 5000

[scoring]
# all_or_nothing | proportional
multiple_choice = "all_or_nothing"
"#;

const EXAMPLE_CATALOG: &str = r#"[[users]]
username = "root"
role = "admin"

[[users]]
username = "tina"
role = "teacher"

[[users]]
username = "sam"
role = "student"

[[questions]]
key = "capital"
text = "What is the capital of France?"
kind = "single_choice"

[[questions.options]]
text = "Lyon"

[[questions.options]]
text = "Paris"
correct = true

[[questions]]
key = "evens"
text = "Select the even numbers"
kind = "multiple_choice"

[[questions.options]]
text = "2"
correct = true

[[questions.options]]
text = "3"

[[questions.options]]
text = "4"
correct = true

[[questions]]
key = "essay"
text = "Describe your favourite algorithm"
kind = "open_text"

[[exams]]
title = "Warm-up quiz"
description = "A short example exam"
start = "2030-01-15T09:00:00Z"
end = "2030-01-15T10:00:00Z"
creator = "tina"
questions = ["capital", "evens", "essay"]
"#;

const EXAMPLE_ANSWERS: &str = r#"{
  "1": "Paris",
  "2": ["2", "4"],
  "3": "Quicksort, because it partitions in place."
}
"#;
