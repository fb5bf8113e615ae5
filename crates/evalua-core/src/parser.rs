//! TOML catalog parser.
//!
//! A catalog seeds a store with users, questions and exams. Exams refer to
//! questions by a catalog-local `key` and to their creator by username.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{QuestionKind, Role};
use crate::questions::{validate_question, NewOption, NewQuestion};

/// Intermediate TOML structure for parsing catalog files.
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    users: Vec<TomlUser>,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
    #[serde(default)]
    exams: Vec<TomlExam>,
}

#[derive(Debug, Deserialize)]
struct TomlUser {
    username: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    key: String,
    text: String,
    kind: String,
    #[serde(default)]
    options: Vec<NewOption>,
}

#[derive(Debug, Deserialize)]
struct TomlExam {
    title: String,
    #[serde(default)]
    description: String,
    start: String,
    end: String,
    creator: String,
    #[serde(default)]
    questions: Vec<String>,
}

/// A user to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogUser {
    pub username: String,
    pub role: Role,
}

/// A question draft and the key exams use to refer to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuestion {
    pub key: String,
    pub question: NewQuestion,
}

/// An exam whose creator and questions are still symbolic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogExam {
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Creator username.
    pub creator: String,
    /// Question keys in exam order.
    pub questions: Vec<String>,
}

/// Parsed catalog file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub users: Vec<CatalogUser>,
    pub questions: Vec<CatalogQuestion>,
    pub exams: Vec<CatalogExam>,
}

/// Parse a catalog file.
pub fn parse_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a TOML string into a `Catalog` (useful for testing).
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Catalog> {
    let parsed: TomlCatalog = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let users = parsed
        .users
        .into_iter()
        .map(|u| {
            let role: Role = u
                .role
                .parse()
                .map_err(|e: String| anyhow::anyhow!("user {}: {}", u.username, e))?;
            Ok(CatalogUser {
                username: u.username.trim().to_string(),
                role,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let kind: QuestionKind = q
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.key, e))?;
            Ok(CatalogQuestion {
                key: q.key,
                question: NewQuestion {
                    text: q.text,
                    kind,
                    options: q.options,
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let exams = parsed
        .exams
        .into_iter()
        .map(|e| {
            Ok(CatalogExam {
                start_date: parse_timestamp(&e.start)
                    .with_context(|| format!("exam '{}': bad start", e.title))?,
                end_date: parse_timestamp(&e.end)
                    .with_context(|| format!("exam '{}': bad end", e.title))?,
                title: e.title,
                description: e.description,
                creator: e.creator.trim().to_string(),
                questions: e.questions,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Catalog {
        users,
        questions,
        exams,
    })
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("not an RFC 3339 timestamp: {s}"))
}

/// A warning from catalog validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The user, question key or exam title the warning is about.
    pub subject: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn about(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            message: message.into(),
        }
    }
}

/// Validate a catalog for common issues.
///
/// Everything reported here would also be rejected at import time, except
/// creators missing from the catalog, who may already exist in the store.
pub fn validate_catalog(catalog: &Catalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut usernames = HashSet::new();
    for user in &catalog.users {
        if !usernames.insert(user.username.as_str()) {
            warnings.push(ValidationWarning::about(
                &user.username,
                format!("duplicate username: {}", user.username),
            ));
        }
    }
    if !catalog.users.is_empty() && !catalog.users.iter().any(|u| u.role == Role::Admin) {
        warnings.push(ValidationWarning {
            subject: None,
            message: "no ADMIN user; loading into an empty store will fail".into(),
        });
    }

    let mut keys = HashSet::new();
    for entry in &catalog.questions {
        if !keys.insert(entry.key.as_str()) {
            warnings.push(ValidationWarning::about(
                &entry.key,
                format!("duplicate question key: {}", entry.key),
            ));
        }
        if let Err(e) = validate_question(&entry.question.clone().build()) {
            warnings.push(ValidationWarning::about(&entry.key, e.to_string()));
        }
    }

    for exam in &catalog.exams {
        if exam.title.trim().is_empty() {
            warnings.push(ValidationWarning {
                subject: None,
                message: "exam with empty title".into(),
            });
        }
        if exam.start_date >= exam.end_date {
            warnings.push(ValidationWarning::about(
                &exam.title,
                format!("end {} is not after start {}", exam.end_date, exam.start_date),
            ));
        }
        if exam.questions.is_empty() {
            warnings.push(ValidationWarning::about(&exam.title, "exam has no questions"));
        }
        let mut seen = HashSet::new();
        for key in &exam.questions {
            if !keys.contains(key.as_str()) {
                warnings.push(ValidationWarning::about(
                    &exam.title,
                    format!("unknown question key: {key}"),
                ));
            }
            if !seen.insert(key.as_str()) {
                warnings.push(ValidationWarning::about(
                    &exam.title,
                    format!("question {key} listed twice"),
                ));
            }
        }
        match catalog.users.iter().find(|u| u.username == exam.creator) {
            Some(user) if !user.role.can_author() => {
                warnings.push(ValidationWarning::about(
                    &exam.title,
                    format!("creator {} is a {}", exam.creator, user.role),
                ));
            }
            Some(_) => {}
            None => warnings.push(ValidationWarning::about(
                &exam.title,
                format!("creator {} is not in the catalog and must already exist", exam.creator),
            )),
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[[users]]
username = "root"
role = "admin"

[[users]]
username = "tina"
role = "TEACHER"

[[users]]
username = "sam"
role = "student"

[[questions]]
key = "borrow"
text = "How many mutable borrows may coexist?"
kind = "single_choice"

[[questions.options]]
text = "One"
correct = true

[[questions.options]]
text = "Any number"

[[questions]]
key = "why"
text = "Explain ownership."
kind = "open_text"

[[exams]]
title = "Rust basics"
start = "2030-01-01T09:00:00Z"
end = "2030-01-01T11:00:00+01:00"
creator = "tina"
questions = ["borrow", "why"]
"#;

    #[test]
    fn parse_valid_toml() {
        let catalog = parse_catalog_str(VALID_TOML, &PathBuf::from("catalog.toml")).unwrap();
        assert_eq!(catalog.users.len(), 3);
        assert_eq!(catalog.users[1].role, Role::Teacher);
        assert_eq!(catalog.questions.len(), 2);
        let borrow = &catalog.questions[0];
        assert_eq!(borrow.key, "borrow");
        assert_eq!(borrow.question.kind, QuestionKind::SingleChoice);
        assert!(borrow.question.options[0].is_correct);
        assert!(!borrow.question.options[1].is_correct);
        assert_eq!(catalog.exams[0].questions, vec!["borrow", "why"]);
        assert_eq!(
            catalog.exams[0].end_date,
            parse_timestamp("2030-01-01T10:00:00Z").unwrap()
        );
        assert!(validate_catalog(&catalog).is_empty());
    }

    #[test]
    fn unknown_role_is_an_error() {
        let toml = "[[users]]\nusername = \"x\"\nrole = \"janitor\"\n";
        let err = parse_catalog_str(toml, &PathBuf::from("c.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("janitor"));
    }

    #[test]
    fn bad_timestamp_names_the_exam() {
        let toml = r#"
[[exams]]
title = "Late"
start = "tomorrow"
end = "2030-01-01T10:00:00Z"
creator = "tina"
"#;
        let err = parse_catalog_str(toml, &PathBuf::from("c.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("Late"));
    }

    #[test]
    fn validate_reports_broken_references() {
        let toml = r#"
[[users]]
username = "sam"
role = "student"

[[questions]]
key = "q"
text = "Pick"
kind = "single_choice"

[[questions.options]]
text = "A"

[[questions.options]]
text = "B"

[[exams]]
title = "Broken"
start = "2030-01-01T10:00:00Z"
end = "2030-01-01T09:00:00Z"
creator = "sam"
questions = ["q", "missing", "q"]
"#;
        let catalog = parse_catalog_str(toml, &PathBuf::from("c.toml")).unwrap();
        let warnings = validate_catalog(&catalog);
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));
        assert!(has("no ADMIN"));
        assert!(has("exactly 1 correct"));
        assert!(has("not after start"));
        assert!(has("unknown question key: missing"));
        assert!(has("listed twice"));
        assert!(has("is a STUDENT"));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_catalog_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, VALID_TOML).unwrap();
        let catalog = parse_catalog(&path).unwrap();
        assert_eq!(catalog.exams.len(), 1);
    }
}
