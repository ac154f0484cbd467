//! Connection settings for the book store.
//!
//! Settings are read from the `BookStoreDatabase` section of an application settings file,
//! whose keys are PascalCase. Locating and reading that file is left to the caller; this
//! module only parses and validates the section.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DocumentStoreError, DocumentStoreResult};

fn default_books_collection_name() -> String {
    "Books".to_string()
}

/// Where the books collection lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BookStoreSettings {
    pub connection_string: String,
    pub database_name: String,
    #[serde(default = "default_books_collection_name")]
    pub books_collection_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_selection_timeout_ms: Option<u64>,
}

impl BookStoreSettings {
    pub fn new(connection_string: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database_name: database_name.into(),
            books_collection_name: default_books_collection_name(),
            connect_timeout_ms: None,
            server_selection_timeout_ms: None,
        }
    }

    /// Parses the settings section from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Serialization`] if the JSON is malformed, and
    /// [`DocumentStoreError::Initialization`] if a required value is empty.
    pub fn from_json(json: &str) -> DocumentStoreResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.books_collection_name = name.into();
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn server_selection_timeout(&self) -> Option<Duration> {
        self.server_selection_timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> DocumentStoreResult<()> {
        for (key, value) in [
            ("ConnectionString", &self.connection_string),
            ("DatabaseName", &self.database_name),
            ("BooksCollectionName", &self.books_collection_name),
        ] {
            if value.trim().is_empty() {
                return Err(DocumentStoreError::Initialization(format!("{key} must not be empty")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_parses_pascal_case_section() {
        let settings = BookStoreSettings::from_json(
            r#"{
                "ConnectionString": "mongodb://localhost:27017",
                "DatabaseName": "BookStore",
                "BooksCollectionName": "Library",
                "ServerSelectionTimeoutMs": 2500
            }"#,
        )
        .unwrap();

        assert_eq!(settings.connection_string, "mongodb://localhost:27017");
        assert_eq!(settings.database_name, "BookStore");
        assert_eq!(settings.books_collection_name, "Library");
        assert_eq!(settings.server_selection_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(settings.connect_timeout(), None);
    }

    #[rstest]
    fn test_collection_name_defaults_to_books() {
        let settings = BookStoreSettings::from_json(
            r#"{ "ConnectionString": "mongodb://localhost", "DatabaseName": "BookStore" }"#,
        )
        .unwrap();

        assert_eq!(settings.books_collection_name, "Books");
    }

    #[rstest]
    #[case(r#"{ "DatabaseName": "BookStore" }"#)]
    #[case(r#"not json"#)]
    fn test_malformed_section_is_a_serialization_error(#[case] json: &str) {
        assert!(matches!(
            BookStoreSettings::from_json(json),
            Err(DocumentStoreError::Serialization(_))
        ));
    }

    #[rstest]
    fn test_empty_database_name_is_rejected() {
        assert!(matches!(
            BookStoreSettings::from_json(r#"{ "ConnectionString": "mongodb://x", "DatabaseName": " " }"#),
            Err(DocumentStoreError::Initialization(_))
        ));
    }
}
