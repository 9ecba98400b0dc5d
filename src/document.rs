//! Short, one-row renderings of documents for listings.

use mongodb::bson::{Bson, Document};
use serde::Serialize;

/// Number of leading keys considered for a summary row, `_id` included.
const SUMMARY_KEYS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub id: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl DocumentSummary {
    /// `_id` plus the other fields among the first three keys.
    pub fn from_document(document: &Document) -> Self {
        let id = document.get("_id").map(display_value);
        let fields = document
            .iter()
            .take(SUMMARY_KEYS)
            .filter(|(key, _)| key.as_str() != "_id")
            .map(|(key, value)| (key.clone(), display_value(value)))
            .collect();

        Self { id, fields }
    }
}

/// Strings are shown without quotes; everything else uses the BSON display form.
fn display_value(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_summary_takes_first_three_keys() {
        let document = doc! {
            "_id": 7,
            "name": "Ada",
            "age": 36,
            "email": "ada@example.com",
        };

        let summary = DocumentSummary::from_document(&document);
        assert_eq!(summary.id.as_deref(), Some("7"));
        assert_eq!(
            summary.fields,
            vec![
                ("name".to_string(), "Ada".to_string()),
                ("age".to_string(), "36".to_string()),
            ]
        );
    }

    #[test]
    fn test_summary_without_id() {
        let document = doc! { "a": 1, "b": 2, "c": 3, "d": 4 };

        let summary = DocumentSummary::from_document(&document);
        assert!(summary.id.is_none());
        assert_eq!(summary.fields.len(), 3);
        assert_eq!(summary.fields[2].0, "c");
    }

    #[test]
    fn test_summary_of_empty_document() {
        let summary = DocumentSummary::from_document(&Document::new());
        assert!(summary.id.is_none());
        assert!(summary.fields.is_empty());
    }
}
