//! IETF Datatracker API access.

use std::sync::Arc;

use serde_json::Value;

use crate::docs::parse::extract_version;
use crate::docs::{BackendError, TextSource};

/// Thin client for the Datatracker's JSON API.
#[derive(Clone)]
pub struct Datatracker {
    source: Arc<dyn TextSource>,
    base_url: String,
}

impl Datatracker {
    /// Creates a client rooted at `base_url`.
    #[must_use]
    pub fn new(source: Arc<dyn TextSource>, base_url: &str) -> Self {
        Self {
            source,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The site root, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying text source.
    #[must_use]
    pub fn source(&self) -> &dyn TextSource {
        self.source.as_ref()
    }

    /// Human-facing page for a document.
    #[must_use]
    pub fn document_page(&self, name: &str) -> String {
        format!("{}/doc/{name}/", self.base_url)
    }

    /// Builds an API URL with `format=json` and the given query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is malformed.
    pub fn api_url(&self, path: &str, params: &[(&str, &str)]) -> Result<String, BackendError> {
        let base = format!("{}/api/v1/{path}", self.base_url);
        let pairs = std::iter::once(("format", "json")).chain(params.iter().copied());
        reqwest::Url::parse_with_params(&base, pairs)
            .map(String::from)
            .map_err(|e| BackendError::InvalidUrl {
                url: base,
                reason: e.to_string(),
            })
    }

    /// Queries `doc/document/` and returns its `objects` array.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub async fn documents(&self, params: &[(&str, &str)]) -> Result<Vec<Value>, BackendError> {
        let url = self.api_url("doc/document/", params)?;
        self.objects(&url).await
    }

    /// Fetches a JSON list endpoint and returns its `objects` array.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub async fn objects(&self, url: &str) -> Result<Vec<Value>, BackendError> {
        let data = self.source.get_json(url).await?;
        Ok(match data.get("objects") {
            Some(Value::Array(objects)) => objects.clone(),
            _ => Vec::new(),
        })
    }

    /// Fetches a single document object by exact name.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub async fn document(&self, name: &str) -> Result<Value, BackendError> {
        let url = self.api_url(&format!("doc/document/{name}/"), &[])?;
        self.source.get_json(&url).await
    }
}

/// Reads a field as display text: strings as-is, null or missing as empty.
#[must_use]
pub fn text_field(doc: &Value, key: &str) -> String {
    match doc.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Revision of an API document object, from its name or its `rev` field.
#[must_use]
pub fn document_version(doc: &Value) -> Option<String> {
    extract_version(&text_field(doc, "name")).or_else(|| {
        doc.get("rev")
            .and_then(Value::as_str)
            .filter(|rev| !rev.is_empty() && rev.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    })
}

/// Author names from an API document object.
///
/// Entries may be objects with a `person` (object with `name`, or string) or a
/// `name`, or plain values.
#[must_use]
pub fn document_authors(doc: &Value) -> Vec<String> {
    let Some(Value::Array(authors)) = doc.get("authors") else {
        return Vec::new();
    };

    authors
        .iter()
        .filter_map(|author| match author {
            Value::Object(obj) => match obj.get("person") {
                Some(Value::Object(person)) => person
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                Some(Value::Null) | None => obj.get("name").and_then(Value::as_str).map(str::to_string),
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            },
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// State names from an API document object.
#[must_use]
pub fn document_states(doc: &Value) -> Vec<String> {
    let Some(Value::Array(states)) = doc.get("states") else {
        return Vec::new();
    };

    states
        .iter()
        .filter_map(|state| match state {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => Some(obj.get("name").and_then(Value::as_str).unwrap_or_default().to_string()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Never;

    #[async_trait]
    impl TextSource for Never {
        async fn get_text(&self, url: &str) -> Result<String, BackendError> {
            Err(BackendError::NotFound {
                what: url.to_string(),
            })
        }
    }

    #[test]
    fn api_url_encodes_parameters() {
        let dt = Datatracker::new(Arc::new(Never), "https://datatracker.ietf.org/");
        let url = dt
            .api_url("doc/document/", &[("name__icontains", "oauth 2&x"), ("limit", "5")])
            .unwrap();
        assert_eq!(
            url,
            "https://datatracker.ietf.org/api/v1/doc/document/?format=json&name__icontains=oauth+2%26x&limit=5"
        );
        assert_eq!(
            dt.document_page("draft-a-b"),
            "https://datatracker.ietf.org/doc/draft-a-b/"
        );
    }

    #[test]
    fn field_helpers() {
        let doc = json!({
            "name": "draft-ietf-httpbis-semantics",
            "rev": "19",
            "title": "HTTP Semantics",
            "intended_std_level": null,
            "pages": 12,
            "authors": [
                {"person": {"name": "R. Fielding"}},
                {"name": "M. Nottingham"},
                {"person": "/api/v1/person/person/1/"},
                "J. Reschke",
                null
            ],
            "states": [{"name": "Active"}, "/api/v1/doc/state/3/"]
        });

        assert_eq!(text_field(&doc, "title"), "HTTP Semantics");
        assert_eq!(text_field(&doc, "intended_std_level"), "");
        assert_eq!(text_field(&doc, "pages"), "12");
        assert_eq!(text_field(&doc, "missing"), "");
        assert_eq!(document_version(&doc).as_deref(), Some("19"));
        assert_eq!(
            document_authors(&doc),
            ["R. Fielding", "M. Nottingham", "/api/v1/person/person/1/", "J. Reschke"]
        );
        assert_eq!(document_states(&doc), ["Active", "/api/v1/doc/state/3/"]);
    }

    #[tokio::test]
    async fn objects_missing_is_empty() {
        struct Body;

        #[async_trait]
        impl TextSource for Body {
            async fn get_text(&self, _url: &str) -> Result<String, BackendError> {
                Ok(r#"{"meta": {}}"#.to_string())
            }
        }

        let dt = Datatracker::new(Arc::new(Body), "https://dt.example");
        assert!(dt.documents(&[]).await.unwrap().is_empty());
    }
}
