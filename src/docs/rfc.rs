//! RFC retrieval and search.

use std::sync::Arc;

use chrono::Utc;

use crate::config::BackendConfig;
use crate::docs::model::{DocumentMetadata, DocumentRecord, RfcSummary, Section};
use crate::docs::parse::{parse_rfc_search_results, parse_rfc_text};
use crate::docs::{BackendError, DocumentCache, Progress, ProgressSink, TextSource};

/// Fetches RFCs from the RFC Editor.
pub struct RfcService {
    source: Arc<dyn TextSource>,
    cache: Arc<DocumentCache>,
    base_url: String,
    editor_url: String,
}

impl RfcService {
    /// Creates the service.
    #[must_use]
    pub fn new(source: Arc<dyn TextSource>, cache: Arc<DocumentCache>, config: &BackendConfig) -> Self {
        Self {
            source,
            cache,
            base_url: config.rfc_base_url.trim_end_matches('/').to_string(),
            editor_url: config.rfc_editor_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches and parses an RFC, serving repeated requests from the cache.
    ///
    /// `number` may be given as `2616`, `RFC 2616` or `rfc2616`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number is malformed or the text cannot be
    /// fetched.
    pub async fn fetch(
        &self,
        number: &str,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<Arc<DocumentRecord>, BackendError> {
        let progress = Progress::new(sink);
        let number = normalize_number(number)?;
        progress.report(10, &format!("Starting to fetch RFC {number}"));

        let key = format!("rfc_{number}");
        if let Some(doc) = self.cache.get(&key).await {
            progress.report(80, "Found in cache, retrieving...");
            return Ok(doc);
        }

        let url = format!("{}/rfc{number}.txt", self.base_url);
        progress.report(30, "Downloading RFC text...");
        let text = self.source.get_text(&url).await.map_err(|e| {
            if e.is_not_found() {
                BackendError::NotFound {
                    what: format!("RFC {number}"),
                }
            } else {
                e
            }
        })?;

        progress.report(70, "Parsing RFC content...");
        let parsed = parse_rfc_text(&text, &number);
        tracing::debug!(rfc = %number, sections = parsed.sections.len(), "Parsed RFC");

        let record = DocumentRecord {
            metadata: DocumentMetadata {
                number: Some(number),
                title: parsed.title,
                authors: parsed.authors,
                abstract_text: parsed.abstract_text,
                url,
                ..DocumentMetadata::default()
            },
            sections: parsed.sections,
            full_text: text,
            retrieved_at: Utc::now(),
        };

        Ok(self.cache.insert(key, record).await)
    }

    /// Searches the RFC Editor by title. Failures yield no results.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<RfcSummary> {
        let base = format!("{}/search/rfc_search_detail.php", self.editor_url);
        let url = match reqwest::Url::parse_with_params(
            &base,
            &[("title", query), ("pubstatus[]", "Any"), ("pub_date_type", "any")],
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = %base, error = %e, "Invalid RFC search URL");
                return Vec::new();
            }
        };

        match self.source.get_text(url.as_str()).await {
            Ok(html) => {
                let mut results = parse_rfc_search_results(&html, &self.editor_url);
                results.truncate(limit);
                results
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "RFC search failed");
                Vec::new()
            }
        }
    }

    /// Fetches an RFC and returns the first section whose title contains
    /// `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the RFC cannot be fetched.
    pub async fn fetch_section(&self, number: &str, query: &str) -> Result<Option<Section>, BackendError> {
        let doc = self.fetch(number, None).await?;
        Ok(doc.find_section(query).cloned())
    }
}

/// Reduces `RFC 2616`, `rfc2616` or `02616` to `2616`.
fn normalize_number(raw: &str) -> Result<String, BackendError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .get(..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("rfc"))
        .map_or(trimmed, |_| trimmed[3..].trim_start_matches([' ', '-', '_']));

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(BackendError::NotFound {
            what: format!("RFC {trimmed}"),
        });
    }

    let stripped = digits.trim_start_matches('0');
    Ok(if stripped.is_empty() { "0" } else { stripped }.to_string())
}
