//! Internet-Draft retrieval and search.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::docs::datatracker::{document_authors, document_version, text_field};
use crate::docs::model::{DocumentMetadata, DocumentRecord, DraftSummary, Section};
use crate::docs::parse::{extract_version, parse_draft_text, parse_html};
use crate::docs::{BackendError, Datatracker, DocumentCache, Progress, ProgressSink};

/// How many candidates to request when resolving the latest revision.
const VERSION_LOOKUP_LIMIT: &str = "50";

/// Fetches Internet-Drafts through the IETF Datatracker.
pub struct DraftService {
    datatracker: Datatracker,
    cache: Arc<DocumentCache>,
}

impl DraftService {
    /// Creates the service.
    #[must_use]
    pub const fn new(datatracker: Datatracker, cache: Arc<DocumentCache>) -> Self {
        Self { datatracker, cache }
    }

    /// Fetches and parses a draft.
    ///
    /// A name without a `-NN` revision resolves to the latest revision the
    /// Datatracker knows, then to `-00`, then to the bare name.
    ///
    /// # Errors
    ///
    /// Returns an error if no rendition of the draft can be fetched.
    pub async fn fetch(
        &self,
        name: &str,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<Arc<DocumentRecord>, BackendError> {
        let progress = Progress::new(sink);
        let name = normalize_name(name);
        progress.report(10, &format!("Starting to fetch Internet Draft: {name}"));

        if extract_version(&name).is_some() {
            return self.fetch_exact(&name, &progress).await;
        }

        progress.report(20, "Searching for latest version...");
        match self.latest_version(&name, &progress).await {
            Ok(latest) => {
                progress.report(40, &format!("Fetching latest version: {latest}"));
                match self.fetch_exact(&latest, &progress).await {
                    Ok(doc) => return Ok(doc),
                    Err(e) => tracing::warn!(draft = %latest, error = %e, "Latest revision unavailable"),
                }
            }
            Err(e) => tracing::warn!(draft = %name, error = %e, "Revision lookup failed"),
        }

        let first = format!("{name}-00");
        progress.report(45, &format!("Trying fallback: {first}"));
        match self.fetch_exact(&first, &progress).await {
            Ok(doc) => return Ok(doc),
            Err(e) => tracing::debug!(draft = %first, error = %e, "First revision unavailable"),
        }

        self.fetch_exact(&name, &progress).await.map_err(|e| {
            if e.is_not_found() {
                BackendError::NoVersion { name: name.clone() }
            } else {
                e
            }
        })
    }

    /// Searches drafts by name, then by title.
    ///
    /// Results are deduplicated by name and capped at `limit`. Failures yield
    /// no results.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<DraftSummary> {
        let query = query.trim();
        let mut results = Vec::new();

        if query.starts_with("draft-") {
            match self.datatracker.document(&normalize_name(query)).await {
                Ok(doc) if doc.get("name").is_some_and(Value::is_string) => {
                    results.push(self.summary(&doc));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(query, error = %e, "Exact draft lookup failed"),
            }
        }

        if results.is_empty() {
            results = self.search_filtered(query, limit).await;
        }

        let mut seen = HashSet::new();
        results.retain(|summary| seen.insert(summary.name.clone()));
        results.truncate(limit);
        results
    }

    /// Fetches a draft and returns the first section whose title contains
    /// `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft cannot be fetched.
    pub async fn fetch_section(&self, name: &str, query: &str) -> Result<Option<Section>, BackendError> {
        let doc = self.fetch(name, None).await?;
        Ok(doc.find_section(query).cloned())
    }

    async fn search_filtered(&self, query: &str, limit: usize) -> Vec<DraftSummary> {
        let limit_param = limit.to_string();

        for filter in ["name__icontains", "title__icontains"] {
            let params = [("type", "draft"), (filter, query), ("limit", limit_param.as_str())];
            match self.datatracker.documents(&params).await {
                Ok(objects) if !objects.is_empty() => {
                    return objects.iter().map(|doc| self.summary(doc)).collect();
                }
                Ok(_) => tracing::debug!(query, filter, "No drafts matched"),
                Err(e) => tracing::debug!(query, filter, error = %e, "Draft search failed"),
            }
        }

        let scan_limit = limit.saturating_mul(2).to_string();
        let params = [("type", "draft"), ("limit", scan_limit.as_str())];
        let needle = query.to_lowercase();
        match self.datatracker.documents(&params).await {
            Ok(objects) => objects
                .iter()
                .filter(|doc| {
                    text_field(doc, "name").to_lowercase().contains(&needle)
                        || text_field(doc, "title").to_lowercase().contains(&needle)
                })
                .map(|doc| self.summary(doc))
                .collect(),
            Err(e) => {
                tracing::warn!(query, error = %e, "Draft search unavailable");
                Vec::new()
            }
        }
    }

    fn summary(&self, doc: &Value) -> DraftSummary {
        let name = text_field(doc, "name");
        DraftSummary {
            url: self.datatracker.document_page(&name),
            title: text_field(doc, "title"),
            authors: document_authors(doc),
            date: text_field(doc, "time"),
            status: text_field(doc, "intended_std_level"),
            abstract_text: text_field(doc, "abstract"),
            version: document_version(doc),
            working_group: doc.get("group").and_then(Value::as_str).map(str::to_string),
            name,
        }
    }

    async fn latest_version(&self, base: &str, progress: &Progress<'_>) -> Result<String, BackendError> {
        progress.report(25, "Querying IETF API for versions...");
        let objects = self
            .datatracker
            .documents(&[
                ("type", "draft"),
                ("name__startswith", base),
                ("limit", VERSION_LOOKUP_LIMIT),
            ])
            .await?;

        progress.report(35, "Finding latest version...");
        pick_latest(base, &objects).ok_or_else(|| BackendError::NoVersion {
            name: base.to_string(),
        })
    }

    async fn fetch_exact(&self, name: &str, progress: &Progress<'_>) -> Result<Arc<DocumentRecord>, BackendError> {
        let key = format!("draft_{name}");
        if let Some(doc) = self.cache.get(&key).await {
            progress.report(80, "Found in cache, retrieving...");
            return Ok(doc);
        }

        let base = self.datatracker.base_url();
        let txt_url = format!("{base}/doc/txt/{name}.txt");
        progress.report(30, "Downloading TXT format...");

        let record = match self.datatracker.source().get_text(&txt_url).await {
            Ok(text) => {
                progress.report(70, "Parsing draft content...");
                let parsed = parse_draft_text(&text, name);
                DocumentRecord {
                    metadata: DocumentMetadata {
                        name: Some(name.to_string()),
                        title: parsed.title,
                        authors: parsed.authors,
                        abstract_text: parsed.abstract_text,
                        url: txt_url,
                        version: extract_version(name),
                        ..DocumentMetadata::default()
                    },
                    sections: parsed.sections,
                    full_text: text,
                    retrieved_at: Utc::now(),
                }
            }
            Err(text_err) => {
                tracing::debug!(draft = %name, error = %text_err, "TXT rendition unavailable");
                progress.report(50, "TXT failed, trying HTML format...");

                let html_url = format!("{base}/doc/html/{name}");
                let html = self
                    .datatracker
                    .source()
                    .get_text(&html_url)
                    .await
                    .map_err(|html_err| BackendError::Renditions {
                        text: Box::new(text_err),
                        html: Box::new(html_err),
                    })?;

                progress.report(70, "Parsing HTML content...");
                let parsed = parse_html(&html, name);
                DocumentRecord {
                    metadata: DocumentMetadata {
                        name: Some(name.to_string()),
                        title: parsed.title,
                        url: html_url,
                        version: extract_version(name),
                        ..DocumentMetadata::default()
                    },
                    sections: parsed.sections,
                    full_text: parsed.text,
                    retrieved_at: Utc::now(),
                }
            }
        };

        tracing::debug!(draft = %name, sections = record.sections.len(), "Parsed draft");
        Ok(self.cache.insert(key, record).await)
    }
}

/// Strips whitespace and a `.txt` extension.
fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix(".txt").unwrap_or(trimmed).to_string()
}

/// Picks the newest revision of `base` among Datatracker document objects.
///
/// Objects named `base` contribute their `rev` field; objects named
/// `base-NN` contribute `NN`. An object named `base` with no usable `rev` is
/// returned as-is.
fn pick_latest(base: &str, objects: &[Value]) -> Option<String> {
    let mut best: Option<(u32, String)> = None;

    for doc in objects {
        let name = text_field(doc, "name");
        let revision = if name == base {
            match doc.get("rev").and_then(Value::as_str).and_then(|rev| rev.parse::<u32>().ok()) {
                Some(rev) => rev,
                None => return Some(name),
            }
        } else {
            let Some(rev) = name
                .strip_prefix(base)
                .and_then(|rest| rest.strip_prefix('-'))
                .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
                .and_then(|rest| rest.parse::<u32>().ok())
            else {
                continue;
            };
            rev
        };

        if best.as_ref().map_or(true, |(current, _)| revision > *current) {
            best = Some((revision, format!("{base}-{revision:02}")));
        }
    }

    best.map(|(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_txt_extension() {
        assert_eq!(normalize_name(" draft-ietf-oauth-v2-1-10.txt "), "draft-ietf-oauth-v2-1-10");
        assert_eq!(normalize_name("draft-a"), "draft-a");
    }

    #[test]
    fn latest_from_rev_field() {
        let objects = [json!({"name": "draft-ietf-httpbis-semantics", "rev": "19"})];
        assert_eq!(
            pick_latest("draft-ietf-httpbis-semantics", &objects).as_deref(),
            Some("draft-ietf-httpbis-semantics-19")
        );
    }

    #[test]
    fn latest_from_suffixes_ignores_other_drafts() {
        let objects = [
            json!({"name": "draft-foo-bar-02"}),
            json!({"name": "draft-foo-bar-10"}),
            json!({"name": "draft-foo-bar-baz-30"}),
            json!({"name": "draft-foo-bar-07"}),
        ];
        assert_eq!(pick_latest("draft-foo-bar", &objects).as_deref(), Some("draft-foo-bar-10"));
    }

    #[test]
    fn bare_match_without_rev() {
        let objects = [json!({"name": "draft-foo"})];
        assert_eq!(pick_latest("draft-foo", &objects).as_deref(), Some("draft-foo"));
        assert!(pick_latest("draft-foo", &[]).is_none());
    }
}
