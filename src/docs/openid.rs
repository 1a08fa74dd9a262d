//! OpenID Foundation specifications.

use std::sync::Arc;

use chrono::Utc;

use crate::docs::model::{DocumentMetadata, DocumentRecord, OpenIdSummary, Section};
use crate::docs::parse::parse_html;
use crate::docs::{BackendError, DocumentCache, Progress, ProgressSink, TextSource};

/// Published specifications searchable without network access.
const CATALOGUE: &[(&str, &str)] = &[
    ("openid-connect-core-1_0", "OpenID Connect Core 1.0"),
    ("openid-connect-discovery-1_0", "OpenID Connect Discovery 1.0"),
    ("openid-connect-registration-1_0", "OpenID Connect Dynamic Client Registration 1.0"),
    ("openid-connect-session-1_0", "OpenID Connect Session Management 1.0"),
    ("openid-connect-frontchannel-1_0", "OpenID Connect Front-Channel Logout 1.0"),
    ("openid-connect-backchannel-1_0", "OpenID Connect Back-Channel Logout 1.0"),
    ("openid-connect-rpinitiated-1_0", "OpenID Connect RP-Initiated Logout 1.0"),
    ("oauth-v2-multiple-response-types-1_0", "OAuth 2.0 Multiple Response Type Encoding Practices"),
    ("oauth-v2-form-post-response-mode-1_0", "OAuth 2.0 Form Post Response Mode"),
    ("openid-4-verifiable-credential-issuance-1_0", "OpenID for Verifiable Credential Issuance"),
    ("openid-4-verifiable-presentations-1_0", "OpenID for Verifiable Presentations"),
    ("openid-connect-self-issued-v2-1_0", "Self-Issued OpenID Provider v2"),
    ("openid-financial-api-part-1-1_0", "Financial-grade API Security Profile 1.0 - Part 1: Baseline"),
    ("openid-financial-api-part-2-1_0", "Financial-grade API Security Profile 1.0 - Part 2: Advanced"),
    ("fapi-2_0-security-profile", "FAPI 2.0 Security Profile"),
    (
        "openid-client-initiated-backchannel-authentication-core-1_0",
        "OpenID Connect Client-Initiated Backchannel Authentication Flow - Core 1.0",
    ),
    ("openid-connect-4-identity-assurance-1_0", "OpenID Connect for Identity Assurance 1.0"),
    ("openid-federation-1_0", "OpenID Federation 1.0"),
    ("openid-authentication-2_0", "OpenID Authentication 2.0"),
];

/// Fetches OpenID specifications from the OpenID Foundation site.
pub struct OpenIdService {
    source: Arc<dyn TextSource>,
    cache: Arc<DocumentCache>,
    base_url: String,
}

impl OpenIdService {
    /// Creates the service. `base_url` is the directory holding `{name}.html`.
    #[must_use]
    pub fn new(source: Arc<dyn TextSource>, cache: Arc<DocumentCache>, base_url: &str) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Self {
            source,
            cache,
            base_url,
        }
    }

    /// Fetches and parses a specification.
    ///
    /// `name` may carry a `.html` extension or be a full URL under the base.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched.
    pub async fn fetch(
        &self,
        name: &str,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<Arc<DocumentRecord>, BackendError> {
        let progress = Progress::new(sink);
        let name = self.normalize_name(name);
        progress.report(10, &format!("Starting to fetch OpenID specification: {name}"));

        let key = format!("openid_{name}");
        if let Some(doc) = self.cache.get(&key).await {
            progress.report(80, "Found in cache, retrieving...");
            return Ok(doc);
        }

        let url = self.spec_url(&name);
        progress.report(30, "Downloading specification...");
        let html = self.source.get_text(&url).await.map_err(|e| {
            if e.is_not_found() {
                BackendError::NotFound {
                    what: format!("OpenID specification {name}"),
                }
            } else {
                e
            }
        })?;

        progress.report(70, "Parsing HTML content...");
        let parsed = parse_html(&html, &name);
        tracing::debug!(spec = %name, sections = parsed.sections.len(), "Parsed OpenID specification");

        let record = DocumentRecord {
            metadata: DocumentMetadata {
                name: Some(name),
                title: parsed.title,
                url,
                ..DocumentMetadata::default()
            },
            sections: parsed.sections,
            full_text: parsed.text,
            retrieved_at: Utc::now(),
        };

        Ok(self.cache.insert(key, record).await)
    }

    /// Searches the built-in catalogue.
    ///
    /// Every word of `query` must occur in the name or title, ignoring case.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> Vec<OpenIdSummary> {
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();

        CATALOGUE
            .iter()
            .filter(|(name, title)| {
                let haystack = format!("{name} {title}").to_lowercase();
                words.iter().all(|word| haystack.contains(word.as_str()))
            })
            .take(limit)
            .map(|(name, title)| OpenIdSummary {
                name: (*name).to_string(),
                title: (*title).to_string(),
                url: self.spec_url(name),
            })
            .collect()
    }

    /// Fetches a specification and returns the first section whose title
    /// contains `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched.
    pub async fn fetch_section(&self, name: &str, query: &str) -> Result<Option<Section>, BackendError> {
        let doc = self.fetch(name, None).await?;
        Ok(doc.find_section(query).cloned())
    }

    fn spec_url(&self, name: &str) -> String {
        format!("{}{name}.html", self.base_url)
    }

    fn normalize_name(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let relative = trimmed.strip_prefix(self.base_url.as_str()).unwrap_or(trimmed);
        relative.strip_suffix(".html").unwrap_or(relative).to_string()
    }
}
