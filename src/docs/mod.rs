//! Document backend.
//!
//! Retrieves and parses IETF RFCs, Internet-Drafts, working-group listings and
//! OpenID specifications. All services share one [`TextSource`] and one
//! [`DocumentCache`]; the MCP layer reaches them only through
//! [`DocumentService`].

pub mod cache;
pub mod datatracker;
pub mod draft;
mod error;
pub mod model;
pub mod openid;
pub mod parse;
pub mod rfc;
pub mod source;
pub mod working_group;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::BackendConfig;

pub use cache::DocumentCache;
pub use datatracker::Datatracker;
pub use draft::DraftService;
pub use error::BackendError;
pub use model::{DocumentMetadata, DocumentRecord, Section};
pub use openid::OpenIdService;
pub use rfc::RfcService;
pub use source::HttpSource;
pub use working_group::WorkingGroupService;

/// Receives progress updates from a long-running fetch.
pub trait ProgressSink: Send + Sync {
    /// Reports completion percentage (0 to 100) and a status message.
    fn report(&self, percentage: u8, message: &str);
}

/// Something that can fetch a URL as text.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Fetches `url` and returns its body as text.
    async fn get_text(&self, url: &str) -> Result<String, BackendError>;

    /// Fetches `url` and parses the body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value, BackendError> {
        let text = self.get_text(url).await?;
        serde_json::from_str(&text).map_err(|source| BackendError::Json {
            url: url.to_string(),
            source,
        })
    }
}

/// Forwards progress to an optional sink, never moving backwards.
///
/// Fallback paths revisit earlier stages; clients see the furthest stage
/// reached so far.
pub struct Progress<'a> {
    sink: Option<&'a dyn ProgressSink>,
    last: AtomicU8,
}

impl<'a> Progress<'a> {
    /// Wraps an optional sink.
    #[must_use]
    pub const fn new(sink: Option<&'a dyn ProgressSink>) -> Self {
        Self {
            sink,
            last: AtomicU8::new(0),
        }
    }

    /// Reports a stage.
    pub fn report(&self, percentage: u8, message: &str) {
        let Some(sink) = self.sink else {
            return;
        };
        let previous = self.last.fetch_max(percentage, Ordering::Relaxed);
        sink.report(percentage.max(previous), message);
    }
}

/// Facade over every document service.
pub struct DocumentService {
    /// RFCs from the RFC Editor.
    pub rfcs: RfcService,
    /// Internet-Drafts via the Datatracker.
    pub drafts: DraftService,
    /// Working-group listings via the Datatracker.
    pub working_groups: WorkingGroupService,
    /// OpenID Foundation specifications.
    pub openid: OpenIdService,
    cache: Arc<DocumentCache>,
}

impl DocumentService {
    /// Builds the services over a text source.
    #[must_use]
    pub fn new(source: Arc<dyn TextSource>, config: &BackendConfig) -> Self {
        let cache = Arc::new(DocumentCache::new());
        let datatracker = Datatracker::new(Arc::clone(&source), &config.datatracker_url);

        Self {
            rfcs: RfcService::new(Arc::clone(&source), Arc::clone(&cache), config),
            drafts: DraftService::new(datatracker.clone(), Arc::clone(&cache)),
            working_groups: WorkingGroupService::new(datatracker, &config.rfc_editor_url),
            openid: OpenIdService::new(source, Arc::clone(&cache), &config.openid_base_url),
            cache,
        }
    }

    /// Builds the services over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let source = HttpSource::new(config)?;
        Ok(Self::new(Arc::new(source), config))
    }

    /// The shared document cache.
    #[must_use]
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService").finish_non_exhaustive()
    }
}
