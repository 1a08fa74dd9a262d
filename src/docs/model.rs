//! Document data model.
//!
//! All types serialise with camelCase keys, which is the shape tool output
//! is reported in.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One numbered or headed section of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Section heading, without its number.
    pub title: String,
    /// Section body text.
    pub content: String,
}

/// Descriptive fields of a fetched document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// RFC number, for RFCs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    /// Document name, for drafts and OpenID specifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub title: String,
    pub authors: Vec<String>,
    pub date: String,
    pub status: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Where the document was retrieved from.
    pub url: String,
    /// Two-digit revision, for drafts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A fetched and parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub metadata: DocumentMetadata,
    pub sections: Vec<Section>,
    pub full_text: String,
    pub retrieved_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Finds the first section whose title contains `query`, ignoring case.
    #[must_use]
    pub fn find_section(&self, query: &str) -> Option<&Section> {
        let needle = query.trim().to_lowercase();
        self.sections
            .iter()
            .find(|s| s.title.to_lowercase().contains(&needle))
    }
}

/// An RFC search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RfcSummary {
    pub number: String,
    pub title: String,
    pub authors: Vec<String>,
    pub date: String,
    pub status: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
}

/// An Internet-Draft search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub name: String,
    pub title: String,
    pub authors: Vec<String>,
    pub date: String,
    pub status: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub version: Option<String>,
    pub working_group: Option<String>,
}

/// An OpenID specification catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenIdSummary {
    pub name: String,
    pub title: String,
    pub url: String,
}

/// Descriptive information about a working group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkingGroupInfo {
    pub name: String,
    pub acronym: String,
    pub description: String,
    pub state: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// An RFC produced by a working group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingGroupRfc {
    pub number: String,
    pub name: String,
    pub title: String,
    pub authors: Vec<String>,
    pub date: String,
    pub status: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub working_group: String,
}

/// An active Internet-Draft of a working group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingGroupDraft {
    pub name: String,
    pub title: String,
    pub authors: Vec<String>,
    pub date: String,
    pub status: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub version: Option<String>,
    pub working_group: String,
    pub state: Vec<String>,
}

/// Document counts for a working group report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingGroupSummary {
    pub total_rfcs: usize,
    pub total_drafts: usize,
    pub total_documents: usize,
}

/// Everything known about a working group's documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingGroupReport {
    pub working_group: String,
    pub working_group_info: WorkingGroupInfo,
    pub rfcs: Vec<WorkingGroupRfc>,
    pub internet_drafts: Vec<WorkingGroupDraft>,
    pub summary: WorkingGroupSummary,
    pub retrieved_at: DateTime<Utc>,
}
