//! Working-group document listings.

use chrono::Utc;
use serde_json::Value;

use crate::docs::datatracker::{document_authors, document_states, document_version, text_field};
use crate::docs::model::{
    WorkingGroupDraft, WorkingGroupInfo, WorkingGroupReport, WorkingGroupRfc, WorkingGroupSummary,
};
use crate::docs::Datatracker;

/// Draft states that mean the draft is no longer live.
const INACTIVE_STATES: [&str; 4] = ["expired", "replaced", "withdrawn", "dead"];

/// Aggregates a working group's RFCs and active drafts.
pub struct WorkingGroupService {
    datatracker: Datatracker,
    rfc_editor_url: String,
}

impl WorkingGroupService {
    /// Creates the service.
    #[must_use]
    pub fn new(datatracker: Datatracker, rfc_editor_url: &str) -> Self {
        Self {
            datatracker,
            rfc_editor_url: rfc_editor_url.trim_end_matches('/').to_string(),
        }
    }

    /// Lists the documents of working group `group`.
    ///
    /// Each part is fetched independently; a part that fails is logged and
    /// reported empty.
    pub async fn documents(
        &self,
        group: &str,
        include_rfcs: bool,
        include_drafts: bool,
        limit: usize,
    ) -> WorkingGroupReport {
        let group = group.trim().to_lowercase();
        let info = self.info(&group).await;

        let rfcs = if include_rfcs {
            self.rfcs(&group, limit).await
        } else {
            Vec::new()
        };
        let drafts = if include_drafts {
            self.drafts(&group, limit).await
        } else {
            Vec::new()
        };

        tracing::debug!(group = %group, rfcs = rfcs.len(), drafts = drafts.len(), "Working group listed");

        WorkingGroupReport {
            summary: WorkingGroupSummary {
                total_rfcs: rfcs.len(),
                total_drafts: drafts.len(),
                total_documents: rfcs.len() + drafts.len(),
            },
            working_group: group,
            working_group_info: info,
            rfcs,
            internet_drafts: drafts,
            retrieved_at: Utc::now(),
        }
    }

    async fn info(&self, group: &str) -> WorkingGroupInfo {
        let lookup = match self.datatracker.api_url("group/group/", &[("acronym", group)]) {
            Ok(url) => self.datatracker.objects(&url).await,
            Err(e) => Err(e),
        };

        match lookup {
            Ok(objects) if !objects.is_empty() => {
                let g = &objects[0];
                WorkingGroupInfo {
                    name: text_field(g, "name"),
                    acronym: text_field(g, "acronym"),
                    description: text_field(g, "description"),
                    state: text_field(g, "state"),
                    kind: text_field(g, "type"),
                }
            }
            Ok(_) => fallback_info(group),
            Err(e) => {
                tracing::warn!(group, error = %e, "Working group info unavailable");
                fallback_info(group)
            }
        }
    }

    async fn rfcs(&self, group: &str, limit: usize) -> Vec<WorkingGroupRfc> {
        let scan_limit = limit.saturating_mul(2).to_string();
        let params = [("type", "rfc"), ("name__icontains", group), ("limit", scan_limit.as_str())];

        let objects = match self.datatracker.documents(&params).await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::warn!(group, error = %e, "Working group RFC listing failed");
                return Vec::new();
            }
        };

        objects
            .iter()
            .filter_map(|doc| {
                let name = text_field(doc, "name");
                let number = name.strip_prefix("rfc")?.to_string();
                Some(WorkingGroupRfc {
                    url: format!("{}/info/{name}", self.rfc_editor_url),
                    number,
                    title: text_field(doc, "title"),
                    authors: document_authors(doc),
                    date: text_field(doc, "time"),
                    status: text_field(doc, "std_level"),
                    abstract_text: text_field(doc, "abstract"),
                    working_group: group.to_string(),
                    name,
                })
            })
            .take(limit)
            .collect()
    }

    async fn drafts(&self, group: &str, limit: usize) -> Vec<WorkingGroupDraft> {
        let prefix = format!("ietf-{group}");
        let scan_limit = limit.saturating_mul(2).to_string();
        let params = [
            ("type", "draft"),
            ("name__icontains", prefix.as_str()),
            ("limit", scan_limit.as_str()),
        ];

        let objects = match self.datatracker.documents(&params).await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::warn!(group, error = %e, "Working group draft listing failed");
                return Vec::new();
            }
        };

        objects
            .iter()
            .filter(|doc| is_active(doc))
            .map(|doc| {
                let name = text_field(doc, "name");
                WorkingGroupDraft {
                    url: self.datatracker.document_page(&name),
                    title: text_field(doc, "title"),
                    authors: document_authors(doc),
                    date: text_field(doc, "time"),
                    status: text_field(doc, "intended_std_level"),
                    abstract_text: text_field(doc, "abstract"),
                    version: document_version(doc),
                    working_group: group.to_string(),
                    state: document_states(doc),
                    name,
                }
            })
            .take(limit)
            .collect()
    }
}

fn is_active(doc: &Value) -> bool {
    !document_states(doc).iter().any(|state| {
        let state = state.to_lowercase();
        INACTIVE_STATES.iter().any(|inactive| state.contains(inactive))
    })
}

fn fallback_info(group: &str) -> WorkingGroupInfo {
    WorkingGroupInfo {
        name: group.to_uppercase(),
        acronym: group.to_string(),
        description: "Working group information not available".to_string(),
        state: "unknown".to_string(),
        kind: "wg".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{BackendError, TextSource};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    /// Answers by URL substring.
    struct Routes(Vec<(&'static str, Value)>);

    #[async_trait]
    impl TextSource for Routes {
        async fn get_text(&self, url: &str) -> Result<String, BackendError> {
            self.0
                .iter()
                .find(|(needle, _)| url.contains(needle))
                .map(|(_, body)| body.to_string())
                .ok_or_else(|| BackendError::Status {
                    url: url.to_string(),
                    status: 500,
                })
        }
    }

    fn service(routes: Vec<(&'static str, Value)>) -> WorkingGroupService {
        let dt = Datatracker::new(Arc::new(Routes(routes)), "https://dt.example");
        WorkingGroupService::new(dt, "https://www.rfc-editor.org")
    }

    #[tokio::test]
    async fn aggregates_rfcs_and_active_drafts() {
        let wg = service(vec![
            (
                "group/group/",
                json!({"objects": [{
                    "name": "Web Authorization Protocol",
                    "acronym": "oauth",
                    "description": "OAuth",
                    "state": "active",
                    "type": "wg"
                }]}),
            ),
            (
                "type=rfc",
                json!({"objects": [
                    {"name": "rfc6749", "title": "The OAuth 2.0 Authorization Framework"},
                    {"name": "bcp225", "title": "not an rfc"}
                ]}),
            ),
            (
                "type=draft",
                json!({"objects": [
                    {"name": "draft-ietf-oauth-v2-1", "rev": "10", "states": [{"name": "Active"}]},
                    {"name": "draft-ietf-oauth-old", "states": ["Expired"]},
                    {"name": "draft-ietf-oauth-gone", "states": [{"name": "Replaced"}]}
                ]}),
            ),
        ]);

        let report = wg.documents("OAuth", true, true, 50).await;

        assert_eq!(report.working_group, "oauth");
        assert_eq!(report.working_group_info.name, "Web Authorization Protocol");
        assert_eq!(report.rfcs.len(), 1);
        assert_eq!(report.rfcs[0].number, "6749");
        assert_eq!(report.rfcs[0].url, "https://www.rfc-editor.org/info/rfc6749");
        assert_eq!(report.internet_drafts.len(), 1);
        assert_eq!(report.internet_drafts[0].version.as_deref(), Some("10"));
        assert_eq!(report.summary.total_documents, 2);
    }

    #[tokio::test]
    async fn failures_degrade_to_fallbacks() {
        let wg = service(Vec::new());
        let report = wg.documents("httpbis", true, false, 10).await;

        assert_eq!(report.working_group_info.name, "HTTPBIS");
        assert_eq!(report.working_group_info.state, "unknown");
        assert!(report.rfcs.is_empty());
        assert!(report.internet_drafts.is_empty());
        assert_eq!(report.summary.total_documents, 0);
    }
}
