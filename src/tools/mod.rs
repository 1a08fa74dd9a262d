//! MCP tools over the document backend.
//!
//! Every tool is a [`DocumentTool`] of some [`ToolKind`]; [`register_all`]
//! installs them in listing order.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::docs::{DocumentRecord, DocumentService, ProgressSink};
use crate::error::ToolError;
use crate::mcp::registry::{ToolContext, ToolDescriptor, ToolHandler, ToolRegistry};

const DEFAULT_SEARCH_LIMIT: usize = 10;
const DEFAULT_GROUP_LIMIT: usize = 50;

/// The tools this server offers, in listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Fetch an RFC by number.
    GetRfc,
    /// Search the RFC Editor index.
    SearchRfcs,
    /// Fetch one section of an RFC.
    GetRfcSection,
    /// Fetch an Internet-Draft, resolving the latest revision.
    GetInternetDraft,
    /// Search Internet-Drafts by name or title.
    SearchInternetDrafts,
    /// Fetch one section of an Internet-Draft.
    GetInternetDraftSection,
    /// List a working group's RFCs and active drafts.
    GetWorkingGroupDocuments,
    /// Fetch an OpenID specification.
    GetOpenidSpec,
    /// Search the OpenID specification catalogue.
    SearchOpenidSpecs,
    /// Fetch one section of an OpenID specification.
    GetOpenidSpecSection,
}

impl ToolKind {
    /// All tools in registration order.
    pub const ALL: [Self; 10] = [
        Self::GetRfc,
        Self::SearchRfcs,
        Self::GetRfcSection,
        Self::GetInternetDraft,
        Self::SearchInternetDrafts,
        Self::GetInternetDraftSection,
        Self::GetWorkingGroupDocuments,
        Self::GetOpenidSpec,
        Self::SearchOpenidSpecs,
        Self::GetOpenidSpecSection,
    ];

    /// The tool name clients call.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GetRfc => "get_rfc",
            Self::SearchRfcs => "search_rfcs",
            Self::GetRfcSection => "get_rfc_section",
            Self::GetInternetDraft => "get_internet_draft",
            Self::SearchInternetDrafts => "search_internet_drafts",
            Self::GetInternetDraftSection => "get_internet_draft_section",
            Self::GetWorkingGroupDocuments => "get_working_group_documents",
            Self::GetOpenidSpec => "get_openid_spec",
            Self::SearchOpenidSpecs => "search_openid_specs",
            Self::GetOpenidSpecSection => "get_openid_spec_section",
        }
    }

    /// Schema identifier, also accepted as an argument wrapper key.
    #[must_use]
    pub const fn schema_id(self) -> &'static str {
        match self {
            Self::GetRfc => "GetRfcInput",
            Self::SearchRfcs => "SearchRfcsInput",
            Self::GetRfcSection => "GetRfcSectionInput",
            Self::GetInternetDraft => "GetInternetDraftInput",
            Self::SearchInternetDrafts => "SearchInternetDraftsInput",
            Self::GetInternetDraftSection => "GetInternetDraftSectionInput",
            Self::GetWorkingGroupDocuments => "GetWorkingGroupDocumentsInput",
            Self::GetOpenidSpec => "GetOpenidSpecInput",
            Self::SearchOpenidSpecs => "SearchOpenidSpecsInput",
            Self::GetOpenidSpecSection => "GetOpenidSpecSectionInput",
        }
    }

    /// Whether the tool reports progress while fetching.
    #[must_use]
    pub const fn supports_progress(self) -> bool {
        matches!(self, Self::GetRfc | Self::GetInternetDraft | Self::GetOpenidSpec)
    }

    const fn description(self) -> &'static str {
        match self {
            Self::GetRfc => {
                "Fetch an RFC document by its number. Returns the title, authors, abstract \
                 and numbered sections; use format to limit the output."
            }
            Self::SearchRfcs => "Search for RFCs by keyword in their titles.",
            Self::GetRfcSection => {
                "Get a specific section of an RFC, matched by a case-insensitive substring of \
                 its title."
            }
            Self::GetInternetDraft => {
                "Fetch an Internet Draft by name. A name without a revision suffix resolves \
                 to the latest revision."
            }
            Self::SearchInternetDrafts => "Search for Internet Drafts by name or title.",
            Self::GetInternetDraftSection => "Get a specific section of an Internet Draft.",
            Self::GetWorkingGroupDocuments => {
                "List the RFCs and active Internet Drafts of an IETF working group."
            }
            Self::GetOpenidSpec => "Fetch an OpenID Foundation specification by name.",
            Self::SearchOpenidSpecs => "Search published OpenID Foundation specifications.",
            Self::GetOpenidSpecSection => "Get a specific section of an OpenID specification.",
        }
    }

    fn input_schema(self) -> Value {
        let format = json!({
            "type": "string",
            "enum": ["full", "metadata", "sections"],
            "description": "Output format (default: full)",
            "default": "full"
        });
        let query = json!({
            "type": "string",
            "description": "Search keywords"
        });
        let limit = json!({
            "type": "integer",
            "description": "Maximum number of results (default: 10)",
            "default": DEFAULT_SEARCH_LIMIT
        });
        let section = json!({
            "type": "string",
            "description": "Section title or part of it, e.g. \"Security Considerations\""
        });
        let rfc_number = json!({
            "type": "string",
            "description": "RFC number, e.g. \"2616\""
        });
        let draft_name = json!({
            "type": "string",
            "description": "Draft name, e.g. \"draft-ietf-httpbis-semantics\", optionally with a revision suffix"
        });
        let openid_name = json!({
            "type": "string",
            "description": "Specification name, e.g. \"openid-connect-core-1_0\""
        });

        let (properties, required) = match self {
            Self::GetRfc => (json!({"number": rfc_number, "format": format}), json!(["number"])),
            Self::SearchRfcs | Self::SearchInternetDrafts | Self::SearchOpenidSpecs => {
                (json!({"query": query, "limit": limit}), json!(["query"]))
            }
            Self::GetRfcSection => (
                json!({"number": rfc_number, "section": section}),
                json!(["number", "section"]),
            ),
            Self::GetInternetDraft => (json!({"name": draft_name, "format": format}), json!(["name"])),
            Self::GetInternetDraftSection => (
                json!({"name": draft_name, "section": section}),
                json!(["name", "section"]),
            ),
            Self::GetWorkingGroupDocuments => (
                json!({
                    "working_group": {
                        "type": "string",
                        "description": "Working group acronym, e.g. \"httpbis\""
                    },
                    "include_rfcs": {
                        "type": "boolean",
                        "description": "Include published RFCs (default: true)",
                        "default": true
                    },
                    "include_drafts": {
                        "type": "boolean",
                        "description": "Include active Internet Drafts (default: true)",
                        "default": true
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of documents of each kind (default: 50)",
                        "default": DEFAULT_GROUP_LIMIT
                    }
                }),
                json!(["working_group"]),
            ),
            Self::GetOpenidSpec => (json!({"name": openid_name, "format": format}), json!(["name"])),
            Self::GetOpenidSpecSection => (
                json!({"name": openid_name, "section": section}),
                json!(["name", "section"]),
            ),
        };

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }
}

/// How much of a fetched document a tool returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Full,
    Metadata,
    Sections,
}

impl OutputFormat {
    fn from_context(ctx: &ToolContext) -> Result<Self, ToolError> {
        match ctx.str_or("format", "full").to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "metadata" => Ok(Self::Metadata),
            "sections" => Ok(Self::Sections),
            other => Err(ToolError::InvalidArguments(format!(
                "unknown format '{other}', expected full, metadata or sections"
            ))),
        }
    }

    fn render(self, doc: &DocumentRecord) -> Result<String, ToolError> {
        Ok(match self {
            Self::Full => pretty(doc)?,
            Self::Metadata => pretty(&doc.metadata)?,
            Self::Sections => pretty(&doc.sections)?,
        })
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, ToolError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// A tool backed by the document services.
pub struct DocumentTool {
    kind: ToolKind,
    docs: Arc<DocumentService>,
}

impl DocumentTool {
    /// Creates the tool of the given kind.
    #[must_use]
    pub const fn new(kind: ToolKind, docs: Arc<DocumentService>) -> Self {
        Self { kind, docs }
    }

    /// Builds the registry entry for this tool.
    #[must_use]
    pub fn into_descriptor(self) -> ToolDescriptor {
        let kind = self.kind;
        ToolDescriptor {
            name: kind.name().to_string(),
            description: kind.description().to_string(),
            schema_id: kind.schema_id().to_string(),
            input_schema: Some(kind.input_schema()),
            supports_progress: kind.supports_progress(),
            handler: Arc::new(self),
        }
    }

    async fn get_rfc(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let number = ctx.required_str("number")?;
        let format = OutputFormat::from_context(ctx)?;
        let sink = sink(ctx);

        let doc = self
            .docs
            .rfcs
            .fetch(&number, sink)
            .await
            .map_err(|e| ToolError::backend(format!("Error fetching RFC {number}"), e))?;

        report(sink, 90, "Processing RFC content...");
        let output = format.render(&doc)?;
        report(sink, 100, "RFC fetch completed");
        Ok(output)
    }

    async fn search_rfcs(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let query = ctx.required_str("query")?;
        let limit = ctx.usize_or("limit", DEFAULT_SEARCH_LIMIT);
        pretty(&self.docs.rfcs.search(&query, limit).await)
    }

    async fn get_rfc_section(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let number = ctx.required_str("number")?;
        let section = ctx.required_str("section")?;

        match self.docs.rfcs.fetch_section(&number, &section).await {
            Ok(Some(found)) => pretty(&found),
            Ok(None) => Ok(format!("Section \"{section}\" not found in RFC {number}")),
            Err(e) => Err(ToolError::backend(
                format!("Error fetching section from RFC {number}"),
                e,
            )),
        }
    }

    async fn get_internet_draft(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let name = ctx.required_str("name")?;
        let format = OutputFormat::from_context(ctx)?;
        let sink = sink(ctx);

        let doc = self
            .docs
            .drafts
            .fetch(&name, sink)
            .await
            .map_err(|e| ToolError::backend(format!("Error fetching Internet Draft {name}"), e))?;

        report(sink, 90, "Processing draft content...");
        let output = format.render(&doc)?;
        report(sink, 100, "Internet Draft fetch completed");
        Ok(output)
    }

    async fn search_internet_drafts(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let query = ctx.required_str("query")?;
        let limit = ctx.usize_or("limit", DEFAULT_SEARCH_LIMIT);
        pretty(&self.docs.drafts.search(&query, limit).await)
    }

    async fn get_internet_draft_section(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let name = ctx.required_str("name")?;
        let section = ctx.required_str("section")?;

        match self.docs.drafts.fetch_section(&name, &section).await {
            Ok(Some(found)) => pretty(&found),
            Ok(None) => Ok(format!("Section \"{section}\" not found in Internet Draft {name}")),
            Err(e) => Err(ToolError::backend(
                format!("Error fetching section from Internet Draft {name}"),
                e,
            )),
        }
    }

    async fn get_working_group_documents(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let group = ctx.required_str("working_group")?;
        let include_rfcs = ctx.bool_or("include_rfcs", true);
        let include_drafts = ctx.bool_or("include_drafts", true);
        let limit = ctx.usize_or("limit", DEFAULT_GROUP_LIMIT);

        let report = self
            .docs
            .working_groups
            .documents(&group, include_rfcs, include_drafts, limit)
            .await;
        pretty(&report)
    }

    async fn get_openid_spec(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let name = ctx.required_str("name")?;
        let format = OutputFormat::from_context(ctx)?;
        let sink = sink(ctx);

        let doc = self.docs.openid.fetch(&name, sink).await.map_err(|e| {
            ToolError::backend(format!("Error fetching OpenID specification {name}"), e)
        })?;

        report(sink, 90, "Processing specification content...");
        let output = format.render(&doc)?;
        report(sink, 100, "OpenID specification fetch completed");
        Ok(output)
    }

    fn search_openid_specs(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let query = ctx.required_str("query")?;
        let limit = ctx.usize_or("limit", DEFAULT_SEARCH_LIMIT);
        pretty(&self.docs.openid.search(&query, limit))
    }

    async fn get_openid_spec_section(&self, ctx: &ToolContext) -> Result<String, ToolError> {
        let name = ctx.required_str("name")?;
        let section = ctx.required_str("section")?;

        match self.docs.openid.fetch_section(&name, &section).await {
            Ok(Some(found)) => pretty(&found),
            Ok(None) => Ok(format!(
                "Section \"{section}\" not found in OpenID specification {name}"
            )),
            Err(e) => Err(ToolError::backend(
                format!("Error fetching section from OpenID specification {name}"),
                e,
            )),
        }
    }
}

#[async_trait]
impl ToolHandler for DocumentTool {
    async fn call(&self, ctx: ToolContext) -> Result<String, ToolError> {
        match self.kind {
            ToolKind::GetRfc => self.get_rfc(&ctx).await,
            ToolKind::SearchRfcs => self.search_rfcs(&ctx).await,
            ToolKind::GetRfcSection => self.get_rfc_section(&ctx).await,
            ToolKind::GetInternetDraft => self.get_internet_draft(&ctx).await,
            ToolKind::SearchInternetDrafts => self.search_internet_drafts(&ctx).await,
            ToolKind::GetInternetDraftSection => self.get_internet_draft_section(&ctx).await,
            ToolKind::GetWorkingGroupDocuments => self.get_working_group_documents(&ctx).await,
            ToolKind::GetOpenidSpec => self.get_openid_spec(&ctx).await,
            ToolKind::SearchOpenidSpecs => self.search_openid_specs(&ctx),
            ToolKind::GetOpenidSpecSection => self.get_openid_spec_section(&ctx).await,
        }
    }
}

fn sink(ctx: &ToolContext) -> Option<&dyn ProgressSink> {
    ctx.progress.as_ref().map(|p| p as &dyn ProgressSink)
}

fn report(sink: Option<&dyn ProgressSink>, percentage: u8, message: &str) {
    if let Some(sink) = sink {
        sink.report(percentage, message);
    }
}

/// Registers every tool.
pub fn register_all(registry: &mut ToolRegistry, docs: &Arc<DocumentService>) {
    for kind in ToolKind::ALL {
        registry.register(DocumentTool::new(kind, Arc::clone(docs)).into_descriptor());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_ids_are_pascal_case_inputs() {
        for kind in ToolKind::ALL {
            let id = kind.schema_id();
            assert!(id.ends_with("Input"), "{id}");
            let expected: String = kind
                .name()
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    chars.next().map_or_else(String::new, |first| {
                        first.to_uppercase().chain(chars).collect()
                    })
                })
                .collect();
            assert_eq!(id, format!("{expected}Input"));
        }
    }

    #[test]
    fn schemas_declare_required_properties() {
        for kind in ToolKind::ALL {
            let schema = kind.input_schema();
            assert_eq!(schema["type"], "object");
            for required in schema["required"].as_array().unwrap() {
                let key = required.as_str().unwrap();
                assert!(schema["properties"].get(key).is_some(), "{} lacks {key}", kind.name());
            }
        }
    }

    #[test]
    fn only_fetch_tools_report_progress() {
        let progress: Vec<_> = ToolKind::ALL
            .into_iter()
            .filter(|k| k.supports_progress())
            .map(ToolKind::name)
            .collect();
        assert_eq!(progress, ["get_rfc", "get_internet_draft", "get_openid_spec"]);
    }

    #[test]
    fn format_parsing() {
        let ctx = |format: &str| {
            let mut args = serde_json::Map::new();
            args.insert("format".to_string(), json!(format));
            ToolContext::new(args)
        };
        assert_eq!(OutputFormat::from_context(&ToolContext::default()).unwrap(), OutputFormat::Full);
        assert_eq!(OutputFormat::from_context(&ctx("Metadata")).unwrap(), OutputFormat::Metadata);
        assert!(OutputFormat::from_context(&ctx("xml")).is_err());
    }
}
