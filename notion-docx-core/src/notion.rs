//! Notion API access: block and page models plus the HTTP client.
//!
//! Records arrive as loosely-typed JSON; this module decodes them into the
//! closed block enumeration the renderer understands. Malformed or missing
//! payload data degrades to empty content instead of failing the run.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::contract::{ContentSource, SourceError};
use crate::filter::FilterExpression;

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

/// Batch size for paginated listing calls.
const PAGE_SIZE: u32 = 100;

/// Formatting flags attached to a rich-text run. All five are independent
/// toggles and may be set simultaneously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

/// A span of text sharing one annotation set. Order within a block is
/// significant and preserved.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RichTextRun {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub annotations: Annotations,
}

impl RichTextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        RichTextRun {
            plain_text: text.into(),
            annotations: Annotations::default(),
        }
    }
}

/// Where an image block's bytes live: hosted by the service behind a
/// pre-signed URL, or linked from an external host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Hosted { url: String },
    External { url: String },
}

impl ImageSource {
    pub fn url(&self) -> &str {
        match self {
            ImageSource::Hosted { url } | ImageSource::External { url } => url,
        }
    }
}

/// One node of the content tree. `block_type` keeps the raw discriminator so
/// unrecognized types can still be named in the output.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: String,
    pub block_type: String,
    pub has_children: bool,
    pub kind: BlockKind,
}

/// The closed set of block variants the renderer understands. Unknown
/// discriminators route to `Other` rather than failing.
#[derive(Debug, Clone)]
pub enum BlockKind {
    Paragraph { rich_text: Vec<RichTextRun> },
    Heading { level: u8, rich_text: Vec<RichTextRun> },
    BulletedListItem { rich_text: Vec<RichTextRun> },
    NumberedListItem { rich_text: Vec<RichTextRun> },
    ToDo { rich_text: Vec<RichTextRun>, checked: bool },
    Image { source: Option<ImageSource> },
    ChildPage { title: String },
    Unsupported,
    Other,
}

impl Block {
    /// Decode a block record. Never fails: unparseable payloads degrade to
    /// empty content, unknown types to [`BlockKind::Other`].
    pub fn from_value(value: &Value) -> Block {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let block_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let has_children = value
            .get("has_children")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let kind = BlockKind::parse(&block_type, value.get(block_type.as_str()));
        Block {
            id,
            block_type,
            has_children,
            kind,
        }
    }
}

impl BlockKind {
    fn parse(block_type: &str, payload: Option<&Value>) -> BlockKind {
        match block_type {
            "paragraph" => BlockKind::Paragraph {
                rich_text: rich_text_of(payload),
            },
            t if t.starts_with("heading_") => {
                let level = t.trim_start_matches("heading_").parse().unwrap_or(1);
                BlockKind::Heading {
                    level,
                    rich_text: rich_text_of(payload),
                }
            }
            "bulleted_list_item" => BlockKind::BulletedListItem {
                rich_text: rich_text_of(payload),
            },
            "numbered_list_item" => BlockKind::NumberedListItem {
                rich_text: rich_text_of(payload),
            },
            "to_do" => BlockKind::ToDo {
                rich_text: rich_text_of(payload),
                checked: payload
                    .and_then(|p| p.get("checked"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            "image" => BlockKind::Image {
                source: image_source_of(payload),
            },
            "child_page" => BlockKind::ChildPage {
                title: payload
                    .and_then(|p| p.get("title"))
                    .and_then(Value::as_str)
                    .unwrap_or("Untitled")
                    .to_string(),
            },
            "unsupported" => BlockKind::Unsupported,
            other => {
                debug!(block_type = other, "Unrecognized block type");
                BlockKind::Other
            }
        }
    }
}

fn rich_text_of(payload: Option<&Value>) -> Vec<RichTextRun> {
    let Some(items) = payload.and_then(|p| p.get("rich_text")) else {
        return Vec::new();
    };
    match serde_json::from_value(items.clone()) {
        Ok(runs) => runs,
        Err(e) => {
            warn!(error = ?e, "Failed to decode rich text, treating as empty");
            Vec::new()
        }
    }
}

fn image_source_of(payload: Option<&Value>) -> Option<ImageSource> {
    let url_of = |key: &str| {
        payload
            .and_then(|p| p.get(key))
            .and_then(|f| f.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    if let Some(url) = url_of("file") {
        Some(ImageSource::Hosted { url })
    } else {
        url_of("external").map(|url| ImageSource::External { url })
    }
}

/// A page record returned from a database query. Properties stay loosely
/// typed; accessors default missing or malformed data instead of raising.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub properties: Value,
}

impl Page {
    /// The first non-empty title property's leading run, or "Untitled".
    pub fn title(&self) -> String {
        let Some(properties) = self.properties.as_object() else {
            return "Untitled".to_string();
        };
        for value in properties.values() {
            if value.get("type").and_then(Value::as_str) != Some("title") {
                continue;
            }
            if let Some(text) = value
                .get("title")
                .and_then(Value::as_array)
                .and_then(|runs| runs.first())
                .and_then(|run| run.get("plain_text"))
                .and_then(Value::as_str)
            {
                return text.to_string();
            }
        }
        "Untitled".to_string()
    }

    /// The selected option's name for a select property, or "N/A".
    pub fn select_name(&self, property: &str) -> String {
        self.properties
            .get(property)
            .and_then(|p| p.get("select"))
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string()
    }

    /// All selected option names of a multi-select property joined with
    /// ", ", or "N/A" when absent or empty.
    pub fn multi_select_names(&self, property: &str) -> String {
        let names: Vec<&str> = self
            .properties
            .get(property)
            .and_then(|p| p.get("multi_select"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        if names.is_empty() {
            "N/A".to_string()
        } else {
            names.join(", ")
        }
    }
}

/// Tag of a database property, driving filter-builder branching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    Select,
    Status,
    MultiSelect,
    Number,
    Checkbox,
    Title,
    Other(String),
}

impl PropertyType {
    pub fn from_tag(tag: &str) -> PropertyType {
        match tag {
            "select" => PropertyType::Select,
            "status" => PropertyType::Status,
            "multi_select" => PropertyType::MultiSelect,
            "number" => PropertyType::Number,
            "checkbox" => PropertyType::Checkbox,
            "title" => PropertyType::Title,
            other => PropertyType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::Select => "select",
            PropertyType::Status => "status",
            PropertyType::MultiSelect => "multi_select",
            PropertyType::Number => "number",
            PropertyType::Checkbox => "checkbox",
            PropertyType::Title => "title",
            PropertyType::Other(tag) => tag,
        }
    }
}

/// Property name -> property type mapping for one database.
#[derive(Debug, Clone, Default)]
pub struct DatabaseSchema {
    pub properties: BTreeMap<String, PropertyType>,
}

impl DatabaseSchema {
    pub fn property_type(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name)
    }
}

/// HTTP client for the Notion API, implementing [`ContentSource`].
pub struct NotionClient {
    http: reqwest::Client,
    token: String,
}

impl NotionClient {
    pub fn new(token: impl Into<String>) -> Self {
        NotionClient {
            http: reqwest::Client::new(),
            token: token.into(),
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }
}

#[async_trait]
impl ContentSource for NotionClient {
    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseSchema, SourceError> {
        let url = format!("{NOTION_API_BASE}/databases/{database_id}");
        debug!(url = %url, "Fetching database schema");
        let response = self.get(&url).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            error!(status = %status, url = %url, "Notion API returned error for database retrieval");
            return Err(format!("Notion API returned {status} retrieving database {database_id}").into());
        }
        let mut properties = BTreeMap::new();
        if let Some(props) = body.get("properties").and_then(Value::as_object) {
            for (name, details) in props {
                let tag = details
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                properties.insert(name.clone(), PropertyType::from_tag(tag));
            }
        }
        debug!(count = properties.len(), "Decoded database schema");
        Ok(DatabaseSchema { properties })
    }

    async fn query_database(
        &self,
        database_id: &str,
        filter: Option<FilterExpression>,
    ) -> Result<Vec<Page>, SourceError> {
        let url = format!("{NOTION_API_BASE}/databases/{database_id}/query");
        let mut pages = Vec::new();
        let mut start_cursor: Option<String> = None;
        loop {
            let mut body = serde_json::json!({ "page_size": PAGE_SIZE });
            if let Some(f) = &filter {
                body["filter"] = serde_json::to_value(f)?;
            }
            if let Some(cursor) = &start_cursor {
                body["start_cursor"] = Value::String(cursor.clone());
            }
            let response = self.post(&url).json(&body).send().await?;
            let status = response.status();
            let json: Value = response.json().await?;
            if !status.is_success() {
                error!(status = %status, url = %url, "Notion API returned error for database query");
                return Err(format!("Notion API returned {status} querying database {database_id}").into());
            }
            if let Some(results) = json.get("results").and_then(Value::as_array) {
                for result in results {
                    match serde_json::from_value::<Page>(result.clone()) {
                        Ok(page) => pages.push(page),
                        Err(e) => warn!(error = ?e, "Skipping undecodable page record"),
                    }
                }
            }
            let has_more = json.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            start_cursor = json
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || start_cursor.is_none() {
                break;
            }
        }
        debug!(database_id, count = pages.len(), "Queried database pages");
        Ok(pages)
    }

    async fn list_block_children(&self, block_id: &str) -> Result<Vec<Block>, SourceError> {
        let mut blocks = Vec::new();
        let mut start_cursor: Option<String> = None;
        loop {
            let url = match &start_cursor {
                Some(cursor) => format!(
                    "{NOTION_API_BASE}/blocks/{block_id}/children?page_size={PAGE_SIZE}&start_cursor={cursor}"
                ),
                None => format!("{NOTION_API_BASE}/blocks/{block_id}/children?page_size={PAGE_SIZE}"),
            };
            let response = self.get(&url).send().await?;
            let status = response.status();
            let json: Value = response.json().await?;
            if !status.is_success() {
                error!(status = %status, url = %url, "Notion API returned error listing block children");
                return Err(format!("Notion API returned {status} listing children of {block_id}").into());
            }
            if let Some(results) = json.get("results").and_then(Value::as_array) {
                blocks.extend(results.iter().map(Block::from_value));
            }
            let has_more = json.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            start_cursor = json
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || start_cursor.is_none() {
                break;
            }
        }
        Ok(blocks)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        // Image URLs are pre-signed or external; no auth headers.
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("image host returned {status}").into());
        }
        Ok(response.bytes().await?.to_vec())
    }
}
