// src/store/notion.rs
// Notion-backed `RemoteStore`. Everything wire-shaped lives here: the
// database query pagination envelope, the page property schema, and the
// mapping from typed property payloads onto Notion's nested JSON.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::store::{NewRecordProps, PropertyUpdate, RecordPage, RemoteRecord, RemoteStore};

const DEFAULT_BASE_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

#[derive(Debug, Clone)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub base_url: String,
    /// Property names of the target database.
    pub title_property: String,
    pub tag_property: String,
    pub price_property: String,
    pub updated_property: String,
}

impl NotionConfig {
    pub fn new(token: String, database_id: String) -> Self {
        Self {
            token,
            database_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            title_property: "Name".to_string(),
            tag_property: "Symbol".to_string(),
            price_property: "Price".to_string(),
            updated_property: "Last Updated".to_string(),
        }
    }

    /// Credentials come from `NOTION_TOKEN` / `NOTION_DATABASE_ID`;
    /// `NOTION_BASE_URL` optionally redirects tests at another origin.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("NOTION_TOKEN").context("missing NOTION_TOKEN env var")?;
        let database_id =
            std::env::var("NOTION_DATABASE_ID").context("missing NOTION_DATABASE_ID env var")?;
        let mut cfg = Self::new(token, database_id);
        if let Ok(url) = std::env::var("NOTION_BASE_URL") {
            if !url.trim().is_empty() {
                cfg.base_url = url;
            }
        }
        Ok(cfg)
    }
}

pub struct NotionStore {
    cfg: NotionConfig,
    client: Client,
}

impl NotionStore {
    pub fn new(cfg: NotionConfig) -> Self {
        Self {
            cfg: NotionConfig {
                base_url: cfg.base_url.trim_end_matches('/').to_string(),
                ..cfg
            },
            client: Client::new(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(NotionConfig::from_env()?))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.cfg.base_url, path))
            .bearer_auth(&self.cfg.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn props_for_update(&self, props: &PropertyUpdate) -> Value {
        json!({
            &self.cfg.price_property: { "number": props.value },
            &self.cfg.updated_property: { "date": { "start": props.timestamp.to_rfc3339() } },
        })
    }

    fn props_for_create(&self, props: &NewRecordProps) -> Value {
        json!({
            &self.cfg.title_property: {
                "title": [ { "text": { "content": props.display_key } } ]
            },
            &self.cfg.tag_property: {
                "rich_text": [ { "text": { "content": props.external_id } } ]
            },
            &self.cfg.price_property: { "number": props.value },
            &self.cfg.updated_property: { "date": { "start": props.timestamp.to_rfc3339() } },
        })
    }

    /// Reduce one page object to a `RemoteRecord`. A record with no usable
    /// id is malformed; missing or empty text fields are simply absent.
    fn parse_record(&self, page: &Value) -> Result<RemoteRecord, StoreError> {
        let id = page
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Malformed("page object without string id".into()))?
            .to_string();

        let mut title = None;
        let mut tag = None;
        let mut other_text = Vec::new();

        let props = page
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for (name, prop) in &props {
            let kind = prop.get("type").and_then(Value::as_str).unwrap_or_default();
            let text = match kind {
                "title" => prop.get("title").map(rich_text_content),
                "rich_text" => prop.get("rich_text").map(rich_text_content),
                _ => None,
            };
            let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            if kind == "title" {
                title = Some(text);
            } else if name == &self.cfg.tag_property {
                tag = Some(text);
            } else {
                other_text.push(text);
            }
        }

        Ok(RemoteRecord {
            id,
            title,
            tag,
            other_text,
        })
    }
}

/// Concatenate a Notion rich-text array into plain text.
fn rich_text_content(items: &Value) -> String {
    let Some(items) = items.as_array() else {
        return String::new();
    };
    items
        .iter()
        .filter_map(|item| {
            item.get("plain_text")
                .and_then(Value::as_str)
                .or_else(|| {
                    item.get("text")
                        .and_then(|t| t.get("content"))
                        .and_then(Value::as_str)
                })
        })
        .collect::<Vec<_>>()
        .join("")
}

#[derive(Debug, serde::Deserialize)]
struct QueryResponse {
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[async_trait::async_trait]
impl RemoteStore for NotionStore {
    async fn query_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<RecordPage, StoreError> {
        let mut body = json!({ "page_size": page_size });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }

        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/databases/{}/query", self.cfg.database_id),
            )
            .json(&body)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let parsed: QueryResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        let mut records = Vec::with_capacity(parsed.results.len());
        for page in &parsed.results {
            match self.parse_record(page) {
                Ok(rec) => records.push(rec),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unparseable record");
                }
            }
        }

        let next_cursor = if parsed.has_more {
            parsed.next_cursor
        } else {
            None
        };
        Ok(RecordPage {
            records,
            next_cursor,
        })
    }

    async fn update_record(
        &self,
        record_id: &str,
        props: PropertyUpdate,
    ) -> Result<(), StoreError> {
        let body = json!({ "properties": self.props_for_update(&props) });
        let resp = self
            .request(reqwest::Method::PATCH, &format!("/v1/pages/{record_id}"))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn create_record(&self, props: NewRecordProps) -> Result<(), StoreError> {
        let body = json!({
            "parent": { "database_id": self.cfg.database_id },
            "properties": self.props_for_create(&props),
        });
        let resp = self
            .request(reqwest::Method::POST, "/v1/pages")
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}
