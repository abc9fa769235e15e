use super::{DriveItem, LinkRequest, RemoteTree, SharingLink, TokenProvider};
use crate::config::GraphConfig;
use crate::error::GraphError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const MAX_ERROR_BODY_CHARS: usize = 240;

/// Microsoft Graph drive client
pub struct GraphClient {
    config: GraphConfig,
    client: Client,
    tokens: Arc<dyn TokenProvider>,
}

#[derive(Debug, Deserialize)]
struct ChildrenPage {
    #[serde(default)]
    value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateLinkResponse {
    link: SharingLink,
}

impl GraphClient {
    pub fn new(config: GraphConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    /// URL of an item endpoint, `suffix` is appended verbatim (e.g. `/children`)
    pub fn item_url(&self, item_id: &str, suffix: &str) -> String {
        format!(
            "{}/{}/items/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.drive_path.trim_matches('/'),
            urlencoding::encode(item_id),
            suffix
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, item_id: &str) -> Result<T, GraphError> {
        let token = self.tokens.access_token().await?;
        debug!("GET {}", url);

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let response = check_status(response, item_id).await?;
        Ok(response.json().await?)
    }
}

/// Map non-success responses to typed errors
async fn check_status(response: Response, item_id: &str) -> Result<Response, GraphError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(GraphError::NotFound(item_id.to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    Err(GraphError::Status {
        status: status.as_u16(),
        body: truncate_body(text.trim()),
    })
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", truncated)
    }
}

#[async_trait]
impl RemoteTree for GraphClient {
    async fn list_children(&self, item_id: &str) -> Result<Vec<DriveItem>, GraphError> {
        let mut items = Vec::new();
        let mut next = Some(self.item_url(item_id, "/children"));

        while let Some(url) = next {
            let page: ChildrenPage = self.get_json(&url, item_id).await?;
            items.extend(page.value);
            next = page.next_link;
        }

        debug!("Listed {} children of {}", items.len(), item_id);
        Ok(items)
    }

    async fn get_item(&self, item_id: &str) -> Result<DriveItem, GraphError> {
        let url = self.item_url(item_id, "");
        self.get_json(&url, item_id).await
    }

    async fn create_view_link(
        &self,
        item_id: &str,
        request: &LinkRequest,
    ) -> Result<SharingLink, GraphError> {
        let url = self.item_url(item_id, "/createLink");
        let token = self.tokens.access_token().await?;
        debug!("POST {} ({} / {})", url, request.link_type, request.scope);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        let response = check_status(response, item_id).await?;

        let created: CreateLinkResponse = response.json().await?;
        Ok(created.link)
    }
}
