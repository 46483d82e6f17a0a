use crate::constants::{API_TIMEOUT_SECS, MAX_PER_PAGE};
use crate::error::{Result, ThumbError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// One page of `(record id, raw photo references)` pairs at a time. The
/// resolver paginates against this seam; [`ApiClient`] is the production
/// implementation.
#[async_trait]
pub trait RecordPager: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<Vec<(String, Vec<String>)>>;
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub collection: String,
    pub photos_field: String,
    pub per_page: u32,
    pub brand_id: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Deserialize)]
struct RecordPage {
    #[serde(default)]
    items: Vec<Value>,
}

/// Client for the headless backend's record collections. Pages are requested
/// one at a time; an empty `items` array marks the end of the collection.
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&config.token)
            .map_err(|e| ThumbError::Api(format!("invalid token header: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl RecordPager for ApiClient {
    /// A non-success status or transport failure is returned as-is; API
    /// failures abort the whole run and are not retried at this layer.
    async fn fetch_page(&self, page: u32) -> Result<Vec<(String, Vec<String>)>> {
        let per_page = self.config.per_page.clamp(1, MAX_PER_PAGE);

        let mut fields = vec!["id", self.config.photos_field.as_str()];
        let mut filters = Vec::new();
        if let Some(brand) = &self.config.brand_id {
            fields.push("brand");
            filters.push(format!("(brand='{brand}')"));
        }
        if let Some(category) = &self.config.category_id {
            fields.push("category");
            filters.push(format!("(category='{category}')"));
        }

        let url = format!(
            "{}/api/collections/{}/records",
            self.config.base_url.trim_end_matches('/'),
            self.config.collection
        );
        let mut request = self.http.get(&url).query(&[
            ("page", page.to_string()),
            ("perPage", per_page.to_string()),
            ("fields", fields.join(",")),
        ]);
        if !filters.is_empty() {
            request = request.query(&[("filter", filters.join(" && "))]);
        }

        let body = request
            .send()
            .await?
            .error_for_status()?
            .json::<RecordPage>()
            .await?;

        Ok(body
            .items
            .iter()
            .filter_map(|record| record_entry(record, &self.config.photos_field))
            .collect())
    }
}

/// One `(id, photos)` pair from a raw record. Records without a usable id, or
/// whose photos field is present but not an array, are dropped; a missing or
/// null photos field simply means "no photos".
fn record_entry(record: &Value, photos_field: &str) -> Option<(String, Vec<String>)> {
    let id = record.get("id")?.as_str()?.trim();
    if id.is_empty() {
        return None;
    }

    let photos = match record.get(photos_field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(_) => return None,
    };

    Some((id.to_string(), photos))
}
