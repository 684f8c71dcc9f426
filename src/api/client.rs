//! HTTP client for the external query/aggregation service.

use crate::api::types::{
    EventDetail, HistogramResponse, OverviewResponse, QueryResponse, SpiderStats,
};
use crate::filter::params::{self, QueryOptions};
use crate::filter::FiltersState;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE: &str = "http://127.0.0.1:8000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// HTTP 422 with the field-level detail from the structured error body.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("server returned {0}")]
    Http(StatusCode),
}

/// Shape of the service's 422 body.
#[derive(Debug, Deserialize)]
struct ValidationBody {
    detail: Vec<ValidationItem>,
}

#[derive(Debug, Deserialize)]
struct ValidationItem {
    #[serde(default)]
    loc: Vec<serde_json::Value>,
    msg: String,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Reachability probe against the service root.
    pub fn health(&self) -> Result<(), ApiError> {
        let resp = self
            .client
            .get(format!("{}/", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .send()?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Http(resp.status()))
        }
    }

    /// `GET /query` with the canonical filter query string plus field list
    /// and limit.
    pub fn query(
        &self,
        filters: &FiltersState,
        fields: &[&'static str],
        limit: Option<usize>,
    ) -> Result<QueryResponse, ApiError> {
        let options = QueryOptions {
            fields: fields.to_vec(),
            limit,
            ..Default::default()
        };
        let url = format!(
            "{}/query?{}",
            self.base_url,
            params::query_string(filters, &options)
        );
        self.get_json(&url)
    }

    /// `GET /query` additionally scoped to a half-open time interval.
    pub fn query_interval(
        &self,
        filters: &FiltersState,
        start_iso: &str,
        end_iso: &str,
        fields: &[&'static str],
        limit: Option<usize>,
    ) -> Result<QueryResponse, ApiError> {
        let options = QueryOptions {
            fields: fields.to_vec(),
            limit,
            ..Default::default()
        };
        let qs = params::query_string(filters, &options);
        let sep = if qs.is_empty() { "" } else { "&" };
        let url = format!(
            "{}/query?{}{}start_time__gte={}&start_time__lt={}",
            self.base_url,
            qs,
            sep,
            urlencoding::encode(start_iso),
            urlencoding::encode(end_iso),
        );
        self.get_json(&url)
    }

    /// `GET /detail/{id}`: full timeseries of one event.
    pub fn detail(&self, event_id: u64) -> Result<EventDetail, ApiError> {
        let url = format!("{}/detail/{}", self.base_url, event_id);
        self.get_json(&url)
    }

    /// `GET /overview`: server-side binned statistics for all fields.
    pub fn overview(
        &self,
        filters: &FiltersState,
        bins: usize,
    ) -> Result<OverviewResponse, ApiError> {
        let url = format!(
            "{}/overview?bins={}&filter_params={}",
            self.base_url,
            bins,
            urlencoding::encode(&params::query_string(filters, &QueryOptions::default())),
        );
        self.get_json(&url)
    }

    /// `GET /overview-histogram`: event counts grouped year/month/day.
    pub fn overview_histogram(
        &self,
        filters: &FiltersState,
    ) -> Result<HistogramResponse, ApiError> {
        let url = format!(
            "{}/overview-histogram?filter_params={}",
            self.base_url,
            urlencoding::encode(&params::query_string(filters, &QueryOptions::default())),
        );
        self.get_json(&url)
    }

    /// `GET /spider`: summary statistics for one comparison interval.
    pub fn spider(
        &self,
        filters: &FiltersState,
        start_iso: &str,
        end_iso: &str,
    ) -> Result<SpiderStats, ApiError> {
        let url = format!(
            "{}/spider?start={}&end={}&filter_params={}",
            self.base_url,
            urlencoding::encode(start_iso),
            urlencoding::encode(end_iso),
            urlencoding::encode(&params::query_string(filters, &QueryOptions::default())),
        );
        self.get_json(&url)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let resp = self.client.get(url).timeout(REQUEST_TIMEOUT).send()?;
        let status = resp.status();

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let detail = match resp.json::<ValidationBody>() {
                Ok(body) => format_validation_detail(&body),
                Err(_) => "invalid request parameters".to_string(),
            };
            return Err(ApiError::Validation(detail));
        }
        if !status.is_success() {
            return Err(ApiError::Http(status));
        }

        Ok(resp.json()?)
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE)
    }
}

fn format_validation_detail(body: &ValidationBody) -> String {
    let items: Vec<String> = body
        .detail
        .iter()
        .map(|item| {
            let loc: Vec<String> = item
                .loc
                .iter()
                .map(|part| match part {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            if loc.is_empty() {
                item.msg.clone()
            } else {
                format!("{}: {}", loc.join("."), item.msg)
            }
        })
        .collect();
    items.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_detail_includes_field_locations() {
        let body: ValidationBody = serde_json::from_str(
            r#"{"detail": [
                {"loc": ["query", "bins"], "msg": "value is not a valid integer", "type": "type_error"},
                {"loc": [], "msg": "unknown operator", "type": "value_error"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            format_validation_detail(&body),
            "query.bins: value is not a valid integer; unknown operator"
        );
    }
}
