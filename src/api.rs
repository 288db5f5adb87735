//! REST client for the accident CRUD and analytics routes.
//!
//! Wraps the backend's `/accidents` and `/analytics/*` endpoints using
//! [`reqwest`]. Analytics calls take a [`DateRange`] that is checked before
//! any request goes out.

use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::models::{
    Accident, AccidentDraft, AnalyticsSummary, DateRange, IncompleteDraft, InvalidDateRange,
    LocationStats, RoadTypeStats, SeverityStats, WeatherStats,
};
use crate::upload::backend_detail;

/// Default page size of the backend's list route.
pub const DEFAULT_LIST_LIMIT: u32 = 100;
/// Default number of hotspots the dashboard shows.
pub const DEFAULT_TOP_LOCATIONS: u32 = 10;

/// Errors from the REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The route answered 404 for the requested record.
    #[error("accident {0} not found")]
    NotFound(i64),

    /// Any other non-2xx status.
    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Status { status: u16, message: Option<String> },

    #[error(transparent)]
    DateRange(#[from] InvalidDateRange),

    #[error(transparent)]
    Incomplete(#[from] IncompleteDraft),
}

/// HTTP client for one dashboard backend.
pub struct AccidentApi {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl AccidentApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_client(config.http_client()?, config))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            token: config.token.clone(),
        }
    }

    // ---- accidents ----

    /// `GET /accidents?skip&limit`
    pub async fn list_accidents(&self, skip: u32, limit: u32) -> Result<Vec<Accident>, ApiError> {
        let request = self
            .request(reqwest::Method::GET, "/accidents")
            .query(&[("skip", skip), ("limit", limit)]);
        Self::parse_response(request.send().await?, None).await
    }

    /// `GET /accidents/{id}`
    pub async fn get_accident(&self, id: i64) -> Result<Accident, ApiError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/accidents/{id}"))
            .send()
            .await?;
        Self::parse_response(response, Some(id)).await
    }

    /// `POST /accidents`; an incomplete draft is refused before any request.
    pub async fn create_accident(&self, draft: &AccidentDraft) -> Result<Accident, ApiError> {
        draft.validate()?;
        let response = self
            .request(reqwest::Method::POST, "/accidents")
            .json(draft)
            .send()
            .await?;
        let created: Accident = Self::parse_response(response, None).await?;
        tracing::info!(id = created.id, "accident created");
        Ok(created)
    }

    /// `PUT /accidents/{id}`; only the fields set on `draft` are sent.
    pub async fn update_accident(&self, id: i64, draft: &AccidentDraft) -> Result<Accident, ApiError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/accidents/{id}"))
            .json(draft)
            .send()
            .await?;
        Self::parse_response(response, Some(id)).await
    }

    /// `DELETE /accidents/{id}`
    pub async fn delete_accident(&self, id: i64) -> Result<(), ApiError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/accidents/{id}"))
            .send()
            .await?;
        Self::ensure_success(response, Some(id)).await?;
        tracing::info!(id, "accident deleted");
        Ok(())
    }

    // ---- analytics ----

    pub async fn summary(&self, range: &DateRange) -> Result<AnalyticsSummary, ApiError> {
        self.analytics("summary", range, None).await
    }

    pub async fn by_severity(&self, range: &DateRange) -> Result<Vec<SeverityStats>, ApiError> {
        self.analytics("by-severity", range, None).await
    }

    pub async fn by_road_type(&self, range: &DateRange) -> Result<Vec<RoadTypeStats>, ApiError> {
        self.analytics("by-road-type", range, None).await
    }

    pub async fn by_weather(&self, range: &DateRange) -> Result<Vec<WeatherStats>, ApiError> {
        self.analytics("by-weather", range, None).await
    }

    /// Most frequent coordinates, highest count first.
    pub async fn top_locations(
        &self,
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<LocationStats>, ApiError> {
        self.analytics("top-locations", range, Some(limit)).await
    }

    // ---- private helpers ----

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}{}", self.api_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn analytics<T: DeserializeOwned>(
        &self,
        route: &str,
        range: &DateRange,
        limit: Option<u32>,
    ) -> Result<T, ApiError> {
        range.validate()?;

        let mut request = self
            .request(reqwest::Method::GET, &format!("/analytics/{route}"))
            .query(range);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        tracing::debug!(route, start = ?range.start_date, end = ?range.end_date, "fetching analytics");
        Self::parse_response(request.send().await?, None).await
    }

    /// Map a non-2xx status to [`ApiError`]; 404 on a record route becomes `NotFound`.
    async fn ensure_success(
        response: reqwest::Response,
        id: Option<i64>,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if let (reqwest::StatusCode::NOT_FOUND, Some(id)) = (status, id) {
            return Err(ApiError::NotFound(id));
        }
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(status = status.as_u16(), error = %err, "could not read error body");
                Default::default()
            }
        };
        Err(ApiError::Status {
            status: status.as_u16(),
            message: backend_detail(&body),
        })
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
        id: Option<i64>,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response, id).await?;
        Ok(response.json::<T>().await?)
    }
}
