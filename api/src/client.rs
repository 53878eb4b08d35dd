use chrono::{DateTime, TimeZone};
use http::header::ACCEPT;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::config::{ClientKind, Config};
use crate::errors::{classify_with, is_retryable, Error, Result, MAXIMUM_REQUEST_DAYS};
use crate::flatten::Flattener;
use crate::models::{
    Authorization, AuthorizationScope, Charges, Envelope, MeteringPoint, MeteringPointDetail,
    MeteringPointsRequest, ResultItem, TimeSeries,
};
use crate::periods::PeriodResolver;
use crate::resolution::Aggregation;

/// Async client for one of the platform's two API surfaces.
///
/// The data access token is fetched with the refresh token on first use and
/// cached for the lifetime of the client.
pub struct Client {
    config: Config,
    base_url: String,
    refresh_token: String,
    http: reqwest::Client,
    access_token: RwLock<Option<String>>,
}

impl Client {
    pub fn new(config: Config, refresh_token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Client {
            base_url: config.base_url(),
            config,
            refresh_token: refresh_token.into(),
            http,
            access_token: RwLock::new(None),
        })
    }

    /// Points the client at another root, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn kind(&self) -> ClientKind {
        self.config.kind
    }

    pub fn flattener(&self) -> Flattener {
        Flattener::from(&self.config)
    }

    pub fn period_resolver(&self) -> PeriodResolver {
        PeriodResolver::from(&self.config)
    }

    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.access_token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut cached = self.access_token.write().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        info!("Fetching data access token from {}", self.base_url);
        let url = self.url("/token");
        let response = self
            .send(|| {
                self.http
                    .get(&url)
                    .bearer_auth(&self.refresh_token)
                    .header(ACCEPT, "application/json")
            })
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Token response {}: {}", status, body);

        if status != StatusCode::OK {
            self.check(status, &body)?;
            return Err(Error::Connection(status));
        }

        let envelope: Envelope<String> = serde_json::from_str(&body)?;
        let token = match envelope.result {
            Some(token) if !token.is_empty() => token,
            _ => {
                warn!("Token response {} carried no token", status);
                return Err(Error::Connection(status));
            }
        };
        *cached = Some(token.clone());

        Ok(token)
    }

    pub async fn is_alive(&self) -> Result<bool> {
        let url = self.url("/isalive");
        let response = self.send(|| self.http.get(&url)).await?;
        let status = response.status();
        debug!("isalive answered {}", status);

        Ok(status == StatusCode::OK)
    }

    pub async fn get_metering_points(&self, include_all: bool) -> Result<Vec<MeteringPoint>> {
        self.ensure_kind("get_metering_points", ClientKind::Customer)?;

        let path = format!("/meteringpoints/meteringpoints?includeAll={}", include_all);
        self.call(Method::GET, &path, None).await
    }

    pub async fn get_metering_point_details(
        &self,
        metering_point_ids: &[String],
    ) -> Result<Vec<ResultItem<MeteringPointDetail>>> {
        let path = match self.kind() {
            ClientKind::Customer => "/meteringpoints/meteringpoint/getdetails",
            ClientKind::ThirdParty => "/meteringpoint/getdetails",
        };
        let body = MeteringPointsRequest::new(metering_point_ids);
        self.call(Method::POST, path, Some(&body)).await
    }

    pub async fn get_charges(&self, metering_point_ids: &[String]) -> Result<Vec<ResultItem<Charges>>> {
        let path = match self.kind() {
            ClientKind::Customer => "/meteringpoints/meteringpoint/getcharges",
            ClientKind::ThirdParty => "/meteringpoint/getcharges",
        };
        let body = MeteringPointsRequest::new(metering_point_ids);
        self.call(Method::POST, path, Some(&body)).await
    }

    pub async fn get_time_series<Z: TimeZone>(
        &self,
        metering_point_ids: &[String],
        from: &DateTime<Z>,
        to: &DateTime<Z>,
        aggregation: Aggregation,
    ) -> Result<Vec<TimeSeries>> {
        let path = self.time_series_path("/meterdata/gettimeseries", from, to, aggregation)?;
        let body = MeteringPointsRequest::new(metering_point_ids);
        self.call(Method::POST, &path, Some(&body)).await
    }

    pub async fn export_time_series<Z: TimeZone>(
        &self,
        metering_point_ids: &[String],
        from: &DateTime<Z>,
        to: &DateTime<Z>,
        aggregation: Aggregation,
    ) -> Result<String> {
        self.ensure_kind("export_time_series", ClientKind::Customer)?;

        let path = self.time_series_path("/meterdata/timeseries/export", from, to, aggregation)?;
        let body = MeteringPointsRequest::new(metering_point_ids);
        self.call_text(Method::POST, &path, Some(&body)).await
    }

    pub async fn export_masterdata(&self, metering_point_ids: &[String]) -> Result<String> {
        self.ensure_kind("export_masterdata", ClientKind::Customer)?;

        let body = MeteringPointsRequest::new(metering_point_ids);
        self.call_text(Method::POST, "/meteringpoints/masterdata/export", Some(&body))
            .await
    }

    pub async fn export_charges(&self, metering_point_ids: &[String]) -> Result<String> {
        self.ensure_kind("export_charges", ClientKind::Customer)?;

        let body = MeteringPointsRequest::new(metering_point_ids);
        self.call_text(Method::POST, "/meteringpoints/charges/export", Some(&body))
            .await
    }

    pub async fn add_relation_by_id(&self, metering_point_ids: &[String]) -> Result<Vec<ResultItem<String>>> {
        self.ensure_kind("add_relation_by_id", ClientKind::Customer)?;

        let body = MeteringPointsRequest::new(metering_point_ids);
        self.call(Method::POST, "/meteringpoints/meteringpoint/relation/add", Some(&body))
            .await
    }

    pub async fn add_relation_by_web_access_code(
        &self,
        metering_point_id: &str,
        web_access_code: &str,
    ) -> Result<String> {
        self.ensure_kind("add_relation_by_web_access_code", ClientKind::Customer)?;

        let path = format!(
            "/meteringpoints/meteringpoint/relation/add/{}/{}",
            metering_point_id, web_access_code
        );
        self.call(Method::PUT, &path, None).await
    }

    /// Returns whether the platform acknowledged the removal with a 200.
    pub async fn delete_relation(&self, metering_point_id: &str) -> Result<bool> {
        self.ensure_kind("delete_relation", ClientKind::Customer)?;

        let path = format!("/meteringpoints/meteringpoint/relation/{}", metering_point_id);
        let (status, _) = self.execute(Method::DELETE, &path, None).await?;

        Ok(status == StatusCode::OK)
    }

    pub async fn get_authorizations(&self) -> Result<Vec<Authorization>> {
        self.ensure_kind("get_authorizations", ClientKind::ThirdParty)?;

        self.call(Method::GET, "/authorization/authorizations", None).await
    }

    pub async fn get_metering_points_for_scope(
        &self,
        scope: AuthorizationScope,
        identifier: &str,
    ) -> Result<Vec<MeteringPoint>> {
        self.ensure_kind("get_metering_points_for_scope", ClientKind::ThirdParty)?;

        let path = format!(
            "/authorization/authorization/meteringpoints/{}/{}",
            scope.as_str(),
            identifier
        );
        self.call(Method::GET, &path, None).await
    }

    pub async fn get_metering_point_ids_for_scope(
        &self,
        scope: AuthorizationScope,
        identifier: &str,
    ) -> Result<Vec<String>> {
        self.ensure_kind("get_metering_point_ids_for_scope", ClientKind::ThirdParty)?;

        let path = format!(
            "/authorization/authorization/meteringpointids/{}/{}",
            scope.as_str(),
            identifier
        );
        self.call(Method::GET, &path, None).await
    }

    fn ensure_kind(&self, operation: &'static str, required: ClientKind) -> Result<()> {
        if self.kind() != required {
            return Err(Error::UnsupportedForClientKind {
                operation,
                kind: self.kind(),
            });
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn time_series_path<Z: TimeZone>(
        &self,
        prefix: &str,
        from: &DateTime<Z>,
        to: &DateTime<Z>,
        aggregation: Aggregation,
    ) -> Result<String> {
        let from = from.with_timezone(&self.config.timezone).date_naive();
        let to = to.with_timezone(&self.config.timezone).date_naive();

        let days = (to - from).num_days();
        if days > MAXIMUM_REQUEST_DAYS {
            return Err(Error::DateRangeTooLong { days });
        }

        Ok(format!(
            "{}/{}/{}/{}",
            prefix,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d"),
            aggregation
        ))
    }

    async fn call<T>(&self, method: Method, path: &str, body: Option<&MeteringPointsRequest>) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let (status, text) = self.execute(method, path, body).await?;

        if !status.is_success() {
            self.check(status, &text)?;
            warn!(
                "{} answered {} without a known error code, returning an empty result",
                path, status
            );
            return Ok(T::default());
        }

        if text.trim().is_empty() {
            return Ok(T::default());
        }

        let envelope: Envelope<T> = serde_json::from_str(&text)?;
        Ok(envelope.result.unwrap_or_default())
    }

    async fn call_text(&self, method: Method, path: &str, body: Option<&MeteringPointsRequest>) -> Result<String> {
        let (status, text) = self.execute(method, path, body).await?;

        if !status.is_success() {
            self.check(status, &text)?;
            return Err(Error::Connection(status));
        }

        Ok(text)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&MeteringPointsRequest>,
    ) -> Result<(StatusCode, String)> {
        let token = self.access_token().await?;
        let url = self.url(path);
        info!("{} {}", method, path);

        let response = self
            .send(|| {
                let request = self
                    .http
                    .request(method.clone(), &url)
                    .bearer_auth(&token)
                    .header(ACCEPT, "application/json");
                match body {
                    Some(body) => request.json(body),
                    None => request,
                }
            })
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("{} {} answered {}: {}", method, path, status, text);

        Ok((status, text))
    }

    /// Runs the error body through the classifier.
    fn check(&self, status: StatusCode, body: &str) -> Result<()> {
        let payload = error_payload(body);
        classify_with(&payload, status, self.config.unknown_code_policy)?;
        Ok(())
    }

    async fn send<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let max_attempts = self.config.max_retries.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match build().send().await {
                Ok(response) => return Ok(response),
                Err(e) if attempts >= max_attempts || !is_retryable(e.status(), Some(&e)) => {
                    error!("Request failed after {} attempts: {}", attempts, e);
                    return Err(Error::Http(e));
                }
                Err(e) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempts, max_attempts, e, self.config.retry_delay
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }
}

/// Error bodies are JSON encoded strings; anything else is used verbatim.
fn error_payload(body: &str) -> String {
    serde_json::from_str::<String>(body).unwrap_or_else(|_| body.trim().to_string())
}
