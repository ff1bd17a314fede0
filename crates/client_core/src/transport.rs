//! HTTP/JSON access to the trip service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, de::IgnoredAny, Serialize};
use shared::{
    domain::TripId,
    error::{ApiError, ApiException},
    protocol::{ContentUpdate, CreateTripResponse, RegenerateResponse, Trip, TripFields},
};
use tracing::debug;
use url::Url;

use crate::error::{ConsoleError, Result};

#[async_trait]
pub trait TripApi: Send + Sync {
    async fn list_trips(&self) -> Result<Vec<Trip>>;
    async fn get_trip(&self, trip_id: TripId) -> Result<Trip>;
    async fn create_trip(&self, fields: &TripFields) -> Result<TripId>;
    async fn update_trip(&self, trip_id: TripId, fields: &TripFields) -> Result<()>;
    async fn save_content(&self, trip_id: TripId, html_content: &str) -> Result<()>;
    async fn delete_trip(&self, trip_id: TripId) -> Result<()>;
    async fn regenerate_trip(&self, trip_id: TripId) -> Result<RegenerateResponse>;
}

pub struct HttpTripApi {
    http: Client,
    base_url: Url,
}

impl HttpTripApi {
    pub fn new(server_url: &str, request_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: normalize_base_url(server_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<(RequestBuilder, String)> {
        let url = self.base_url.join(path)?;
        let label = format!("{method} /{path}");
        debug!("http: {label}");
        Ok((self.http.request(method, url), label))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, label: &str) -> Result<T> {
        let res = request.send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;

        if let Ok(err) = serde_json::from_slice::<ApiError>(&bytes) {
            return Err(ApiException::new(status.as_u16(), err.error).into());
        }
        if !status.is_success() {
            return Err(ApiException::new(
                status.as_u16(),
                format!("server responded with {status}"),
            )
            .into());
        }

        serde_json::from_slice(&bytes).map_err(|source| ConsoleError::Decode {
            endpoint: label.to_string(),
            source,
        })
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let (mut request, label) = self.request(method, path)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request, &label).await
    }
}

#[async_trait]
impl TripApi for HttpTripApi {
    async fn list_trips(&self) -> Result<Vec<Trip>> {
        self.send_json::<(), _>(Method::GET, "trips", None).await
    }

    async fn get_trip(&self, trip_id: TripId) -> Result<Trip> {
        self.send_json::<(), _>(Method::GET, &format!("trips/{trip_id}"), None)
            .await
    }

    async fn create_trip(&self, fields: &TripFields) -> Result<TripId> {
        let created: CreateTripResponse = self
            .send_json(Method::POST, "trips", Some(fields))
            .await?;
        Ok(created.trip_id)
    }

    async fn update_trip(&self, trip_id: TripId, fields: &TripFields) -> Result<()> {
        let _: IgnoredAny = self
            .send_json(Method::PUT, &format!("trips/{trip_id}"), Some(fields))
            .await?;
        Ok(())
    }

    async fn save_content(&self, trip_id: TripId, html_content: &str) -> Result<()> {
        let body = ContentUpdate {
            html_content: html_content.to_string(),
        };
        let _: IgnoredAny = self
            .send_json(
                Method::PUT,
                &format!("trips/{trip_id}/content"),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn delete_trip(&self, trip_id: TripId) -> Result<()> {
        let _: IgnoredAny = self
            .send_json::<(), _>(Method::DELETE, &format!("trips/{trip_id}"), None)
            .await?;
        Ok(())
    }

    async fn regenerate_trip(&self, trip_id: TripId) -> Result<RegenerateResponse> {
        self.send_json::<(), _>(
            Method::POST,
            &format!("trips/{trip_id}/generate"),
            None,
        )
        .await
    }
}

/// Parses the server url and makes sure relative joins land under its path.
pub fn normalize_base_url(server_url: &str) -> Result<Url> {
    let trimmed = server_url.trim();
    let mut url = Url::parse(trimmed)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConsoleError::invalid_input(format!(
            "server url must start with http:// or https://, got '{trimmed}'"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
