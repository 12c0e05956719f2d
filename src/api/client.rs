//! Recorder REST API client
//!
//! All endpoints live under `<base>/api/0/`. Any failure, whether the
//! recorder is unreachable, answers with an error status or sends a body
//! that does not decode, is logged and reported as
//! [`Error::ApiUnavailable`].

use crate::core::config::{LocationQuery, ViewerConfig};
use crate::data::geojson::GeoJson;
use crate::data::location::LocationUpdate;
use crate::{Error, Result};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const API_UNAVAILABLE: &str = "Unable to connect to API.";

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ResultsEnvelope {
    results: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VersionEnvelope {
    version: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("livemap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base: config.api_base()?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Builds `<base>/api/0/<endpoint>?<params>`.
    pub fn endpoint_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .base
            .join(endpoint)
            .map_err(|e| Error::Config(format!("invalid endpoint {:?}: {}", endpoint, e)))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(name, value)| (*name, value.as_str())));
        }
        Ok(url)
    }

    /// Last known position of every device the filter matches.
    pub async fn last(&self, query: &LocationQuery) -> Result<Vec<LocationUpdate>> {
        let url = self.endpoint_url("last", &query.to_pairs())?;
        self.fetch_json(url).await
    }

    /// Location history for one device.
    pub async fn locations(&self, query: &LocationQuery) -> Result<Vec<LocationUpdate>> {
        let mut params = query.to_pairs();
        params.push(("format", "json".to_string()));
        let url = self.endpoint_url("locations", &params)?;
        let envelope: DataEnvelope<LocationUpdate> = self.fetch_json(url).await?;
        Ok(envelope.data)
    }

    /// Location history as a GeoJSON track.
    pub async fn track(&self, query: &LocationQuery) -> Result<GeoJson> {
        let mut params = query.to_pairs();
        params.push(("format", "geojson".to_string()));
        let url = self.endpoint_url("locations", &params)?;
        self.fetch_json(url).await
    }

    pub async fn users(&self) -> Result<Vec<String>> {
        let url = self.endpoint_url("list", &[])?;
        let envelope: ResultsEnvelope = self.fetch_json(url).await?;
        Ok(envelope.results)
    }

    pub async fn devices(&self, user: &str) -> Result<Vec<String>> {
        let url = self.endpoint_url("list", &[("user", user.to_string())])?;
        let envelope: ResultsEnvelope = self.fetch_json(url).await?;
        Ok(envelope.results)
    }

    /// Recorder version string.
    pub async fn version(&self) -> Result<String> {
        let url = self.endpoint_url("version", &[])?;
        let envelope: VersionEnvelope = self.fetch_json(url).await?;
        Ok(envelope.version)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        log::debug!("GET {}", url);
        match self.try_fetch(&url).await {
            Ok(value) => Ok(value),
            Err(e) => {
                log::error!("request to {} failed: {}", url, e);
                Err(Error::ApiUnavailable(API_UNAVAILABLE.to_string()))
            }
        }
    }

    async fn try_fetch<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let response = self.http.get(url.clone()).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}
