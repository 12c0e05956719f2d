//! Viewer configuration
//!
//! Every field has a default, so a configuration file only needs to name what
//! it changes. Page-style query parameters (`?fit=1&user=jane`) can be layered
//! on top with [`ViewerConfig::apply_query`].

use crate::core::constants::{
    API_PATH, DEFAULT_BASE_URL, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_REQUEST_TIMEOUT_SECS, WS_PATH,
};
use crate::prelude::HashMap;
use crate::ui::style::{MarkerStyle, TrackStyle};
use crate::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Filters understood by the `last` and `locations` endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationQuery {
    pub user: Option<String>,
    pub device: Option<String>,
    /// Start of the history window, `YYYY-MM-DDTHH:MM:SS`
    pub from: Option<String>,
    /// End of the history window, `YYYY-MM-DDTHH:MM:SS`
    pub to: Option<String>,
}

impl LocationQuery {
    pub fn for_device(user: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            device: Some(device.into()),
            ..Default::default()
        }
    }

    /// Whole days from the start of `from` to the end of `to`.
    pub fn between(mut self, from: chrono::NaiveDate, to: chrono::NaiveDate) -> Self {
        self.from = Some(format!("{}T00:00:00", from.format("%Y-%m-%d")));
        self.to = Some(format!("{}T23:59:59", to.format("%Y-%m-%d")));
        self
    }

    /// Query pairs in the order the recorder documents them
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("user", &self.user),
            ("device", &self.device),
            ("from", &self.from),
            ("to", &self.to),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Recorder base URL; the API lives under `api/0/` and the feed under `ws/last`
    pub base_url: String,
    /// Explicit feed URL, overriding the one derived from `base_url`
    pub ws_url: Option<String>,
    pub reconnect_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Keep at most one popup open, following the latest update
    pub singular_markers: bool,
    /// Fit the view to all markers after each update
    pub auto_fit: bool,
    pub marker_style: MarkerStyle,
    pub track_style: TrackStyle,
    /// Display names keyed by `user/device`
    pub renames: HashMap<String, String>,
    pub query: LocationQuery,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_url: None,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            singular_markers: true,
            auto_fit: false,
            marker_style: MarkerStyle::default(),
            track_style: TrackStyle::default(),
            renames: HashMap::default(),
            query: LocationQuery::default(),
        }
    }
}

impl ViewerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid configuration: {}", e)))
    }

    /// Applies page query parameters. `fit` with any non-empty value turns
    /// auto-fit on; `user`, `device`, `from` and `to` set the location filter.
    /// Unknown parameters are ignored.
    pub fn apply_query(&mut self, query: &str) -> Result<()> {
        let query = query.trim_start_matches('?');
        let url = Url::parse(&format!("http://query.invalid/?{}", query))
            .map_err(|e| Error::Config(format!("invalid query {:?}: {}", query, e)))?;

        for (name, value) in url.query_pairs() {
            let value = value.into_owned();
            match name.as_ref() {
                "fit" => self.auto_fit = !value.is_empty(),
                "user" => self.query.user = Some(value),
                "device" => self.query.device = Some(value),
                "from" => self.query.from = Some(value),
                "to" => self.query.to = Some(value),
                other => log::debug!("ignoring query parameter {:?}", other),
            }
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `<base>/api/0/`
    pub fn api_base(&self) -> Result<Url> {
        join_dir(&self.base_url, API_PATH)
    }

    /// The live feed URL: `ws_url` if set, otherwise `<base>/ws/last` with the
    /// scheme switched to `ws`/`wss`.
    pub fn feed_url(&self) -> Result<Url> {
        if let Some(ws_url) = &self.ws_url {
            return Url::parse(ws_url)
                .map_err(|e| Error::Config(format!("invalid feed URL {:?}: {}", ws_url, e)));
        }

        let mut url = join_dir(&self.base_url, WS_PATH)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::Config(format!("cannot derive a feed URL from {:?}", self.base_url)))?;
        // The feed URL is a resource, not a directory.
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);
        Ok(url)
    }
}

/// Appends `path` to the base URL's path, always ending in `/`.
fn join_dir(base: &str, path: &str) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|e| Error::Config(format!("invalid base URL {:?}: {}", base, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("invalid base URL {:?}", base)));
    }
    let joined = format!("{}/{}/", url.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url.set_query(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.reconnect_delay(), Duration::from_millis(3000));
        assert!(config.singular_markers);
        assert!(!config.auto_fit);
    }

    #[test]
    fn test_partial_json() {
        let config = ViewerConfig::from_json_str(
            r#"{"base_url": "https://example.org/owntracks", "renames": {"jane/phone": "Jane"}}"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://example.org/owntracks");
        assert_eq!(config.renames.get("jane/phone").map(String::as_str), Some("Jane"));
        assert_eq!(config.reconnect_delay_ms, 3000);

        assert!(matches!(
            ViewerConfig::from_json_str("{"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_query_parameters() {
        let mut config = ViewerConfig::default();
        config.apply_query("?fit=1&user=jane&device=phone&zoom=4").unwrap();
        assert!(config.auto_fit);
        assert_eq!(config.query, LocationQuery::for_device("jane", "phone"));

        config.apply_query("fit=").unwrap();
        assert!(!config.auto_fit);
    }

    #[test]
    fn test_urls() {
        let config = ViewerConfig::new("https://example.org/owntracks/");
        assert_eq!(
            config.api_base().unwrap().as_str(),
            "https://example.org/owntracks/api/0/"
        );
        assert_eq!(
            config.feed_url().unwrap().as_str(),
            "wss://example.org/owntracks/ws/last"
        );

        let plain = ViewerConfig::new("http://localhost:8083");
        assert_eq!(plain.feed_url().unwrap().as_str(), "ws://localhost:8083/ws/last");
        assert_eq!(plain.api_base().unwrap().as_str(), "http://localhost:8083/api/0/");

        let mut explicit = ViewerConfig::default();
        explicit.ws_url = Some("ws://feed.example.org:9000/live".to_string());
        assert_eq!(explicit.feed_url().unwrap().as_str(), "ws://feed.example.org:9000/live");
    }

    #[test]
    fn test_query_pairs() {
        let query = LocationQuery::for_device("jane", "phone").between(
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );
        assert_eq!(
            query.to_pairs(),
            vec![
                ("user", "jane".to_string()),
                ("device", "phone".to_string()),
                ("from", "2024-03-01T00:00:00".to_string()),
                ("to", "2024-03-31T23:59:59".to_string()),
            ]
        );
        assert!(LocationQuery::default().to_pairs().is_empty());
    }
}
