use crate::core::geo::LatLng;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One position report from the recorder, as pushed on the live feed or
/// returned by the `last` and `locations` endpoints.
///
/// Only `lat` and `lon` are required; everything else degrades to a
/// placeholder when rendered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lon: f64,
    /// Publish topic, `<prefix>/<user>/<device>[/...]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Tracker id, a short display label chosen on the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    /// Unix timestamp of the fix, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tst: Option<i64>,
    /// Reverse-geocoded address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    /// Base64 PNG avatar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ghash: Option<String>,
    /// Velocity in km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vel: Option<f64>,
    /// Course over ground in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cog: Option<f64>,
    /// Battery level in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batt: Option<f64>,
    /// Accuracy radius in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc: Option<f64>,
    /// Altitude in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    /// Trigger that caused the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl LocationUpdate {
    pub fn new(topic: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            topic: Some(topic.into()),
            ..Default::default()
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }

    /// Identity of the reporting device, derived from the topic.
    pub fn device_key(&self) -> Result<DeviceKey> {
        match self.topic.as_deref() {
            Some(topic) => DeviceKey::from_topic(topic),
            None => Err(Error::MissingTopic),
        }
    }

    /// `user/device` part of the topic, if the topic is well formed.
    pub fn base_topic(&self) -> Option<String> {
        self.device_key().ok().map(|key| key.to_string())
    }
}

/// Stable identity of a reporting device.
///
/// Parsed from a recorder topic of the form `<prefix>/<owner>/<device>[/...]`;
/// a single leading slash is tolerated, so `/owntracks/jane/phone` and
/// `owntracks/jane/phone` yield the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceKey {
    pub owner: String,
    pub device: String,
}

impl DeviceKey {
    pub fn new(owner: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            device: device.into(),
        }
    }

    pub fn from_topic(topic: &str) -> Result<Self> {
        let mut segments: Vec<&str> = topic.split('/').collect();
        if segments.first() == Some(&"") {
            segments.remove(0);
        }

        if segments.len() < 3 {
            return Err(Error::InvalidTopic(format!(
                "expected <prefix>/<user>/<device>, got {:?}",
                topic
            )));
        }

        let (owner, device) = (segments[1], segments[2]);
        if owner.is_empty() || device.is_empty() {
            return Err(Error::InvalidTopic(format!(
                "empty user or device in {:?}",
                topic
            )));
        }

        Ok(Self::new(owner, device))
    }
}

impl FromStr for DeviceKey {
    type Err = Error;

    fn from_str(topic: &str) -> Result<Self> {
        Self::from_topic(topic)
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.device)
    }
}
