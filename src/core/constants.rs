//! Protocol constants and viewer defaults.
//! Keeping them in a single place makes it easier to tweak the magic numbers the recorder relies on.

/// Text frame sent right after the live feed opens; asks the recorder to replay last known locations.
pub const SUBSCRIBE_REQUEST: &str = "LAST";

/// Delay between a feed close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Timeout applied to one-shot REST fetches.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Recorder base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8083";

/// Path of the REST API, relative to the recorder base URL.
pub const API_PATH: &str = "api/0";

/// Path of the live feed, relative to the recorder base URL.
pub const WS_PATH: &str = "ws/last";

/// `_type` discriminator of location frames.
pub const LOCATION_TYPE: &str = "location";

/// Placeholder for absent text fields in popups.
pub const UNKNOWN: &str = "unknown";

/// Name shown when an update carries nothing that identifies its device.
pub const ANONYMOUS: &str = "anonymous";

/// Avatar edge length in popups, in CSS pixels.
pub const FACE_SIZE: u32 = 35;
