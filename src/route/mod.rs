//! Routing collaborator: path, duration, and distance between two points.
//!
//! This is an external HTTP service consumed at its interface boundary only.
//! The client targets the OpenRouteService directions API and parses the
//! GeoJSON response down to the three fields journeys need.

use serde::{Deserialize, Serialize};

use crate::error::RouteError;

/// Travel mode for a route request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Walking,
    Driving,
}

impl TravelMode {
    /// Routing API profile segment for this mode.
    pub fn profile(&self) -> &'static str {
        match self {
            TravelMode::Walking => "foot-walking",
            TravelMode::Driving => "driving-car",
        }
    }
}

/// A computed route between two coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Path as (lon, lat) pairs, origin first.
    pub path: Vec<[f64; 2]>,
}

/// Computes routes between coordinate pairs given as `[lon, lat]`.
pub trait Router: Send + Sync {
    fn route(&self, origin: [f64; 2], dest: [f64; 2], mode: TravelMode)
    -> Result<Route, RouteError>;
}

/// Configuration for the OpenRouteService-backed router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Base URL of the directions API.
    pub base_url: String,
    /// API key; sent as a query parameter.
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org".into(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// HTTP client for the directions API.
pub struct RouteClient {
    config: RouteConfig,
}

impl RouteClient {
    /// Create a new client with the given configuration.
    pub fn new(config: RouteConfig) -> Self {
        Self { config }
    }

    fn map_call_error(&self, err: ureq::Error) -> RouteError {
        match err {
            ureq::Error::Transport(t) => {
                let message = t.to_string();
                if matches!(t.kind(), ureq::ErrorKind::Io) && message.contains("timed out") {
                    RouteError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else {
                    RouteError::RequestFailed { message }
                }
            }
            other => RouteError::RequestFailed {
                message: other.to_string(),
            },
        }
    }
}

impl Router for RouteClient {
    fn route(
        &self,
        origin: [f64; 2],
        dest: [f64; 2],
        mode: TravelMode,
    ) -> Result<Route, RouteError> {
        for [lon, lat] in [origin, dest] {
            if !lon.is_finite() || !lat.is_finite() {
                return Err(RouteError::InvalidCoordinate { lon, lat });
            }
        }

        let url = format!(
            "{}/v2/directions/{}?api_key={}&start={},{}&end={},{}",
            self.config.base_url,
            mode.profile(),
            self.config.api_key,
            origin[0],
            origin[1],
            dest[0],
            dest[1],
        );

        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        tracing::debug!(mode = mode.profile(), "routing request");

        let resp = agent.get(&url).call().map_err(|e| self.map_call_error(e))?;

        let resp_str = resp.into_string().map_err(|e| RouteError::BadResponse {
            message: e.to_string(),
        })?;

        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| RouteError::BadResponse {
                message: e.to_string(),
            })?;

        parse_directions(&json)
    }
}

impl std::fmt::Debug for RouteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

/// Extract distance, duration, and path from a GeoJSON directions response.
fn parse_directions(json: &serde_json::Value) -> Result<Route, RouteError> {
    let feature = json["features"]
        .as_array()
        .and_then(|f| f.first())
        .ok_or_else(|| RouteError::BadResponse {
            message: "no route features in response".into(),
        })?;

    let segment = feature["properties"]["segments"]
        .as_array()
        .and_then(|s| s.first())
        .ok_or_else(|| RouteError::BadResponse {
            message: "no route segments in response".into(),
        })?;

    let distance_meters =
        segment["distance"]
            .as_f64()
            .ok_or_else(|| RouteError::BadResponse {
                message: "missing segment distance".into(),
            })?;
    let duration_seconds =
        segment["duration"]
            .as_f64()
            .ok_or_else(|| RouteError::BadResponse {
                message: "missing segment duration".into(),
            })?;

    let path = feature["geometry"]["coordinates"]
        .as_array()
        .ok_or_else(|| RouteError::BadResponse {
            message: "missing route geometry".into(),
        })?
        .iter()
        .map(|pair| {
            let lon = pair[0].as_f64();
            let lat = pair[1].as_f64();
            match (lon, lat) {
                (Some(lon), Some(lat)) => Ok([lon, lat]),
                _ => Err(RouteError::BadResponse {
                    message: "malformed coordinate pair in geometry".into(),
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Route {
        distance_meters,
        duration_seconds,
        path,
    })
}
