use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shiftdesk_config::MapsSettings;
use shiftdesk_db::models::GeoPoint;

use super::{http_client, with_deadline};
use crate::error::ProviderError;

const PROVIDER: &str = "maps";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficInfo {
    /// 0 (none) to 4 (severe).
    pub level: u8,
    pub description: String,
    pub current_speed: f64,
    pub free_flow_speed: f64,
    pub delay_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteOption {
    pub distance_km: f64,
    pub travel_minutes: f64,
    pub traffic_delay_minutes: f64,
}

#[async_trait]
pub trait TrafficProvider: Send + Sync {
    async fn traffic(&self, at: GeoPoint) -> Result<TrafficInfo, ProviderError>;

    async fn routes(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        max_options: usize,
    ) -> Result<Vec<RouteOption>, ProviderError>;
}

/// Congestion level from the ratio of current to free-flow speed.
pub fn traffic_level(current_speed: f64, free_flow_speed: f64) -> u8 {
    if free_flow_speed <= 0.0 {
        return 0;
    }
    let ratio = current_speed / free_flow_speed;
    if ratio >= 0.9 {
        0
    } else if ratio >= 0.75 {
        1
    } else if ratio >= 0.5 {
        2
    } else if ratio >= 0.25 {
        3
    } else {
        4
    }
}

pub fn level_description(level: u8) -> &'static str {
    match level {
        0 => "no traffic",
        1 => "light",
        2 => "moderate",
        3 => "heavy",
        _ => "severe",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowResponse {
    flow_segment_data: FlowSegment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowSegment {
    current_speed: f64,
    free_flow_speed: f64,
    #[serde(default)]
    current_travel_time: f64,
    #[serde(default)]
    free_flow_travel_time: f64,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    summary: RouteSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteSummary {
    length_in_meters: f64,
    travel_time_in_seconds: f64,
    #[serde(default)]
    traffic_delay_in_seconds: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl From<FlowSegment> for TrafficInfo {
    fn from(seg: FlowSegment) -> Self {
        let level = traffic_level(seg.current_speed, seg.free_flow_speed);
        let delay = ((seg.current_travel_time - seg.free_flow_travel_time) / 60.0).max(0.0);
        TrafficInfo {
            level,
            description: level_description(level).to_string(),
            current_speed: seg.current_speed,
            free_flow_speed: seg.free_flow_speed,
            delay_minutes: round1(delay),
        }
    }
}

impl From<RouteSummary> for RouteOption {
    fn from(s: RouteSummary) -> Self {
        RouteOption {
            distance_km: round1(s.length_in_meters / 1000.0),
            travel_minutes: (s.travel_time_in_seconds / 60.0).round(),
            traffic_delay_minutes: (s.traffic_delay_in_seconds / 60.0).round(),
        }
    }
}

/// Azure Maps traffic-flow and route-directions client.
pub struct AzureMapsClient {
    client: reqwest::Client,
    settings: MapsSettings,
}

impl AzureMapsClient {
    pub fn new(settings: MapsSettings) -> Self {
        Self {
            client: http_client(settings.timeout_secs),
            settings,
        }
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.settings.subscription_key.is_empty() {
            return Err(ProviderError::NotConfigured(PROVIDER));
        }
        Ok(())
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        self.client
            .get(format!(
                "{}{path}",
                self.settings.base_url.trim_end_matches('/')
            ))
            .query(&[
                ("api-version", "1.0"),
                ("subscription-key", self.settings.subscription_key.as_str()),
            ])
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Unavailable(PROVIDER, e.to_string()))
    }
}

#[async_trait]
impl TrafficProvider for AzureMapsClient {
    async fn traffic(&self, at: GeoPoint) -> Result<TrafficInfo, ProviderError> {
        self.ensure_configured()?;
        let query = [
            ("style", "absolute".to_string()),
            ("zoom", "10".to_string()),
            ("query", format!("{},{}", at.lat, at.lon)),
        ];
        with_deadline(PROVIDER, self.settings.timeout_secs, async {
            let flow: FlowResponse = self.get("/traffic/flow/segment/json", &query).await?;
            Ok(flow.flow_segment_data.into())
        })
        .await
    }

    async fn routes(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        max_options: usize,
    ) -> Result<Vec<RouteOption>, ProviderError> {
        self.ensure_configured()?;
        let query = [
            (
                "query",
                format!(
                    "{},{}:{},{}",
                    origin.lat, origin.lon, destination.lat, destination.lon
                ),
            ),
            ("traffic", "true".to_string()),
            (
                "maxAlternatives",
                max_options.saturating_sub(1).to_string(),
            ),
        ];
        with_deadline(PROVIDER, self.settings.timeout_secs, async {
            let resp: RouteResponse = self.get("/route/directions/json", &query).await?;
            Ok(resp
                .routes
                .into_iter()
                .take(max_options)
                .map(|r| r.summary.into())
                .collect())
        })
        .await
    }
}
