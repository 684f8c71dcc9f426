//! Wire types matching the query/aggregation service responses.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Response of `GET /query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub count: u64,
    #[serde(default)]
    pub results: Vec<EventSummary>,
}

/// One detected heavy rainfall event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventSummary {
    pub event_id: u64,
    /// Unix seconds.
    pub start_time: f64,
    /// Duration in hours.
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub severity_index: f64,
    #[serde(default, rename = "meanLat")]
    pub mean_lat: Option<f64>,
    #[serde(default, rename = "meanLon")]
    pub mean_lon: Option<f64>,
    #[serde(default, rename = "meanPrec")]
    pub mean_prec: Option<f64>,
    #[serde(default, rename = "maxPrec")]
    pub max_prec: Option<f64>,
}

impl EventSummary {
    pub fn start_time_ms(&self) -> f64 {
        self.start_time * 1000.0
    }
}

/// Response of `GET /detail/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventDetail {
    pub timeseries: Vec<TimeseriesPoint>,
}

/// One timestep of an event's spatial track.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeseriesPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub index: f64,
    pub area: f64,
    pub date: String,
    pub severity_index: f64,
    pub size: f64,
}

/// Response of `GET /overview`: per-field binned statistics plus outliers.
#[derive(Debug, Clone, Deserialize)]
pub struct OverviewResponse {
    pub stat: BTreeMap<String, Vec<StatPoint>>,
    pub outliers: BTreeMap<String, Vec<OutlierRecord>>,
}

/// Mean and high quantile of one bin, anchored at the bin's first event.
#[derive(Debug, Clone, Deserialize)]
pub struct StatPoint {
    pub start_time: String,
    pub mean: f64,
    pub quantile: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutlierRecord {
    pub start: String,
    pub value: f64,
}

/// Response of `GET /overview-histogram`: event counts keyed
/// year -> month -> day.
pub type HistogramResponse = BTreeMap<String, BTreeMap<String, BTreeMap<String, u64>>>;

/// Response of `GET /spider`: summary statistics for one interval.
#[derive(Debug, Clone, Deserialize)]
pub struct SpiderStats {
    pub severity_index: f64,
    pub length: f64,
    pub area: f64,
    pub events_per_day: f64,
    #[serde(default)]
    pub total_events: f64,
}

impl SpiderStats {
    /// Axis values in fixed radar order.
    pub fn axes(&self) -> [f64; 5] {
        [
            self.severity_index,
            self.length,
            self.area,
            self.total_events,
            self.events_per_day,
        ]
    }

    pub const AXIS_LABELS: [&'static str; 5] = [
        "Severity Index",
        "Length",
        "Area",
        "Total Events",
        "Events per Day",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_response_deserializes_with_optional_columns() {
        let body = r#"{
            "count": 2,
            "results": [
                {"event_id": 1, "start_time": 1451606400, "length": 3,
                 "area": 12.5, "severity_index": 0.8,
                 "meanLat": 47.1, "meanLon": 11.2},
                {"event_id": 2, "start_time": 1451692800}
            ]
        }"#;
        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.count, 2);
        assert_eq!(parsed.results[0].mean_lat, Some(47.1));
        assert_eq!(parsed.results[0].start_time_ms(), 1_451_606_400_000.0);
        assert!(parsed.results[1].mean_lat.is_none());
    }

    #[test]
    fn overview_response_deserializes_per_field() {
        let body = r#"{
            "stat": {"area": [{"start_time": "2016-01-01", "mean": 1.5, "quantile": 3.0}]},
            "outliers": {"area": [{"start": "2016-06-01", "value": 99.0}]}
        }"#;
        let parsed: OverviewResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.stat["area"].len(), 1);
        assert_eq!(parsed.outliers["area"][0].value, 99.0);
    }

    #[test]
    fn histogram_response_is_nested_counts() {
        let body = r#"{"2016": {"6": {"1": 4, "2": 7}}}"#;
        let parsed: HistogramResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed["2016"]["6"]["2"], 7);
    }

    #[test]
    fn spider_stats_axes_follow_fixed_order() {
        let body = r#"{"severity_index": 0.5, "length": 4.0, "area": 20.0,
                       "events_per_day": 1.25, "total_events": 10.0}"#;
        let parsed: SpiderStats = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.axes(), [0.5, 4.0, 20.0, 10.0, 1.25]);
    }
}
