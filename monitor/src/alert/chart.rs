use std::time::Duration;

use async_trait::async_trait;
use market::PriceSample;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::error::MonitorError;

pub const DEFAULT_CHART_URL: &str = "https://quickchart.io/chart";

/// Samples pulled from the store for one chart.
pub const CHART_HISTORY_POINTS: usize = 100;

/// Points actually plotted after down-sampling.
pub const MAX_CHART_POINTS: usize = 50;

/// Renders a price line chart to image bytes.
#[async_trait]
pub trait ChartRenderer: Send + Sync + 'static {
    async fn render(&self, points: &[f64], label: &str) -> Result<Vec<u8>, MonitorError>;
}

/// Keeps every `ceil(len / max_points)`-th price, starting with the oldest.
pub fn downsample(samples: &[PriceSample], max_points: usize) -> Vec<f64> {
    if max_points == 0 {
        return Vec::new();
    }
    let step = samples.len().div_ceil(max_points).max(1);
    samples.iter().step_by(step).map(|s| s.price).collect()
}

/// Chart.js line-chart definition understood by QuickChart.
pub fn line_chart_config(points: &[f64], label: &str) -> Value {
    let labels = vec![""; points.len()];
    json!({
        "type": "line",
        "data": {
            "labels": labels,
            "datasets": [{
                "label": label,
                "data": points,
                "borderColor": "rgb(75, 192, 192)",
                "borderWidth": 2,
                "pointRadius": 0,
                "fill": false
            }]
        },
        "options": {
            "legend": { "display": false },
            "scales": {
                "xAxes": [{ "display": false }],
                "yAxes": [{ "display": true }]
            }
        }
    })
}

/// QuickChart client. Posts the chart definition instead of encoding it into
/// a URL, which keeps long series under URL length limits.
#[derive(Clone)]
pub struct QuickChartClient {
    http: Client,
    url: String,
}

impl QuickChartClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, MonitorError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl ChartRenderer for QuickChartClient {
    #[instrument(skip(self, points), fields(points = points.len()), level = "debug")]
    async fn render(&self, points: &[f64], label: &str) -> Result<Vec<u8>, MonitorError> {
        let body = json!({
            "chart": line_chart_config(points, label),
            "width": 500,
            "height": 300,
            "backgroundColor": "white"
        });

        let resp = self.http.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MonitorError::Chart(format!("status {status}")));
        }

        let bytes = resp.bytes().await?;
        debug!(size = bytes.len(), "chart rendered");
        Ok(bytes.to_vec())
    }
}
