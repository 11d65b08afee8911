//! Processing panel: posts a mode's geometry and shows the streamed results.

use serde_json::Value;
use thiserror::Error;

use crate::client::{BackendClient, ClientError};
use crate::model::{CanvasKind, Geometry, IpTarget, Mode};
use crate::stream::{ResultState, StreamConsumer, StreamError};

/// Errors that can occur while processing.
#[derive(Error, Debug)]
pub enum PanelError {
    /// The mode offers no process action in the current state
    #[error("Processing unavailable: {reason}")]
    Unavailable {
        /// Why the action is not offered
        reason: String,
    },

    /// Geometry drawn on a different canvas variant than the mode uses
    #[error("Geometry for {found:?} canvas does not fit a {expected:?} mode")]
    GeometryMismatch {
        expected: CanvasKind,
        found: CanvasKind,
    },

    /// The request failed before the stream started
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The stream failed part-way
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result area of one mode view.
#[derive(Debug, Clone)]
pub struct ProcessingPanel {
    mode: Mode,
    target: Option<IpTarget>,
    state: ResultState,
}

impl ProcessingPanel {
    pub fn new(mode: Mode, target: Option<IpTarget>) -> Self {
        Self {
            mode,
            target,
            state: ResultState::new(mode.metric_kind()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn target(&self) -> Option<&IpTarget> {
        self.target.as_ref()
    }

    /// Heading shown above the panel.
    pub fn title(&self) -> String {
        self.mode.title()
    }

    /// Label of the process button, if the action is offered.
    pub fn button_label(&self) -> Option<&'static str> {
        if self.is_available() {
            self.mode.button_label()
        } else {
            None
        }
    }

    /// Why the process action is not offered, or `None` if it is.
    pub fn unavailable_reason(&self) -> Option<String> {
        if self.mode.endpoint().is_none() {
            return Some(format!("mode '{}' has no processing endpoint", self.mode));
        }
        if self.mode.is_ip() && self.target.is_none() {
            return Some(format!("mode '{}' needs an IP camera address", self.mode));
        }
        None
    }

    pub fn is_available(&self) -> bool {
        self.unavailable_reason().is_none()
    }

    /// JSON body for the mode's endpoint: the geometry, plus `ip`/`port` in
    /// IP modes.
    pub fn request_body(&self, geometry: &Geometry) -> Result<Value, PanelError> {
        let expected = self.mode.canvas_kind();
        if geometry.kind() != expected {
            return Err(PanelError::GeometryMismatch {
                expected,
                found: geometry.kind(),
            });
        }

        let mut body = serde_json::to_value(geometry)?;
        if self.mode.is_ip() {
            if let (Some(target), Value::Object(map)) = (&self.target, &mut body) {
                map.insert("ip".to_string(), Value::String(target.ip.clone()));
                map.insert("port".to_string(), Value::String(target.port.clone()));
            }
        }
        Ok(body)
    }

    /// Latest frame and metrics.
    pub fn state(&self) -> &ResultState {
        &self.state
    }

    /// Post `geometry` and consume the result stream.
    ///
    /// The displayed result is reset before the request goes out. `on_update`
    /// sees every record as it replaces the previous one. When the stream
    /// fails part-way the last good record stays displayed.
    pub async fn process<F>(
        &mut self,
        client: &BackendClient,
        geometry: &Geometry,
        on_update: F,
    ) -> Result<&ResultState, PanelError>
    where
        F: FnMut(&ResultState),
    {
        if let Some(reason) = self.unavailable_reason() {
            return Err(PanelError::Unavailable { reason });
        }
        let endpoint = self.mode.endpoint().unwrap_or_default();

        let body = self.request_body(geometry)?;
        self.state.reset();
        log::info!("{}: posting to {}", self.mode.title(), endpoint);

        let response = client.post_process(endpoint, &body).await?;

        let mut consumer = StreamConsumer::new(self.mode.metric_kind());
        let outcome = consumer.drive(response.bytes_stream(), on_update).await;
        self.state = consumer.finish();

        match outcome {
            Ok(()) => {
                log::info!(
                    "{}: stream complete after {} updates",
                    self.mode.title(),
                    self.state.updates()
                );
                Ok(&self.state)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DirectionalLine, Line, Pen, Point};
    use crate::stream::Metrics;
    use crate::test_backend;
    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use std::sync::{Arc, Mutex};

    fn one_line() -> Geometry {
        let mut line = Line::new(Point::new(0.0, 0.0), &Pen::default());
        line.set_end(Point::new(10.0, 10.0));
        Geometry::Lines { lines: vec![line] }
    }

    #[tokio::test]
    async fn test_count_stream_overwrites_results() {
        let seen_body = Arc::new(Mutex::new(Value::Null));
        let captured = seen_body.clone();
        let router = Router::new().route(
            "/Count",
            post(move |Json(body): Json<Value>| async move {
                *captured.lock().unwrap() = body;
                test_backend::ndjson(vec![
                    "{\"frame\":\"AA\",\"counts\":[1,",
                    "2]}\n{\"frame\":\"BB\",\"co",
                    "unts\":[3,4]}\n",
                ])
            }),
        );
        let base = test_backend::spawn(router).await;
        let client = BackendClient::new(&base).unwrap();

        let mut panel = ProcessingPanel::new(Mode::Count, None);
        let mut frames = Vec::new();
        let state = panel
            .process(&client, &one_line(), |s| {
                frames.push(s.frame_base64().unwrap_or_default().to_string())
            })
            .await
            .unwrap();

        assert_eq!(state.metrics(), &Metrics::Counts(vec![3, 4]));
        assert_eq!(frames, vec!["AA", "BB"]);

        let body = seen_body.lock().unwrap().clone();
        assert_eq!(body["lines"][0]["endX"], 10.0);
        assert_eq!(body["lines"][0]["color"], "#000000");
        assert!(body.get("ip").is_none());
    }

    #[tokio::test]
    async fn test_error_record_fails_and_keeps_last_frame() {
        let router = Router::new().route(
            "/Speed",
            post(|| async {
                test_backend::ndjson(vec![
                    "{\"frame\":\"AA\",\"vehicle_data\":{\"1\":{\"avg_speed\":40.0}}}\n",
                    "{\"error\":\"calibration failed\"}\n",
                    "{\"frame\":\"BB\",\"vehicle_data\":{}}\n",
                ])
            }),
        );
        let base = test_backend::spawn(router).await;
        let client = BackendClient::new(&base).unwrap();

        let mut panel = ProcessingPanel::new(Mode::Speed, None);
        let geometry = Geometry::Calibration {
            roi: Vec::new(),
            distance: Some(12.5),
        };
        let err = panel.process(&client, &geometry, |_| {}).await.unwrap_err();

        assert!(matches!(
            err,
            PanelError::Stream(StreamError::Backend(ref m)) if m == "calibration failed"
        ));
        assert_eq!(panel.state().frame_base64(), Some("AA"));
        assert_eq!(
            panel.state().metrics().summary_lines(),
            vec!["Vehicle ID: 1, Average Speed: 40.00 km/h"]
        );
    }

    #[tokio::test]
    async fn test_non_2xx_leaves_reset_state() {
        let router = Router::new().route(
            "/Segmentation",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "bad roi") }),
        );
        let base = test_backend::spawn(router).await;
        let client = BackendClient::new(&base).unwrap();

        let mut panel = ProcessingPanel::new(Mode::Segmentation, None);
        let err = panel
            .process(&client, &Geometry::Roi { roi: Vec::new() }, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PanelError::Client(ClientError::Status { status: 422, .. })
        ));
        assert!(!panel.state().has_frame());
    }

    #[tokio::test]
    async fn test_ip_body_carries_target() {
        let router = Router::new().route(
            "/Lane_ip",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["ip"], "10.0.0.5");
                assert_eq!(body["port"], "554");
                assert!(body["greenLine"].is_object());
                test_backend::ndjson(vec!["{\"frame\":\"AA\",\"wrong_way_count\":3}\n"])
            }),
        );
        let base = test_backend::spawn(router).await;
        let client = BackendClient::new(&base).unwrap();

        let mut panel = ProcessingPanel::new(Mode::WrongLaneIp, Some(IpTarget::new("10.0.0.5", "554")));
        let geometry = Geometry::WrongLane {
            roi: vec![Point::new(1.0, 1.0)],
            green_line: DirectionalLine::default(),
            red_line: DirectionalLine::default(),
        };
        let state = panel.process(&client, &geometry, |_| {}).await.unwrap();
        assert_eq!(state.metrics().summary_lines(), vec!["Wrong Way Count: 3"]);
    }

    #[tokio::test]
    async fn test_modes_without_endpoint_are_unavailable() {
        // Nothing listens here; an attempted request would fail differently.
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        let target = Some(IpTarget::new("10.0.0.5", "554"));

        for mode in [Mode::SpeedIp, Mode::SegmentationIp, Mode::AllIp] {
            let mut panel = ProcessingPanel::new(mode, target.clone());
            assert_eq!(panel.button_label(), None);
            let geometry = Geometry::empty(mode.canvas_kind());
            let err = panel.process(&client, &geometry, |_| {}).await.unwrap_err();
            assert!(matches!(err, PanelError::Unavailable { .. }), "{mode}");
        }

        let mut panel = ProcessingPanel::new(Mode::CountIp, None);
        assert!(!panel.is_available());
        let err = panel
            .process(&client, &one_line(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Unavailable { .. }));
    }

    #[test]
    fn test_button_labels_and_titles() {
        let panel = ProcessingPanel::new(Mode::WrongLaneIp, Some(IpTarget::new("a", "1")));
        assert_eq!(panel.button_label(), Some("Process Wrong Lane (IP)"));
        assert_eq!(
            ProcessingPanel::new(Mode::All, None).button_label(),
            Some("Process All")
        );
        assert_eq!(ProcessingPanel::new(Mode::Speed, None).title(), "Speed Mode");
    }

    #[test]
    fn test_geometry_mismatch() {
        let panel = ProcessingPanel::new(Mode::Speed, None);
        let err = panel.request_body(&one_line()).unwrap_err();
        assert!(matches!(
            err,
            PanelError::GeometryMismatch {
                expected: CanvasKind::Calibration,
                found: CanvasKind::Lines
            }
        ));
    }

    #[test]
    fn test_calibration_body_shape() {
        let panel = ProcessingPanel::new(Mode::Speed, None);
        let body = panel
            .request_body(&Geometry::Calibration {
                roi: vec![Point::new(1.0, 2.0)],
                distance: None,
            })
            .unwrap();
        assert_eq!(body, serde_json::json!({"roi": [{"x": 1.0, "y": 2.0}], "distance": null}));
    }
}
