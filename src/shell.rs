//! Application shell: routing, video upload, IP-camera connect, and the
//! per-mode view that ties a drawing session to a processing panel.

use std::path::Path;

use ab_glyph::FontVec;
use reqwest::Url;
use thiserror::Error;

use crate::canvas::{Canvas, CanvasError};
use crate::client::{BackendClient, ClientError, StartStreamResponse, UploadOutcome};
use crate::model::{IpTarget, Mode, Pen, UnknownMode};
use crate::panel::{PanelError, ProcessingPanel};
use crate::session::{DrawingSession, InputEvent};
use crate::stream::ResultState;

/// Feed status after a fully successful connect.
pub const STREAM_STARTED: &str = "Stream started successfully";

/// Feed status when the backend refused to start the stream.
pub const STREAM_REFUSED: &str = "Error: Unable to start stream";

/// Errors surfaced by shell actions.
#[derive(Error, Debug)]
pub enum ShellError {
    /// No snapshot is available for the mode yet
    #[error("No snapshot available for mode '{mode}'")]
    NoSnapshot { mode: Mode },

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error(transparent)]
    UnknownMode(#[from] UnknownMode),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error(transparent)]
    Panel(#[from] PanelError),
}

/// Client-side routes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    /// `/`
    #[default]
    Home,
    /// `/video/<mode>`, with `?ip=&port=` for IP modes
    Video {
        mode: Mode,
        target: Option<IpTarget>,
    },
}

impl Route {
    /// Parse a path such as `/video/count_ip?ip=10.0.0.5&port=554`.
    ///
    /// The camera address is only kept for IP modes, and only when both
    /// query parameters are present.
    pub fn parse(path: &str) -> Result<Route, ShellError> {
        let url = Url::parse("http://roadlens.local/")
            .and_then(|base| base.join(path))
            .map_err(|_| ShellError::UnknownRoute(path.to_string()))?;

        let segments: Vec<&str> = url
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Ok(Route::Home),
            ["video", slug] => {
                let mode: Mode = slug.parse()?;
                let mut ip = None;
                let mut port = None;
                for (key, value) in url.query_pairs() {
                    match key.as_ref() {
                        "ip" => ip = Some(value.into_owned()),
                        "port" => port = Some(value.into_owned()),
                        _ => {}
                    }
                }
                let target = match (ip, port) {
                    (Some(ip), Some(port)) if mode.is_ip() => Some(IpTarget::new(ip, port)),
                    _ => None,
                };
                Ok(Route::Video { mode, target })
            }
            _ => Err(ShellError::UnknownRoute(path.to_string())),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Video { mode, target: None } => format!("/video/{}", mode.slug()),
            Route::Video {
                mode,
                target: Some(target),
            } => format!(
                "/video/{}?ip={}&port={}",
                mode.slug(),
                target.ip,
                target.port
            ),
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        match self {
            Route::Home => None,
            Route::Video { mode, .. } => Some(*mode),
        }
    }

    /// Page heading: the mode title, or the generic one on the home route.
    pub fn title(&self) -> String {
        match self {
            Route::Home => "Video Processing".to_string(),
            Route::Video { mode, .. } => mode.title(),
        }
    }
}

/// Results of the two independent calls made when connecting a camera.
#[derive(Debug)]
pub struct ConnectOutcome {
    pub target: IpTarget,
    /// Size of the snapshot fetched, or why it failed
    pub snapshot: Result<usize, ClientError>,
    pub stream: Result<StartStreamResponse, ClientError>,
}

impl ConnectOutcome {
    pub fn is_ok(&self) -> bool {
        self.snapshot.is_ok() && self.stream.is_ok()
    }

    /// Status line for the sidebar.
    pub fn feed_status(&self) -> String {
        match (&self.snapshot, &self.stream) {
            (Err(e), _) => format!("Error: {e}"),
            (Ok(_), Err(ClientError::Status { .. })) => STREAM_REFUSED.to_string(),
            (Ok(_), Err(e)) => format!("Error: {e}"),
            (Ok(_), Ok(_)) => STREAM_STARTED.to_string(),
        }
    }

    /// The stream-start response, or the first failure.
    pub fn into_result(self) -> Result<StartStreamResponse, ShellError> {
        self.snapshot?;
        Ok(self.stream?)
    }
}

/// Top-level application state.
#[derive(Debug)]
pub struct Shell {
    client: BackendClient,
    route: Route,
    snapshot_url: Option<String>,
    video_url: Option<String>,
    /// Last camera frame fetched by `connect`, with the camera it came from
    ip_snapshot: Option<(IpTarget, Vec<u8>)>,
    feed_status: Option<String>,
}

impl Shell {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            route: Route::Home,
            snapshot_url: None,
            video_url: None,
            ip_snapshot: None,
            feed_status: None,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn navigate(&mut self, route: Route) {
        log::debug!("Navigating to {}", route.path());
        self.route = route;
    }

    pub fn snapshot_url(&self) -> Option<&str> {
        self.snapshot_url.as_deref()
    }

    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    pub fn ip_snapshot(&self) -> Option<&[u8]> {
        self.ip_snapshot.as_ref().map(|(_, bytes)| bytes.as_slice())
    }

    pub fn feed_status(&self) -> Option<&str> {
        self.feed_status.as_deref()
    }

    /// Upload a local video. On failure the shell keeps its previous URLs.
    pub async fn upload(&mut self, path: &Path) -> Result<UploadOutcome, ShellError> {
        let outcome = self.client.upload_video(path).await?;
        self.accept_upload(&outcome);
        Ok(outcome)
    }

    pub async fn upload_bytes(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, ShellError> {
        let outcome = self.client.upload_video_bytes(file_name, bytes).await?;
        self.accept_upload(&outcome);
        Ok(outcome)
    }

    fn accept_upload(&mut self, outcome: &UploadOutcome) {
        log::info!("Video uploaded; snapshot at {}", outcome.snapshot_url);
        self.snapshot_url = Some(outcome.snapshot_url.clone());
        self.video_url = Some(outcome.video_url.clone());
    }

    /// Fetch the camera snapshot and start its stream, concurrently.
    ///
    /// A fetched snapshot is kept even if the stream fails to start. The
    /// route moves to `mode` only when both calls succeeded.
    pub async fn connect(&mut self, target: IpTarget, mode: Mode) -> ConnectOutcome {
        self.feed_status = None;

        let (snapshot, stream) = tokio::join!(
            self.client.get_snapshot(&target),
            self.client.start_stream(&target)
        );

        let snapshot = snapshot.map(|bytes| {
            let len = bytes.len();
            self.ip_snapshot = Some((target.clone(), bytes));
            len
        });

        let outcome = ConnectOutcome {
            target,
            snapshot,
            stream,
        };

        if let Err(e) = &outcome.snapshot {
            log::error!("Snapshot from {} failed: {}", outcome.target, e);
        }
        if let Err(e) = &outcome.stream {
            log::error!("Starting stream from {} failed: {}", outcome.target, e);
        }

        self.feed_status = Some(outcome.feed_status());
        if outcome.is_ok() {
            self.navigate(Route::Video {
                mode,
                target: Some(outcome.target.clone()),
            });
        }
        outcome
    }

    /// Snapshot bytes for a mode: the frame of `target` in IP modes,
    /// otherwise the uploaded video's first frame.
    ///
    /// The frame cached by `connect` is only used when it came from `target`;
    /// any other camera is fetched afresh.
    pub async fn load_snapshot(
        &self,
        mode: Mode,
        target: Option<&IpTarget>,
    ) -> Result<Vec<u8>, ShellError> {
        if mode.is_ip() {
            let target = target.ok_or(ShellError::NoSnapshot { mode })?;
            if let Some((cached, bytes)) = &self.ip_snapshot {
                if cached == target {
                    return Ok(bytes.clone());
                }
            }
            log::debug!("Fetching snapshot for {}", target);
            return Ok(self.client.get_snapshot(target).await?);
        }
        let url = self
            .snapshot_url
            .as_deref()
            .ok_or(ShellError::NoSnapshot { mode })?;
        Ok(self.client.fetch_bytes(url).await?)
    }

    /// Mount the view for the current route.
    pub async fn open_view(&self, pen: Pen, font: Option<FontVec>) -> Result<View, ShellError> {
        let Route::Video { mode, target } = &self.route else {
            return Err(ShellError::UnknownRoute(self.route.path()));
        };
        let snapshot = self.load_snapshot(*mode, target.as_ref()).await?;
        View::new(*mode, target.clone(), &snapshot, pen, font)
    }
}

/// One mode's page: the canvas variant and the processing panel.
#[derive(Debug)]
pub struct View {
    pub session: DrawingSession,
    pub canvas: Canvas,
    pub panel: ProcessingPanel,
}

impl View {
    pub fn new(
        mode: Mode,
        target: Option<IpTarget>,
        snapshot: &[u8],
        pen: Pen,
        font: Option<FontVec>,
    ) -> Result<Self, ShellError> {
        let mut canvas = Canvas::from_bytes(snapshot)?;
        if let Some(font) = font {
            canvas = canvas.with_font(font);
        }

        let mut session = DrawingSession::new(mode.canvas_kind());
        session.set_pen(pen);
        canvas.redraw(&session);
        session.clear_dirty();

        Ok(Self {
            session,
            canvas,
            panel: ProcessingPanel::new(mode, target),
        })
    }

    pub fn mode(&self) -> Mode {
        self.panel.mode()
    }

    /// Route an input event through the canvas into the session.
    pub fn dispatch(&mut self, event: &InputEvent) -> bool {
        self.canvas.dispatch(&mut self.session, event)
    }

    /// Process the session's current geometry.
    pub async fn process<F>(
        &mut self,
        client: &BackendClient,
        on_update: F,
    ) -> Result<&ResultState, ShellError>
    where
        F: FnMut(&ResultState),
    {
        let geometry = self.session.geometry();
        Ok(self.panel.process(client, &geometry, on_update).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::ViewportOrigin;
    use crate::model::Geometry;
    use crate::test_backend;
    use axum::Json;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use std::collections::HashMap;
    use image::{ImageFormat, Rgba, RgbaImage};
    use serde_json::json;
    use std::io::Cursor;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([20, 40, 60, 255]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn camera_backend(snapshot_status: StatusCode, stream_status: StatusCode) -> Router {
        Router::new()
            .route(
                "/get_snapshot",
                get(move || async move { (snapshot_status, png(8, 6)) }),
            )
            .route(
                "/start_stream",
                post(move || async move {
                    (stream_status, Json(json!({"snapshot_path": "cam.jpg"})))
                }),
            )
    }

    #[test]
    fn test_route_parsing() {
        assert_eq!(Route::parse("/").unwrap(), Route::Home);
        assert_eq!(
            Route::parse("/video/count").unwrap(),
            Route::Video {
                mode: Mode::Count,
                target: None
            }
        );
        assert_eq!(
            Route::parse("/video/wrong-lane_ip?ip=10.0.0.5&port=554").unwrap(),
            Route::Video {
                mode: Mode::WrongLaneIp,
                target: Some(IpTarget::new("10.0.0.5", "554"))
            }
        );
        // Local modes ignore camera parameters
        assert_eq!(
            Route::parse("/video/speed?ip=1&port=2").unwrap().path(),
            "/video/speed"
        );
        assert!(matches!(
            Route::parse("/video/track-using-ip"),
            Err(ShellError::UnknownMode(_))
        ));
        assert!(matches!(
            Route::parse("/settings"),
            Err(ShellError::UnknownRoute(_))
        ));
    }

    #[test]
    fn test_route_path_and_title() {
        let route = Route::Video {
            mode: Mode::CountIp,
            target: Some(IpTarget::new("10.0.0.5", "554")),
        };
        assert_eq!(route.path(), "/video/count_ip?ip=10.0.0.5&port=554");
        assert_eq!(Route::parse(&route.path()).unwrap(), route);
        assert_eq!(Route::Home.title(), "Video Processing");
        assert_eq!(
            Route::Video {
                mode: Mode::Count,
                target: None
            }
            .title(),
            "Count Mode"
        );
    }

    #[tokio::test]
    async fn test_upload_sets_urls_and_failure_keeps_them() {
        let router = Router::new().route(
            "/upload_video",
            post(|body: axum::body::Bytes| async move {
                if body.windows(6).any(|w| w == b"broken") {
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})))
                } else {
                    (StatusCode::OK, Json(json!({"snapshot": "a.jpg"})))
                }
            }),
        );
        let base = test_backend::spawn(router).await;
        let mut shell = Shell::new(BackendClient::new(&base).unwrap());

        shell.upload_bytes("clip.mp4", b"frames".to_vec()).await.unwrap();
        assert_eq!(shell.snapshot_url(), Some(format!("{base}/uploads/a.jpg").as_str()));
        assert_eq!(shell.video_url(), Some(format!("{base}/uploads/clip.mp4").as_str()));

        let err = shell
            .upload_bytes("other.mp4", b"broken".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Client(ClientError::Status { .. })));
        assert_eq!(shell.video_url(), Some(format!("{base}/uploads/clip.mp4").as_str()));
    }

    #[tokio::test]
    async fn test_connect_success_navigates() {
        let base = test_backend::spawn(camera_backend(StatusCode::OK, StatusCode::OK)).await;
        let mut shell = Shell::new(BackendClient::new(&base).unwrap());
        let target = IpTarget::new("10.0.0.5", "554");

        let outcome = shell.connect(target.clone(), Mode::CountIp).await;

        assert!(outcome.is_ok());
        assert_eq!(shell.feed_status(), Some(STREAM_STARTED));
        assert!(shell.ip_snapshot().is_some());
        assert_eq!(
            shell.route(),
            &Route::Video {
                mode: Mode::CountIp,
                target: Some(target)
            }
        );
        let response = outcome.into_result().unwrap();
        assert_eq!(response.snapshot_path.as_deref(), Some("cam.jpg"));
    }

    #[tokio::test]
    async fn test_connect_stream_refused_keeps_snapshot() {
        let base = test_backend::spawn(camera_backend(
            StatusCode::OK,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
        .await;
        let mut shell = Shell::new(BackendClient::new(&base).unwrap());

        let outcome = shell
            .connect(IpTarget::new("10.0.0.5", "554"), Mode::CountIp)
            .await;

        assert!(outcome.snapshot.is_ok());
        assert!(outcome.stream.is_err());
        assert_eq!(shell.feed_status(), Some(STREAM_REFUSED));
        assert!(shell.ip_snapshot().is_some());
        assert_eq!(shell.route(), &Route::Home);
        assert!(outcome.into_result().is_err());
    }

    #[tokio::test]
    async fn test_connect_snapshot_failure_is_surfaced() {
        let base = test_backend::spawn(camera_backend(StatusCode::NOT_FOUND, StatusCode::OK)).await;
        let mut shell = Shell::new(BackendClient::new(&base).unwrap());

        let outcome = shell
            .connect(IpTarget::new("10.0.0.5", "554"), Mode::WrongLaneIp)
            .await;

        assert!(outcome.stream.is_ok());
        assert!(shell.ip_snapshot().is_none());
        assert!(shell.feed_status().unwrap().starts_with("Error: "));
        assert!(matches!(
            outcome.into_result(),
            Err(ShellError::Client(ClientError::Status { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn test_open_view_needs_snapshot() {
        let mut shell = Shell::new(BackendClient::new("http://127.0.0.1:9").unwrap());
        shell.navigate(Route::parse("/video/segmentation").unwrap());

        let err = shell.open_view(Pen::default(), None).await.unwrap_err();
        assert!(matches!(
            err,
            ShellError::NoSnapshot {
                mode: Mode::Segmentation
            }
        ));
    }

    #[tokio::test]
    async fn test_open_view_from_uploaded_snapshot() {
        let router = Router::new()
            .route(
                "/upload_video",
                post(|| async { Json(json!({"snapshot": "a.png"})) }),
            )
            .route("/uploads/a.png", get(|| async { png(30, 20) }));
        let base = test_backend::spawn(router).await;
        let mut shell = Shell::new(BackendClient::new(&base).unwrap());

        shell.upload_bytes("clip.mp4", Vec::new()).await.unwrap();
        shell.navigate(Route::parse("/video/count").unwrap());

        let mut view = shell.open_view(Pen::new("#00ff00", 3), None).await.unwrap();
        assert_eq!((view.canvas.width(), view.canvas.height()), (30, 20));
        assert_eq!(view.canvas.surface(), view.canvas.background());

        view.canvas.set_origin(ViewportOrigin { left: 5.0, top: 5.0 });
        view.dispatch(&InputEvent::Down { x: 10.0, y: 10.0 });
        view.dispatch(&InputEvent::Move { x: 30.0, y: 20.0 });
        view.dispatch(&InputEvent::Up);

        let Geometry::Lines { lines } = view.session.geometry() else {
            panic!("Expected line geometry");
        };
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].color.as_deref(), Some("#00ff00"));
        assert_eq!(lines[0].size, Some(3));
        assert_eq!((lines[0].start_x, lines[0].end_y), (5.0, 15.0));
    }

    #[tokio::test]
    async fn test_ip_view_uses_camera_snapshot() {
        let router = camera_backend(StatusCode::OK, StatusCode::OK).route(
            "/count_ip",
            post(|| async { test_backend::ndjson(vec!["{\"frame\":\"AA\",\"counts\":[]}\n"]) }),
        );
        let base = test_backend::spawn(router).await;
        let mut shell = Shell::new(BackendClient::new(&base).unwrap());

        shell
            .connect(IpTarget::new("10.0.0.5", "554"), Mode::CountIp)
            .await;
        let mut view = shell.open_view(Pen::default(), None).await.unwrap();
        assert_eq!((view.canvas.width(), view.canvas.height()), (8, 6));
        assert_eq!(view.mode(), Mode::CountIp);

        let client = shell.client().clone();
        let state = view.process(&client, |_| {}).await.unwrap();
        assert_eq!(state.frame_base64(), Some("AA"));
    }

    /// Two cameras: `10.0.0.5` serves an 8x6 frame, any other a 40x30 one,
    /// and only `10.0.0.5` accepts a stream start.
    fn two_camera_backend() -> Router {
        Router::new()
            .route(
                "/get_snapshot",
                get(|Query(query): Query<HashMap<String, String>>| async move {
                    match query.get("ip").map(String::as_str) {
                        Some("10.0.0.5") => png(8, 6),
                        _ => png(40, 30),
                    }
                }),
            )
            .route(
                "/start_stream",
                post(|Json(target): Json<IpTarget>| async move {
                    if target.ip == "10.0.0.5" {
                        (StatusCode::OK, Json(json!({})))
                    } else {
                        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})))
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_ip_view_snapshot_follows_route_camera() {
        let base = test_backend::spawn(two_camera_backend()).await;
        let mut shell = Shell::new(BackendClient::new(&base).unwrap());
        let first = IpTarget::new("10.0.0.5", "554");

        assert!(shell.connect(first.clone(), Mode::CountIp).await.is_ok());
        let outcome = shell
            .connect(IpTarget::new("10.0.0.9", "554"), Mode::CountIp)
            .await;
        assert!(outcome.snapshot.is_ok());
        assert!(outcome.stream.is_err());

        // Still on the first camera, whose frame the view must show
        assert_eq!(shell.route().path(), "/video/count_ip?ip=10.0.0.5&port=554");
        let view = shell.open_view(Pen::default(), None).await.unwrap();
        assert_eq!((view.canvas.width(), view.canvas.height()), (8, 6));
        assert_eq!(view.panel.target(), Some(&first));
    }

    #[tokio::test]
    async fn test_ip_route_opened_directly_fetches_snapshot() {
        let base = test_backend::spawn(two_camera_backend()).await;
        let mut shell = Shell::new(BackendClient::new(&base).unwrap());
        shell.navigate(Route::parse("/video/wrong-lane_ip?ip=10.0.0.5&port=554").unwrap());

        let view = shell.open_view(Pen::default(), None).await.unwrap();
        assert_eq!((view.canvas.width(), view.canvas.height()), (8, 6));
        assert_eq!(view.mode(), Mode::WrongLaneIp);

        // Without an address there is nothing to fetch
        shell.navigate(Route::parse("/video/count_ip").unwrap());
        assert!(matches!(
            shell.open_view(Pen::default(), None).await,
            Err(ShellError::NoSnapshot { mode: Mode::CountIp })
        ));
    }
}
