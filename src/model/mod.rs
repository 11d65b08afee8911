//! Data models shared by sessions, the canvas and the backend client.

mod geometry;
mod mode;

pub use geometry::{DirectionalLine, Geometry, Line, Pen, Point};
pub use mode::{CanvasKind, IpTarget, MetricKind, Mode, UnknownMode};
