//! Geometry exchanged between annotation sessions and the backend.
//!
//! Field names follow the backend's JSON contract (`startX`, `greenLine`, ...),
//! so these types serialize straight into request bodies.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LINE_COLOR, DEFAULT_LINE_SIZE, MAX_LINE_SIZE, MIN_LINE_SIZE};
use crate::model::CanvasKind;

/// A 2D point in snapshot pixel coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Point halfway between `self` and `other`.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Stroke settings applied to newly drawn counting lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pen {
    /// CSS color string, usually `#rrggbb`
    pub color: String,
    /// Stroke width in pixels
    pub size: u32,
}

impl Pen {
    /// Create a pen, clamping the size to the selectable range.
    pub fn new(color: impl Into<String>, size: u32) -> Self {
        Self {
            color: color.into(),
            size: size.clamp(MIN_LINE_SIZE, MAX_LINE_SIZE),
        }
    }
}

impl Default for Pen {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_COLOR, DEFAULT_LINE_SIZE)
    }
}

/// A counting line. Its position in the session's line list is its report index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl Line {
    /// Start a zero-length line at `start` using the pen's style.
    pub fn new(start: Point, pen: &Pen) -> Self {
        Self {
            start_x: start.x,
            start_y: start.y,
            end_x: start.x,
            end_y: start.y,
            color: Some(pen.color.clone()),
            size: Some(pen.size),
        }
    }

    pub fn start(&self) -> Point {
        Point::new(self.start_x, self.start_y)
    }

    pub fn end(&self) -> Point {
        Point::new(self.end_x, self.end_y)
    }

    /// Move the terminal point.
    pub fn set_end(&mut self, end: Point) {
        self.end_x = end.x;
        self.end_y = end.y;
    }

    pub fn midpoint(&self) -> Point {
        self.start().midpoint(&self.end())
    }
}

/// One of the two direction lines of the wrong-lane canvas.
///
/// Both ends stay `None` until drawn; a click without a drag leaves `end` unset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DirectionalLine {
    pub start: Option<Point>,
    pub end: Option<Point>,
}

impl DirectionalLine {
    /// Line anchored at `start` with no end yet.
    pub fn anchored(start: Point) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Both ends are present.
    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// The segment, when both ends are present.
    pub fn segment(&self) -> Option<(Point, Point)> {
        self.start.zip(self.end)
    }
}

/// Finished geometry of one annotation session, shaped like the request body
/// of the matching backend endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Geometry {
    /// Counting lines: `{lines}`
    Lines { lines: Vec<Line> },
    /// Wrong-lane setup: `{roi, greenLine, redLine}`
    WrongLane {
        roi: Vec<Point>,
        #[serde(rename = "greenLine")]
        green_line: DirectionalLine,
        #[serde(rename = "redLine")]
        red_line: DirectionalLine,
    },
    /// Speed calibration: `{roi, distance}`; distance is `null` when not entered
    Calibration { roi: Vec<Point>, distance: Option<f64> },
    /// Plain region of interest: `{roi}`
    Roi { roi: Vec<Point> },
}

#[derive(Deserialize)]
struct LinesBody {
    #[serde(default)]
    lines: Vec<Line>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WrongLaneBody {
    #[serde(default)]
    roi: Vec<Point>,
    #[serde(default)]
    green_line: DirectionalLine,
    #[serde(default)]
    red_line: DirectionalLine,
}

#[derive(Deserialize)]
struct CalibrationBody {
    #[serde(default)]
    roi: Vec<Point>,
    #[serde(default)]
    distance: Option<f64>,
}

#[derive(Deserialize)]
struct RoiBody {
    #[serde(default)]
    roi: Vec<Point>,
}

impl Geometry {
    /// Empty geometry for a canvas variant.
    pub fn empty(kind: CanvasKind) -> Self {
        match kind {
            CanvasKind::Lines => Geometry::Lines { lines: Vec::new() },
            CanvasKind::WrongLane => Geometry::WrongLane {
                roi: Vec::new(),
                green_line: DirectionalLine::default(),
                red_line: DirectionalLine::default(),
            },
            CanvasKind::Calibration => Geometry::Calibration {
                roi: Vec::new(),
                distance: None,
            },
            CanvasKind::Roi => Geometry::Roi { roi: Vec::new() },
        }
    }

    /// The canvas variant that produces this geometry.
    pub fn kind(&self) -> CanvasKind {
        match self {
            Geometry::Lines { .. } => CanvasKind::Lines,
            Geometry::WrongLane { .. } => CanvasKind::WrongLane,
            Geometry::Calibration { .. } => CanvasKind::Calibration,
            Geometry::Roi { .. } => CanvasKind::Roi,
        }
    }

    /// Parse geometry saved for a specific canvas variant.
    ///
    /// The variants overlap structurally (`{roi}` is a subset of
    /// `{roi, distance}`), so the expected kind picks the shape. A bare JSON
    /// array is accepted as a line list.
    pub fn from_json(kind: CanvasKind, json: &str) -> Result<Self, serde_json::Error> {
        let geometry = match kind {
            CanvasKind::Lines => {
                let value: serde_json::Value = serde_json::from_str(json)?;
                let lines = if value.is_array() {
                    serde_json::from_value(value)?
                } else {
                    serde_json::from_value::<LinesBody>(value)?.lines
                };
                Geometry::Lines { lines }
            }
            CanvasKind::WrongLane => {
                let body: WrongLaneBody = serde_json::from_str(json)?;
                Geometry::WrongLane {
                    roi: body.roi,
                    green_line: body.green_line,
                    red_line: body.red_line,
                }
            }
            CanvasKind::Calibration => {
                let body: CalibrationBody = serde_json::from_str(json)?;
                Geometry::Calibration {
                    roi: body.roi,
                    distance: body.distance,
                }
            }
            CanvasKind::Roi => {
                let body: RoiBody = serde_json::from_str(json)?;
                Geometry::Roi { roi: body.roi }
            }
        };
        Ok(geometry)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Counting lines, when this is line geometry.
    pub fn lines(&self) -> Option<&[Line]> {
        match self {
            Geometry::Lines { lines } => Some(lines),
            _ => None,
        }
    }
}
