//! Processing modes and what each one mounts and calls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Annotation canvas variant mounted for a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanvasKind {
    /// Any number of numbered counting lines
    Lines,
    /// ROI polygon plus a green and a red direction line
    WrongLane,
    /// Four-point speed-calibration quadrilateral plus a distance
    Calibration,
    /// Free ROI polygon
    Roi,
}

/// Which metric a result record carries for a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Per-line crossing counts (`counts`)
    Counts,
    /// Running wrong-way total (`wrong_way_count`)
    WrongWay,
    /// Per-vehicle speed data (`vehicle_data`)
    Speed,
    /// Annotated frame only
    FrameOnly,
}

/// The analytics task selected in the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Count,
    WrongLane,
    Speed,
    Segmentation,
    CountIp,
    WrongLaneIp,
    SpeedIp,
    SegmentationIp,
    All,
    AllIp,
}

impl Mode {
    /// Get all modes in sidebar order, local modes first.
    pub fn all() -> &'static [Mode] {
        &[
            Mode::Count,
            Mode::WrongLane,
            Mode::Speed,
            Mode::Segmentation,
            Mode::All,
            Mode::CountIp,
            Mode::WrongLaneIp,
            Mode::SpeedIp,
            Mode::SegmentationIp,
            Mode::AllIp,
        ]
    }

    /// Route segment of the mode (`/video/<slug>`).
    pub fn slug(&self) -> &'static str {
        match self {
            Mode::Count => "count",
            Mode::WrongLane => "wrong-lane",
            Mode::Speed => "speed",
            Mode::Segmentation => "segmentation",
            Mode::CountIp => "count_ip",
            Mode::WrongLaneIp => "wrong-lane_ip",
            Mode::SpeedIp => "speed_ip",
            Mode::SegmentationIp => "segmentation_ip",
            Mode::All => "all",
            Mode::AllIp => "all_ip",
        }
    }

    /// Sidebar button name.
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Count => "Count",
            Mode::WrongLane => "Wrong Lane",
            Mode::Speed => "Speed Detection",
            Mode::Segmentation => "Segmentation",
            Mode::CountIp => "Count IP",
            Mode::WrongLaneIp => "Wrong Lane IP",
            Mode::SpeedIp => "Speed Detection IP",
            Mode::SegmentationIp => "Segmentation IP",
            Mode::All => "All",
            Mode::AllIp => "All IP",
        }
    }

    /// Heading shown above the canvas, e.g. `Wrong-lane ip Mode`.
    pub fn title(&self) -> String {
        let slug = self.slug();
        let mut chars = slug.chars();
        let head = chars.next().map(|c| c.to_ascii_uppercase());
        let tail = chars.as_str().replacen('_', " ", 1);
        match head {
            Some(head) => format!("{head}{tail} Mode"),
            None => "Video Processing".to_string(),
        }
    }

    /// Whether the mode works on a live IP-camera feed.
    pub fn is_ip(&self) -> bool {
        matches!(
            self,
            Mode::CountIp | Mode::WrongLaneIp | Mode::SpeedIp | Mode::SegmentationIp | Mode::AllIp
        )
    }

    pub fn canvas_kind(&self) -> CanvasKind {
        match self {
            Mode::Count | Mode::CountIp | Mode::All | Mode::AllIp => CanvasKind::Lines,
            Mode::WrongLane | Mode::WrongLaneIp => CanvasKind::WrongLane,
            Mode::Speed | Mode::SpeedIp => CanvasKind::Calibration,
            Mode::Segmentation | Mode::SegmentationIp => CanvasKind::Roi,
        }
    }

    pub fn metric_kind(&self) -> MetricKind {
        match self.canvas_kind() {
            CanvasKind::Lines => MetricKind::Counts,
            CanvasKind::WrongLane => MetricKind::WrongWay,
            CanvasKind::Calibration => MetricKind::Speed,
            CanvasKind::Roi => MetricKind::FrameOnly,
        }
    }

    /// Backend endpoint that processes this mode, if the backend offers one.
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            Mode::Count => Some("/Count"),
            Mode::WrongLane => Some("/Wrong"),
            Mode::Speed => Some("/Speed"),
            Mode::Segmentation => Some("/Segmentation"),
            Mode::All => Some("/All"),
            Mode::CountIp => Some("/count_ip"),
            Mode::WrongLaneIp => Some("/Lane_ip"),
            Mode::SpeedIp | Mode::SegmentationIp | Mode::AllIp => None,
        }
    }

    /// Label of the process action; `None` when the mode cannot be processed.
    pub fn button_label(&self) -> Option<&'static str> {
        match self {
            Mode::Count => Some("Process Count"),
            Mode::WrongLane => Some("Process Wrong"),
            Mode::Speed => Some("Process Speed"),
            Mode::Segmentation => Some("Process Segmentation"),
            Mode::All => Some("Process All"),
            Mode::CountIp => Some("Process Count (IP)"),
            Mode::WrongLaneIp => Some("Process Wrong Lane (IP)"),
            Mode::SpeedIp | Mode::SegmentationIp | Mode::AllIp => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Error returned for an unrecognised mode slug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::all()
            .iter()
            .copied()
            .find(|mode| mode.slug() == s)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

/// Address of an IP camera as entered by the user.
///
/// Both parts are kept as typed text; the backend receives them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpTarget {
    pub ip: String,
    pub port: String,
}

impl IpTarget {
    pub fn new(ip: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for IpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}
