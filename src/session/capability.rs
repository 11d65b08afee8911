//! Capability descriptors: what each canvas variant may draw and how it looks.

use crate::constants::{CALIBRATION_POINTS, OUTLINE_WIDTH};
use crate::model::CanvasKind;

/// RGBA stroke settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub rgba: [u8; 4],
    pub width: f32,
}

impl Stroke {
    pub const fn new(rgba: [u8; 4], width: f32) -> Self {
        Self { rgba, width }
    }
}

pub const YELLOW: [u8; 4] = [255, 255, 0, 255];
pub const PURPLE: [u8; 4] = [128, 0, 128, 255];
pub const GREEN: [u8; 4] = [0, 128, 0, 255];
pub const RED: [u8; 4] = [255, 0, 0, 255];

/// Kinds of element a session can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Numbered counting line, one per gesture
    CountingLine,
    /// One vertex of the ROI polygon per click
    RoiVertex,
    /// Green/red direction line, replaced on each gesture
    DirectionalLine,
}

/// Describes one canvas variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    pub kind: CanvasKind,
    /// Cap on ROI vertices; further pointer-downs are rejected
    pub max_points: Option<usize>,
    pub elements: &'static [ElementKind],
    /// Outline of the ROI polygon
    pub roi_stroke: Stroke,
    /// Draw the ROI before it reaches `max_points`
    pub draw_partial_roi: bool,
    pub green_stroke: Stroke,
    pub red_stroke: Stroke,
    /// The variant takes a real-world distance
    pub has_distance: bool,
}

impl Capability {
    /// Descriptor for a canvas variant.
    pub fn for_kind(kind: CanvasKind) -> Self {
        let base = Self {
            kind,
            max_points: None,
            elements: &[],
            roi_stroke: Stroke::new(YELLOW, OUTLINE_WIDTH),
            draw_partial_roi: true,
            green_stroke: Stroke::new(GREEN, OUTLINE_WIDTH),
            red_stroke: Stroke::new(RED, OUTLINE_WIDTH),
            has_distance: false,
        };

        match kind {
            CanvasKind::Lines => Self {
                elements: &[ElementKind::CountingLine],
                ..base
            },
            CanvasKind::WrongLane => Self {
                elements: &[ElementKind::RoiVertex, ElementKind::DirectionalLine],
                ..base
            },
            CanvasKind::Calibration => Self {
                max_points: Some(CALIBRATION_POINTS),
                elements: &[ElementKind::RoiVertex],
                roi_stroke: Stroke::new(PURPLE, OUTLINE_WIDTH),
                draw_partial_roi: false,
                has_distance: true,
                ..base
            },
            CanvasKind::Roi => Self {
                elements: &[ElementKind::RoiVertex],
                ..base
            },
        }
    }

    pub fn supports(&self, element: ElementKind) -> bool {
        self.elements.contains(&element)
    }

    /// Whether the ROI polygon should be drawn with `len` vertices.
    pub fn roi_visible(&self, len: usize) -> bool {
        if len == 0 {
            return false;
        }
        match self.max_points {
            Some(max) if !self.draw_partial_roi => len == max,
            _ => true,
        }
    }
}
