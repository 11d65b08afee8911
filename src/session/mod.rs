//! Annotation drawing sessions.
//!
//! A [`DrawingSession`] is the state of one annotation canvas: the geometry
//! drawn so far, the element currently being dragged, and the variant's
//! [`Capability`]. It is mutated only through four transitions:
//!
//! - [`begin`](DrawingSession::begin): pointer-down appends a new element
//! - [`extend`](DrawingSession::extend): pointer-move updates the active element
//! - [`finalize`](DrawingSession::finalize): pointer-up/leave ends the gesture
//! - [`clear`](DrawingSession::clear): all geometry back to empty
//!
//! The session knows nothing about rendering or the network; the canvas
//! repaints from it and the processing panel pulls [`DrawingSession::geometry`].

mod capability;
mod input;

pub use capability::{Capability, ElementKind, Stroke};
pub use input::{InputEvent, parse_script};

use serde::{Deserialize, Serialize};

use crate::model::{CanvasKind, DirectionalLine, Geometry, Line, Pen, Point};

/// Sub-mode of the wrong-lane canvas, picked with explicit buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawTarget {
    /// Clicks add ROI vertices
    #[default]
    Roi,
    /// Next gesture draws the green line
    Green,
    /// Next gesture draws the red line
    Red,
}

/// The element a gesture is currently shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveElement {
    Line(usize),
    RoiVertex,
    Green,
    Red,
}

/// Geometry and gesture state of one annotation canvas.
#[derive(Debug, Clone)]
pub struct DrawingSession {
    capability: Capability,
    lines: Vec<Line>,
    roi: Vec<Point>,
    green_line: DirectionalLine,
    red_line: DirectionalLine,
    distance: Option<f64>,
    target: DrawTarget,
    active: Option<ActiveElement>,
    pen: Pen,
    /// Set whenever the drawing changed and the canvas should repaint.
    dirty: bool,
}

impl DrawingSession {
    pub fn new(kind: CanvasKind) -> Self {
        Self::with_capability(Capability::for_kind(kind))
    }

    pub fn with_capability(capability: Capability) -> Self {
        Self {
            capability,
            lines: Vec::new(),
            roi: Vec::new(),
            green_line: DirectionalLine::default(),
            red_line: DirectionalLine::default(),
            distance: None,
            target: DrawTarget::Roi,
            active: None,
            pen: Pen::default(),
            dirty: true,
        }
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn kind(&self) -> CanvasKind {
        self.capability.kind
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Pointer-down at `point`. Returns false if the variant rejected it.
    pub fn begin(&mut self, point: Point) -> bool {
        let accepted = match self.kind() {
            CanvasKind::Lines => {
                self.lines.push(Line::new(point, &self.pen));
                self.active = Some(ActiveElement::Line(self.lines.len() - 1));
                true
            }
            CanvasKind::WrongLane => match self.target {
                DrawTarget::Roi => self.push_vertex(point),
                DrawTarget::Green => {
                    self.green_line = DirectionalLine::anchored(point);
                    self.active = Some(ActiveElement::Green);
                    true
                }
                DrawTarget::Red => {
                    self.red_line = DirectionalLine::anchored(point);
                    self.active = Some(ActiveElement::Red);
                    true
                }
            },
            CanvasKind::Calibration | CanvasKind::Roi => self.push_vertex(point),
        };

        if accepted {
            self.dirty = true;
        }
        accepted
    }

    fn push_vertex(&mut self, point: Point) -> bool {
        if let Some(max) = self.capability.max_points {
            if self.roi.len() >= max {
                log::debug!("Ignoring vertex: ROI already has {} points", max);
                return false;
            }
        }
        self.roi.push(point);
        self.active = Some(ActiveElement::RoiVertex);
        true
    }

    /// Pointer-move to `point`. Returns true if a redraw is due.
    ///
    /// Lines and direction lines follow the pointer; ROI vertices stay where
    /// they were clicked but the move still repaints.
    pub fn extend(&mut self, point: Point) -> bool {
        let Some(active) = self.active else {
            return false;
        };

        match active {
            ActiveElement::Line(index) => {
                if let Some(line) = self.lines.get_mut(index) {
                    line.set_end(point);
                }
            }
            ActiveElement::Green => {
                if self.green_line.start.is_some() {
                    self.green_line.end = Some(point);
                }
            }
            ActiveElement::Red => {
                if self.red_line.start.is_some() {
                    self.red_line.end = Some(point);
                }
            }
            ActiveElement::RoiVertex => {}
        }

        self.dirty = true;
        true
    }

    /// Pointer-up or leave. Ends the gesture; a finished direction line
    /// returns the wrong-lane canvas to ROI drawing.
    pub fn finalize(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        if matches!(active, ActiveElement::Green | ActiveElement::Red) {
            self.target = DrawTarget::Roi;
        }
        self.dirty = true;
    }

    /// Drop all geometry (and the entered distance).
    pub fn clear(&mut self) {
        self.lines.clear();
        self.roi.clear();
        self.green_line = DirectionalLine::default();
        self.red_line = DirectionalLine::default();
        self.distance = None;
        self.active = None;
        self.dirty = true;
    }

    /// Apply an input event whose pointer position is already in canvas
    /// coordinates. Returns true if a redraw is due.
    pub fn apply(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Down { x, y } => self.begin(Point::new(*x, *y)),
            InputEvent::Move { x, y } => self.extend(Point::new(*x, *y)),
            InputEvent::Up | InputEvent::Leave => {
                let was_drawing = self.is_drawing();
                self.finalize();
                was_drawing
            }
            InputEvent::Target { target } => {
                self.set_target(*target);
                false
            }
            InputEvent::Distance { meters } => {
                self.set_distance(*meters);
                false
            }
            InputEvent::Pen { color, size } => {
                self.set_pen(Pen::new(color.clone(), *size));
                false
            }
            InputEvent::Clear => {
                self.clear();
                true
            }
        }
    }

    // ========================================================================
    // Controls
    // ========================================================================

    /// Choose what the next gesture draws. Only the wrong-lane canvas has
    /// direction lines; other variants stay on ROI.
    pub fn set_target(&mut self, target: DrawTarget) {
        if target != DrawTarget::Roi && !self.capability.supports(ElementKind::DirectionalLine) {
            log::debug!("{:?} canvas has no direction lines", self.kind());
            return;
        }
        self.target = target;
    }

    pub fn set_distance(&mut self, meters: Option<f64>) {
        self.distance = meters;
    }

    /// Style for lines drawn from now on; existing lines keep theirs.
    pub fn set_pen(&mut self, pen: Pen) {
        self.pen = pen;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Finished geometry in the shape the variant's endpoint expects.
    pub fn geometry(&self) -> Geometry {
        match self.kind() {
            CanvasKind::Lines => Geometry::Lines {
                lines: self.lines.clone(),
            },
            CanvasKind::WrongLane => Geometry::WrongLane {
                roi: self.roi.clone(),
                green_line: self.green_line,
                red_line: self.red_line,
            },
            CanvasKind::Calibration => Geometry::Calibration {
                roi: self.roi.clone(),
                distance: self.distance,
            },
            CanvasKind::Roi => Geometry::Roi {
                roi: self.roi.clone(),
            },
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn roi(&self) -> &[Point] {
        &self.roi
    }

    pub fn green_line(&self) -> &DirectionalLine {
        &self.green_line
    }

    pub fn red_line(&self) -> &DirectionalLine {
        &self.red_line
    }

    pub fn distance(&self) -> Option<f64> {
        self.distance
    }

    pub fn target(&self) -> DrawTarget {
        self.target
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    /// A gesture is in progress.
    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    /// Check if the drawing changed since the last [`clear_dirty`](Self::clear_dirty).
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag. Call after repainting.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
