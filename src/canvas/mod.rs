//! Software annotation canvas.
//!
//! The canvas owns the decoded snapshot and an RGBA surface of exactly the
//! snapshot's natural size, so pointer positions translated through
//! [`Canvas::to_canvas`] are snapshot pixel coordinates. Every
//! [`Canvas::redraw`] is a full repaint: clear, background, then each element
//! of the session in its style.

mod draw;

pub use draw::{number_badge, stroke_closed_path, stroke_segment};

use std::io::Cursor;
use std::path::Path;

use ab_glyph::FontVec;
use image::{ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

use crate::color_utils::css_color_or;
use crate::constants::DEFAULT_LINE_SIZE;
use crate::model::{CanvasKind, Point};
use crate::session::{DrawingSession, InputEvent, Stroke};

/// Errors from loading snapshots, fonts or writing the surface.
#[derive(Error, Debug)]
pub enum CanvasError {
    /// Snapshot bytes could not be decoded or the surface encoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Badge font could not be parsed
    #[error("Invalid font file: {0}")]
    Font(#[from] ab_glyph::InvalidFont),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Viewport position of the canvas's top-left corner (its bounding rectangle).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportOrigin {
    pub left: f32,
    pub top: f32,
}

/// A snapshot with geometry painted over it.
pub struct Canvas {
    background: RgbaImage,
    surface: RgbaImage,
    origin: ViewportOrigin,
    badge_font: Option<FontVec>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("origin", &self.origin)
            .field("badge_font", &self.badge_font.is_some())
            .finish()
    }
}

impl Canvas {
    /// Decode a snapshot (any format `image` recognises) and size the canvas
    /// to its natural dimensions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CanvasError> {
        let image = image::load_from_memory(bytes)?;
        log::debug!(
            "Loaded snapshot {}x{}",
            image.width(),
            image.height()
        );
        Ok(Self::from_image(image.to_rgba8()))
    }

    pub fn from_image(background: RgbaImage) -> Self {
        let surface = background.clone();
        Self {
            background,
            surface,
            origin: ViewportOrigin::default(),
            badge_font: None,
        }
    }

    /// Use a TrueType/OpenType font for the line numbers in badges.
    pub fn with_font(mut self, font: FontVec) -> Self {
        self.badge_font = Some(font);
        self
    }

    /// Load the badge font from disk.
    pub fn load_font(path: &Path) -> Result<FontVec, CanvasError> {
        let data = std::fs::read(path)?;
        Ok(FontVec::try_from_vec(data)?)
    }

    /// Place the canvas in the viewport.
    pub fn set_origin(&mut self, origin: ViewportOrigin) {
        self.origin = origin;
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Translate viewport coordinates into canvas coordinates.
    pub fn to_canvas(&self, client_x: f32, client_y: f32) -> Point {
        Point::new(client_x - self.origin.left, client_y - self.origin.top)
    }

    /// Feed a viewport-space input event to the session, repainting when the
    /// session asks for it. Returns true if the surface was repainted.
    pub fn dispatch(&mut self, session: &mut DrawingSession, event: &InputEvent) -> bool {
        let event = match *event {
            InputEvent::Down { x, y } => {
                let p = self.to_canvas(x, y);
                InputEvent::Down { x: p.x, y: p.y }
            }
            InputEvent::Move { x, y } => {
                let p = self.to_canvas(x, y);
                InputEvent::Move { x: p.x, y: p.y }
            }
            ref other => other.clone(),
        };

        if session.apply(&event) {
            self.redraw(session);
            session.clear_dirty();
            true
        } else {
            false
        }
    }

    /// Full repaint from the background image.
    pub fn redraw(&mut self, session: &DrawingSession) {
        for pixel in self.surface.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
        image::imageops::replace(&mut self.surface, &self.background, 0, 0);

        let capability = session.capability();
        match session.kind() {
            CanvasKind::Lines => {
                for (index, line) in session.lines().iter().enumerate() {
                    let rgba = css_color_or(line.color.as_deref().unwrap_or("#000000"), [0, 0, 0, 255]);
                    let width = line.size.unwrap_or(DEFAULT_LINE_SIZE) as f32;
                    stroke_segment(&mut self.surface, line.start(), line.end(), Stroke::new(rgba, width));
                    number_badge(
                        &mut self.surface,
                        line.midpoint(),
                        index + 1,
                        self.badge_font.as_ref(),
                    );
                }
            }
            CanvasKind::WrongLane | CanvasKind::Calibration | CanvasKind::Roi => {
                let roi = session.roi();
                if capability.roi_visible(roi.len()) {
                    stroke_closed_path(&mut self.surface, roi, capability.roi_stroke);
                }
                if let Some((a, b)) = session.green_line().segment() {
                    stroke_segment(&mut self.surface, a, b, capability.green_stroke);
                }
                if let Some((a, b)) = session.red_line().segment() {
                    stroke_segment(&mut self.surface, a, b, capability.red_stroke);
                }
            }
        }
    }

    /// The repainted surface.
    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    pub fn background(&self) -> &RgbaImage {
        &self.background
    }

    /// Encode the surface as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, CanvasError> {
        let mut buffer = Cursor::new(Vec::new());
        self.surface.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// Write the surface to `path`; the format follows the extension.
    pub fn save(&self, path: &Path) -> Result<(), CanvasError> {
        self.surface.save(path)?;
        log::info!("Wrote canvas to {:?}", path);
        Ok(())
    }
}
