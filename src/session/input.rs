//! Input events driving an annotation session.
//!
//! Pointer positions are viewport (client) coordinates; the canvas
//! translates them into snapshot pixels before they reach the session.
//! Events serialize with a `type` tag so a recorded gesture script is plain
//! JSON, e.g. `[{"type": "down", "x": 10, "y": 20}, {"type": "up"}]`.

use serde::{Deserialize, Serialize};

use crate::session::DrawTarget;

/// One user interaction with the canvas or its controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputEvent {
    /// Pointer pressed
    Down { x: f32, y: f32 },
    /// Pointer moved
    Move { x: f32, y: f32 },
    /// Pointer released
    Up,
    /// Pointer left the canvas
    Leave,
    /// Drawing sub-mode button (wrong-lane canvas)
    Target { target: DrawTarget },
    /// Distance field edited (calibration canvas); `null` empties the field
    Distance { meters: Option<f64> },
    /// Pen color/size pickers (line canvas)
    Pen { color: String, size: u32 },
    /// Clear button
    Clear,
}

impl InputEvent {
    /// Whether the event is a pointer gesture rather than a control.
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            InputEvent::Down { .. } | InputEvent::Move { .. } | InputEvent::Up | InputEvent::Leave
        )
    }
}

/// Parse a gesture script.
pub fn parse_script(json: &str) -> Result<Vec<InputEvent>, serde_json::Error> {
    serde_json::from_str(json)
}
