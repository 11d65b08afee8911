//! Global constants for roadlens

/// Backend address used when no configuration overrides it
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Path segment under which the backend serves uploaded files and snapshots
pub const UPLOADS_PATH: &str = "uploads";

/// Default stroke color for counting lines
pub const DEFAULT_LINE_COLOR: &str = "#000000";

/// Default stroke width for counting lines
pub const DEFAULT_LINE_SIZE: u32 = 5;

/// Smallest selectable counting-line width
pub const MIN_LINE_SIZE: u32 = 1;

/// Largest selectable counting-line width
pub const MAX_LINE_SIZE: u32 = 20;

/// Number of corners in a speed-calibration quadrilateral
pub const CALIBRATION_POINTS: usize = 4;

/// Stroke width of ROI outlines and directional lines
pub const OUTLINE_WIDTH: f32 = 2.0;

/// Side length of the numbered badge drawn at a line's midpoint
pub const BADGE_SIZE: u32 = 20;

/// Glyph height of the badge number
pub const BADGE_FONT_SIZE: f32 = 12.0;

/// Prefix turning a base64 frame into a displayable URL
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";
