//! roadlens - traffic video analytics client
//!
//! Annotate a snapshot of a road scene (counting lines, regions of interest,
//! direction lines, a speed-calibration quadrilateral), send the geometry to
//! the analytics backend, and follow the newline-delimited JSON result stream
//! frame by frame.

pub mod canvas;
pub mod client;
pub mod color_utils;
pub mod config;
pub mod constants;
pub mod model;
pub mod panel;
pub mod session;
pub mod shell;
pub mod stream;

#[cfg(test)]
mod test_backend;
