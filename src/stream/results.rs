//! The latest frame and metrics shown by the processing panel.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::constants::JPEG_DATA_URL_PREFIX;
use crate::model::MetricKind;
use crate::stream::record::{FrameRecord, VehicleStats};

/// Metrics of the most recent record, shaped by the mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Metrics {
    Counts(Vec<u64>),
    WrongWay(u64),
    Speed(BTreeMap<String, VehicleStats>),
    FrameOnly,
}

impl Metrics {
    /// Metrics before any record arrived.
    pub fn empty(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counts => Metrics::Counts(Vec::new()),
            MetricKind::WrongWay => Metrics::WrongWay(0),
            MetricKind::Speed => Metrics::Speed(BTreeMap::new()),
            MetricKind::FrameOnly => Metrics::FrameOnly,
        }
    }

    /// Pick the mode's metric out of a record. A missing field reads as empty.
    pub fn from_record(kind: MetricKind, record: &FrameRecord) -> Self {
        match kind {
            MetricKind::Counts => Metrics::Counts(record.counts.clone().unwrap_or_default()),
            MetricKind::WrongWay => Metrics::WrongWay(record.wrong_way_count.unwrap_or_default()),
            MetricKind::Speed => {
                Metrics::Speed(record.vehicle_data.clone().unwrap_or_default())
            }
            MetricKind::FrameOnly => Metrics::FrameOnly,
        }
    }

    /// Human-readable summary, one entry per displayed row.
    pub fn summary_lines(&self) -> Vec<String> {
        match self {
            Metrics::Counts(counts) => counts
                .iter()
                .enumerate()
                .map(|(i, count)| format!("Line {} count: {}", i + 1, count))
                .collect(),
            Metrics::WrongWay(count) => vec![format!("Wrong Way Count: {count}")],
            Metrics::Speed(vehicles) => {
                let mut entries: Vec<_> = vehicles.iter().collect();
                // Tracker ids are numeric; show them in numeric order.
                entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(a), Ok(b)) => a.cmp(&b),
                    _ => a.cmp(b),
                });
                entries
                    .into_iter()
                    .map(|(id, stats)| {
                        let speed = stats
                            .avg_speed
                            .map(|s| format!("{s:.2}"))
                            .unwrap_or_else(|| "N/A".to_string());
                        format!("Vehicle ID: {id}, Average Speed: {speed} km/h")
                    })
                    .collect()
            }
            Metrics::FrameOnly => Vec::new(),
        }
    }
}

/// Displayed processing result. Each record overwrites the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultState {
    kind: MetricKind,
    frame: Option<String>,
    metrics: Metrics,
    updates: usize,
}

impl ResultState {
    pub fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            frame: None,
            metrics: Metrics::empty(kind),
            updates: 0,
        }
    }

    /// Replace frame and metrics with the record's.
    pub fn apply(&mut self, record: &FrameRecord) {
        self.frame = Some(record.frame.clone());
        self.metrics = Metrics::from_record(self.kind, record);
        self.updates += 1;
    }

    /// Back to the pre-processing state.
    pub fn reset(&mut self) {
        *self = Self::new(self.kind);
    }

    pub fn metric_kind(&self) -> MetricKind {
        self.kind
    }

    /// Base64 payload of the latest frame.
    pub fn frame_base64(&self) -> Option<&str> {
        self.frame.as_deref()
    }

    /// Decoded JPEG bytes of the latest frame.
    pub fn frame_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.frame.as_ref().map(|frame| STANDARD.decode(frame))
    }

    /// Latest frame as a `data:` URL.
    pub fn frame_data_url(&self) -> Option<String> {
        self.frame
            .as_ref()
            .map(|frame| format!("{JPEG_DATA_URL_PREFIX}{frame}"))
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Number of records applied since the last reset.
    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }
}
