//! Consumption of newline-delimited JSON result streams.
//!
//! The backend answers a processing request with one JSON object per line,
//! each describing one processed frame. [`StreamConsumer`] turns arbitrarily
//! chunked bytes into [`ResultState`] updates:
//!
//! - only complete lines are parsed; a partial trailing line waits for the
//!   next chunk
//! - every record overwrites the displayed frame and metrics
//! - a line with an `error` field stops consumption immediately
//! - lines that do not parse are logged and skipped

mod record;
mod results;
mod splitter;

pub use record::{FrameRecord, LineOutcome, VehicleStats, classify_line, is_truthy};
pub use results::{Metrics, ResultState};
pub use splitter::LineSplitter;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

use crate::model::MetricKind;

/// Reasons a result stream ended in failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    /// The backend sent a record with an `error` field
    #[error("Backend reported an error: {0}")]
    Backend(String),

    /// Reading the response body failed part-way
    #[error("Stream interrupted: {0}")]
    Transport(String),
}

/// Turns result-stream chunks into state updates.
#[derive(Debug)]
pub struct StreamConsumer {
    splitter: LineSplitter,
    state: ResultState,
    skipped: usize,
}

impl StreamConsumer {
    pub fn new(kind: MetricKind) -> Self {
        Self {
            splitter: LineSplitter::new(),
            state: ResultState::new(kind),
            skipped: 0,
        }
    }

    /// Feed one chunk. `on_update` runs after every applied record.
    ///
    /// Returns the number of records applied from this chunk. An error record
    /// aborts before any later line of the chunk is looked at.
    pub fn feed<F>(&mut self, chunk: &[u8], on_update: &mut F) -> Result<usize, StreamError>
    where
        F: FnMut(&ResultState),
    {
        let mut applied = 0;
        for line in self.splitter.push(chunk) {
            match classify_line(&line, self.state.metric_kind()) {
                LineOutcome::Blank => {}
                LineOutcome::Record(record) => {
                    self.state.apply(&record);
                    applied += 1;
                    on_update(&self.state);
                }
                LineOutcome::Failure(message) => {
                    log::error!("Backend reported an error mid-stream: {}", message);
                    return Err(StreamError::Backend(message));
                }
                LineOutcome::Malformed(reason) => {
                    self.skipped += 1;
                    log::warn!(
                        "Skipping malformed stream line ({}): {}",
                        reason,
                        String::from_utf8_lossy(&line)
                    );
                }
            }
        }
        Ok(applied)
    }

    /// End of stream. An unterminated trailing line is dropped unparsed.
    pub fn finish(mut self) -> ResultState {
        if let Some(rest) = self.splitter.take_remainder() {
            log::debug!(
                "Discarding {} trailing bytes without a line terminator",
                rest.len()
            );
        }
        log::debug!(
            "Stream finished: {} updates, {} skipped lines",
            self.state.updates(),
            self.skipped
        );
        self.state
    }

    /// Read `body` to its end, feeding every chunk.
    ///
    /// On error the consumer keeps the state of the last applied record.
    pub async fn drive<S, E, F>(&mut self, body: S, mut on_update: F) -> Result<(), StreamError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
        F: FnMut(&ResultState),
    {
        let mut body = std::pin::pin!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                log::error!("Result stream interrupted: {}", e);
                StreamError::Transport(e.to_string())
            })?;
            self.feed(&chunk, &mut on_update)?;
        }
        Ok(())
    }

    pub fn state(&self) -> &ResultState {
        &self.state
    }

    /// Lines skipped as malformed so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Drive a byte stream to completion through a fresh [`StreamConsumer`].
///
/// Resolves to the final state once the body ends, or to the first error.
pub async fn consume<S, E, F>(
    body: S,
    kind: MetricKind,
    on_update: F,
) -> Result<ResultState, StreamError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
    F: FnMut(&ResultState),
{
    let mut consumer = StreamConsumer::new(kind);
    consumer.drive(body, on_update).await?;
    Ok(consumer.finish())
}
