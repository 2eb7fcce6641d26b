//! Time-budgeted throughput meter
//!
//! The budget is cut into [`SLICE_COUNT`] equal slices. Whenever the clock
//! passes a slice boundary the bytes read since the previous boundary are fed
//! into a [`MovingAverage`]; the final figure is the average scaled by
//! `REFERENCE_SCALE / budget_secs`.

use super::ewma::MovingAverage;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

pub const SLICE_COUNT: u32 = 100;

/// Reference units per budget the averaged slice volume is scaled to
pub const REFERENCE_SCALE: f64 = 120.0;

/// Reported speed over true rate for a perfectly steady source
pub const STEADY_STATE_GAIN: f64 = REFERENCE_SCALE / SLICE_COUNT as f64;

/// Why a measurement stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Read the declared content length
    Completed,
    /// The budget ran out
    BudgetExhausted,
    /// The body failed mid-read
    ReadError,
    /// End of a body without a declared length
    EndOfStream,
    /// End of a body shorter than its declared length
    Truncated,
    /// The budget reaches past what the clock can represent; nothing was read
    InvalidBudget,
}

/// Outcome of metering one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Bytes per second, after normalisation
    pub speed: f64,
    pub bytes_read: u64,
    pub reason: StopReason,
}

/// Meter a byte stream for at most `budget`
///
/// Chunks may have any size. A pending read is abandoned when the budget
/// runs out. A source steady at R bytes/s reports `R * STEADY_STATE_GAIN`
/// (1.2 R), not R.
pub async fn measure_stream<S, B, E>(mut body: S, content_length: Option<u64>, budget: Duration) -> Measurement
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let start = Instant::now();
    let Some(end) = start.checked_add(budget) else {
        return Measurement {
            speed: 0.0,
            bytes_read: 0,
            reason: StopReason::InvalidBudget,
        };
    };
    let slice = budget / SLICE_COUNT;
    let boundary = |n: u32| {
        slice
            .checked_mul(n)
            .and_then(|offset| start.checked_add(offset))
            .unwrap_or(end)
    };

    let mut average = MovingAverage::new();
    let mut counter: u32 = 1;
    let mut next_boundary = boundary(counter);
    let mut bytes_read: u64 = 0;
    let mut last_read: u64 = 0;

    let reason = loop {
        if content_length == Some(bytes_read) {
            break StopReason::Completed;
        }

        let now = Instant::now();
        if now > next_boundary {
            counter += 1;
            next_boundary = boundary(counter);
            average.add((bytes_read - last_read) as f64);
            last_read = bytes_read;
        }
        if now > end {
            break StopReason::BudgetExhausted;
        }

        match timeout_at(end, body.next()).await {
            Err(_) => break StopReason::BudgetExhausted,
            Ok(Some(Ok(chunk))) => bytes_read += chunk.as_ref().len() as u64,
            Ok(Some(Err(_))) => break StopReason::ReadError,
            Ok(None) if content_length.is_none() => break StopReason::EndOfStream,
            Ok(None) => {
                // partial slice, scaled up to a full slice
                let last_boundary = boundary(counter - 1);
                let elapsed = Instant::now().saturating_duration_since(last_boundary);
                if !elapsed.is_zero() && !slice.is_zero() {
                    let fraction = elapsed.as_secs_f64() / slice.as_secs_f64();
                    average.add((bytes_read - last_read) as f64 / fraction);
                }
                break StopReason::Truncated;
            }
        }
    };

    Measurement {
        speed: normalise(average.value(), budget),
        bytes_read,
        reason,
    }
}

fn normalise(average: f64, budget: Duration) -> f64 {
    let secs = budget.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    average / (secs / REFERENCE_SCALE)
}
