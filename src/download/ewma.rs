//! Exponentially weighted moving average

/// Samples an average is meant to span; sets the decay factor
const AVERAGE_AGE: f64 = 30.0;

/// Simple EWMA with decay `2 / (age + 1)`
///
/// While the average is still zero the next sample replaces it outright, so
/// a fresh average takes the first non-zero sample as its starting value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovingAverage {
    value: f64,
}

impl MovingAverage {
    pub const DECAY: f64 = 2.0 / (AVERAGE_AGE + 1.0);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sample: f64) {
        if self.value == 0.0 {
            self.value = sample;
        } else {
            self.value = sample * Self::DECAY + self.value * (1.0 - Self::DECAY);
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}
