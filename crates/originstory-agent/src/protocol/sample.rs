// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Validated probability pair and the timestamp attached to it on send.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SampleError {
    #[error("{field} is not a finite number ({value})")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} = {value} is outside [0, 1]")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // avoid serializing "-0.0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// A (p1, p2) pair, each rounded to 2 decimals and within [0, 1].
///
/// The range check applies to the rounded value, so 1.004 is accepted as 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilitySample {
    p1: f64,
    p2: f64,
}

impl ProbabilitySample {
    pub fn new(p1: f64, p2: f64) -> Result<Self, SampleError> {
        Ok(Self {
            p1: Self::validate("prob_1", p1)?,
            p2: Self::validate("prob_2", p2)?,
        })
    }

    fn validate(field: &'static str, value: f64) -> Result<f64, SampleError> {
        if !value.is_finite() {
            return Err(SampleError::NotFinite { field, value });
        }
        let rounded = round2(value);
        if !(0.0..=1.0).contains(&rounded) {
            return Err(SampleError::OutOfRange {
                field,
                value: rounded,
            });
        }
        Ok(rounded)
    }

    pub fn p1(&self) -> f64 {
        self.p1
    }

    pub fn p2(&self) -> f64 {
        self.p2
    }
}

/// UTC ISO-8601 with millisecond precision and a trailing `Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}
