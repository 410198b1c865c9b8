use std::{fmt::Display, ops::Deref};

use chrono::Duration;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0.round())
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value.is_nan() || value < 0. {
            None
        } else {
            Some(Percentage(value))
        }
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `whole` taken by `value`. `None` when nothing was tracked at all.
pub fn duration_percentage(value: Duration, whole: Duration) -> Option<Percentage> {
    if whole <= Duration::zero() {
        return None;
    }
    Percentage::new_opt(
        value.num_milliseconds() as f64 / whole.num_milliseconds() as f64 * 100.,
    )
}
