//! Human-readable byte sizes for progress logs.

use std::fmt::{self, Display, Formatter};

const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];
const STEP: f64 = 1024.0;

/// Byte count rendered with two decimals in the largest fitting binary unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl Display for ByteSize {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let mut value = bytes_to_f64(self.0);
        if value < STEP {
            return write!(formatter, "{value:.2} B");
        }
        let mut unit = UNITS[0];
        value /= STEP;
        for next in &UNITS[1..] {
            if value < STEP {
                break;
            }
            value /= STEP;
            unit = next;
        }
        write!(formatter, "{value:.2} {unit}")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
