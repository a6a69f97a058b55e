/// Rate marker carried by tuples read from a request time stamp file.
pub const REQUEST_TIMESTAMP_RATE: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrivalRateTuple {
    time_offset_s: f64,
    rate: f64,
}

impl ArrivalRateTuple {
    #[must_use]
    pub const fn new(time_offset_s: f64, rate: f64) -> Self {
        Self {
            time_offset_s,
            rate,
        }
    }

    #[must_use]
    pub const fn request_timestamp(time_offset_s: f64) -> Self {
        Self::new(time_offset_s, REQUEST_TIMESTAMP_RATE)
    }

    #[must_use]
    pub const fn time_offset_s(self) -> f64 {
        self.time_offset_s
    }

    #[must_use]
    pub const fn rate(self) -> f64 {
        self.rate
    }

    #[must_use]
    pub fn is_request_timestamp(self) -> bool {
        self.rate < 0.0
    }

    /// Whole number of arrivals the scheduler must place for this tuple.
    ///
    /// Fractional rates are truncated; time stamp markers and negative rates
    /// yield zero.
    #[must_use]
    pub fn target_arrivals(self) -> u64 {
        if self.rate.is_finite() && self.rate >= 1.0 {
            self.rate as u64
        } else {
            0
        }
    }

    /// Truncated load intensity as reported in interval results.
    #[must_use]
    pub fn load_intensity(self) -> i64 {
        if self.rate.is_finite() {
            self.rate as i64
        } else {
            0
        }
    }

    /// Deadline of this tuple in milliseconds after time zero.
    #[must_use]
    pub fn target_time_ms(self) -> i64 {
        (1000.0 * self.time_offset_s) as i64
    }

    /// Splits the rate evenly across `divisor` load generators.
    #[must_use]
    pub fn divided(self, divisor: usize) -> Self {
        if divisor <= 1 {
            return self;
        }
        Self::new(self.time_offset_s, self.rate / divisor as f64)
    }

    #[must_use]
    pub fn to_wire_line(self) -> String {
        format!(
            "{},{}",
            format_f64(self.time_offset_s),
            format_f64(self.rate)
        )
    }
}

/// Formats a float so that it always carries a fractional part (`5` becomes `5.0`).
#[must_use]
pub fn format_f64(value: f64) -> String {
    format!("{:?}", value)
}

/// Parses a single `time,rate[;]` line.
///
/// `offset` is subtracted from the time; tuples that end up at or before time
/// zero are discarded, as are lines that do not hold two numbers.
#[must_use]
pub fn parse_tuple_line(line: &str, offset: f64) -> Option<ArrivalRateTuple> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    let mut fields = trimmed.split(',');
    let time_field = fields.next()?;
    let rate_field = fields.next()?;
    let time_offset_s = time_field.trim().parse::<f64>().ok()?;
    let rate = rate_field.trim().parse::<f64>().ok()?;
    let shifted = time_offset_s - offset;
    if shifted > 0.0 {
        Some(ArrivalRateTuple::new(shifted, rate))
    } else {
        None
    }
}

/// Parses every usable tuple out of `lines`, in order.
pub fn parse_tuples<'line, I>(lines: I, offset: f64) -> Vec<ArrivalRateTuple>
where
    I: IntoIterator<Item = &'line str>,
{
    lines
        .into_iter()
        .filter_map(|line| parse_tuple_line(line, offset))
        .collect()
}
