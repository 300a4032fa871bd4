use serde::Serialize;

/// Accumulator trait for aggregation functions
pub trait Accumulator {
    /// Add a value to the accumulator
    fn accumulate(&mut self, value: f64);

    /// Get the final result; None when nothing was accumulated
    fn result(&self) -> Option<f64>;
}

/// AVG(column)
#[derive(Debug, Clone, Default)]
pub struct AvgAccumulator {
    sum: f64,
    count: u64,
}

impl Accumulator for AvgAccumulator {
    fn accumulate(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn result(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.sum / self.count as f64)
        } else {
            None
        }
    }
}

/// MIN(column)
#[derive(Debug, Clone, Default)]
pub struct MinAccumulator {
    min: Option<f64>,
}

impl Accumulator for MinAccumulator {
    fn accumulate(&mut self, value: f64) {
        self.min = Some(match self.min {
            Some(current) if current <= value => current,
            _ => value,
        });
    }

    fn result(&self) -> Option<f64> {
        self.min
    }
}

/// MAX(column)
#[derive(Debug, Clone, Default)]
pub struct MaxAccumulator {
    max: Option<f64>,
}

impl Accumulator for MaxAccumulator {
    fn accumulate(&mut self, value: f64) {
        self.max = Some(match self.max {
            Some(current) if current >= value => current,
            _ => value,
        });
    }

    fn result(&self) -> Option<f64> {
        self.max
    }
}

/// Mean, minimum and maximum of the unit cadastral value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Number of rows that had a value
    pub count: u64,
}

/// Summarize the present values; None when there are none
pub fn summarize<I>(values: I) -> Option<ValueStats>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut avg = AvgAccumulator::default();
    let mut min = MinAccumulator::default();
    let mut max = MaxAccumulator::default();
    let mut count = 0u64;

    for value in values.into_iter().flatten() {
        avg.accumulate(value);
        min.accumulate(value);
        max.accumulate(value);
        count += 1;
    }

    Some(ValueStats {
        mean: avg.result()?,
        min: min.result()?,
        max: max.result()?,
        count,
    })
}
