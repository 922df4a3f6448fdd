//! Rolling Averages
//! Lazy trailing-window means aligned 1:1 with the input series.

use super::PipelineError;

/// A trailing mean over `window` observations.
///
/// Nothing is computed until the sequence is iterated, and it can be
/// iterated any number of times. Positions with fewer than `min_periods`
/// observations available yield `None`.
#[derive(Debug, Clone, Copy)]
pub struct RollingMean<'a> {
    values: &'a [f64],
    window: usize,
    min_periods: usize,
}

impl<'a> RollingMean<'a> {
    /// Partial windows at the start average whatever is available.
    pub fn new(values: &'a [f64], window: usize) -> Result<Self, PipelineError> {
        Self::with_min_periods(values, window, 1)
    }

    /// Positions before the first full window are missing.
    pub fn strict(values: &'a [f64], window: usize) -> Result<Self, PipelineError> {
        Self::with_min_periods(values, window, window)
    }

    fn with_min_periods(
        values: &'a [f64],
        window: usize,
        min_periods: usize,
    ) -> Result<Self, PipelineError> {
        if window == 0 {
            return Err(PipelineError::ZeroWindow);
        }
        Ok(Self {
            values,
            window,
            min_periods: min_periods.clamp(1, window),
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> RollingMeanIter<'a> {
        RollingMeanIter {
            values: self.values,
            window: self.window,
            min_periods: self.min_periods,
            position: 0,
        }
    }
}

impl<'a> IntoIterator for RollingMean<'a> {
    type Item = Option<f64>;
    type IntoIter = RollingMeanIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &RollingMean<'a> {
    type Item = Option<f64>;
    type IntoIter = RollingMeanIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct RollingMeanIter<'a> {
    values: &'a [f64],
    window: usize,
    min_periods: usize,
    position: usize,
}

impl Iterator for RollingMeanIter<'_> {
    type Item = Option<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.values.len() {
            return None;
        }
        self.position += 1;

        let count = self.position.min(self.window);
        let window = &self.values[self.position - count..self.position];
        Some((count >= self.min_periods).then(|| window.iter().sum::<f64>() / count as f64))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.values.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RollingMeanIter<'_> {}

/// One lazy rolling mean per window size, in the order given.
pub fn compute_rolling_average<'a>(
    values: &'a [f64],
    windows: &[usize],
) -> Result<Vec<RollingMean<'a>>, PipelineError> {
    windows
        .iter()
        .map(|&window| RollingMean::new(values, window))
        .collect()
}
