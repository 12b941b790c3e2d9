// Sliding window of displayed points backing one chart
use crate::domain::telemetry::DisplayedPoint;
use std::collections::VecDeque;

#[derive(Debug, Default, Clone)]
pub struct WindowedSeries {
    points: VecDeque<DisplayedPoint>,
}

impl WindowedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point, then evicts the oldest points until at most `cap` remain.
    /// The cap is supplied per insert because the viewport can change at runtime.
    pub fn push(&mut self, point: DisplayedPoint, cap: usize) {
        self.points.push_back(point);
        while self.points.len() > cap {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn last(&self) -> Option<&DisplayedPoint> {
        self.points.back()
    }

    pub fn points(&self) -> impl Iterator<Item = &DisplayedPoint> {
        self.points.iter()
    }

    #[cfg(test)]
    pub fn to_vec(&self) -> Vec<DisplayedPoint> {
        self.points.iter().cloned().collect()
    }
}
