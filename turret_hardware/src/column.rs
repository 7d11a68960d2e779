use turret_traits::{HotColumn, ThermalFrame};

/// Picks the column with the largest summed intensity. Ties resolve to the
/// leftmost column.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxColumnSum;

impl HotColumn for MaxColumnSum {
    fn hot_column(&self, frame: &ThermalFrame) -> usize {
        let mut best = 0usize;
        let mut best_sum = f32::NEG_INFINITY;
        for col in 0..frame.width() {
            let sum = frame.column_sum(col).unwrap_or(f32::NEG_INFINITY);
            if sum > best_sum {
                best = col;
                best_sum = sum;
            }
        }
        best
    }
}
