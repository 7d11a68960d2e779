use turret_traits::{HotColumn, ThermalFrame};

/// Where the target was found in a frame and the yaw angle it maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub column: usize,
    pub angle: f64,
}

/// Hot column → yaw setpoint via a fixed linear calibration.
pub struct TargetingEstimator {
    slope: f64,
    intercept: f64,
    extractor: Box<dyn HotColumn>,
}

impl core::fmt::Debug for TargetingEstimator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TargetingEstimator")
            .field("slope", &self.slope)
            .field("intercept", &self.intercept)
            .finish()
    }
}

impl TargetingEstimator {
    pub fn new(slope: f64, intercept: f64, extractor: Box<dyn HotColumn>) -> Self {
        Self {
            slope,
            intercept,
            extractor,
        }
    }

    #[inline]
    pub fn angle_for_column(&self, column: usize) -> f64 {
        column as f64 * self.slope + self.intercept
    }

    pub fn estimate_angle(&self, frame: &ThermalFrame) -> f64 {
        self.locate(frame).angle
    }

    pub fn locate(&self, frame: &ThermalFrame) -> Target {
        let column = self.extractor.hot_column(frame);
        Target {
            column,
            angle: self.angle_for_column(column),
        }
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}
