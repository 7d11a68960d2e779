/// Proportional-derivative controller over position and velocity.
///
/// `run` is stateless apart from gains and setpoints; there is no integral
/// term and no output limiting (the motor clamp saturates).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PdController {
    kp: f64,
    kd: f64,
    position_setpoint: f64,
    velocity_setpoint: f64,
}

impl PdController {
    pub fn new(kp: f64, kd: f64) -> Self {
        Self {
            kp,
            kd,
            ..Self::default()
        }
    }

    /// `Kp·(pos_sp − pos) + Kd·(vel_sp − vel)`.
    #[inline]
    pub fn run(&self, position: f64, velocity: f64) -> f64 {
        self.kp * (self.position_setpoint - position) + self.kd * (self.velocity_setpoint - velocity)
    }

    pub fn set_gain_p(&mut self, kp: f64) {
        self.kp = kp;
    }

    pub fn set_gain_d(&mut self, kd: f64) {
        self.kd = kd;
    }

    pub fn set_position_setpoint(&mut self, sp: f64) {
        self.position_setpoint = sp;
    }

    pub fn set_velocity_setpoint(&mut self, sp: f64) {
        self.velocity_setpoint = sp;
    }

    pub fn gain_p(&self) -> f64 {
        self.kp
    }

    pub fn gain_d(&self) -> f64 {
        self.kd
    }

    pub fn position_setpoint(&self) -> f64 {
        self.position_setpoint
    }

    pub fn velocity_setpoint(&self) -> f64 {
        self.velocity_setpoint
    }
}
