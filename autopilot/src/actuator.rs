use nalgebra::UnitQuaternion;

use crate::ControlCommand;

/// Applies control commands to a body: a simulated airframe, or whatever the
/// host uses to drive the real one.
pub trait Actuator {
    /// Current orientation of the body, NED.
    fn orientation(&self) -> UnitQuaternion<f64>;

    /// Apply one tick's command over `dt` seconds.
    ///
    /// Yaw is applied straight away as `yaw_rate * dt`; tilt targets are eased
    /// towards over several ticks rather than snapped.
    fn apply(&mut self, command: &ControlCommand, dt: f64);
}
