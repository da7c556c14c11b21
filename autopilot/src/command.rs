use nalgebra::{UnitQuaternion, Vector3};

use crate::attitude::Attitude;

/// Output of one control tick, handed straight to the actuator.
///
/// `movement` is a horizontal world-frame (NED) acceleration, already turned
/// to the vehicle heading and scaled by speed. Vertical intent is in `lift`,
/// positive up. Tilt targets are degrees: `target_tilt_x` about the lateral
/// axis (positive noses down), `target_tilt_z` about the longitudinal axis
/// (positive rolls left).
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct ControlCommand {
    pub movement: Vector3<f64>,
    pub lift: f64,
    /// Degrees per second, positive turns right
    pub yaw_rate: f64,
    pub target_tilt_x: f64,
    pub target_tilt_z: f64,
}

impl ControlCommand {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    pub fn has_tilt_target(&self) -> bool {
        self.target_tilt_x != 0.0 || self.target_tilt_z != 0.0
    }

    /// Rotation to apply for `dt` seconds of yaw.
    pub fn yaw_delta(&self, dt: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), (self.yaw_rate * dt).to_radians())
    }

    /// Orientation the actuator should ease towards: the tilt targets with the
    /// heading of `current` kept.
    pub fn target_orientation(&self, current: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
        let yaw = Attitude::from_orientation(current).yaw;
        // nose-down is negative pitch and roll-left is negative roll in NED
        Attitude::new(-self.target_tilt_z, -self.target_tilt_x, yaw).to_orientation()
    }
}
