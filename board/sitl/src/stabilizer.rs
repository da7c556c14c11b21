use autopilot::{normalize_degrees, Attitude};
use nalgebra::{UnitQuaternion, Vector3};

/// Pushes the airframe back towards level once roll or pitch passes
/// `max_tilt`. Yaw is left alone.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    /// Angular acceleration in degrees per second squared
    pub strength: f64,
    /// Tilt in degrees beyond which the stabilizer engages
    pub max_tilt: f64,
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self {
            strength: 5.0,
            max_tilt: 45.0,
        }
    }
}

impl Stabilizer {
    /// Corrective angular acceleration about the body roll, pitch and yaw axes.
    pub fn correction(&self, orientation: &UnitQuaternion<f64>) -> Vector3<f64> {
        let attitude = Attitude::from_orientation(orientation);
        let roll = normalize_degrees(attitude.roll);
        let pitch = normalize_degrees(attitude.pitch);

        let mut torque = Vector3::zeros();
        if roll.abs() > self.max_tilt {
            torque.x = -roll.signum() * self.strength;
        }
        if pitch.abs() > self.max_tilt {
            torque.y = -pitch.signum() * self.strength;
        }
        torque
    }

    pub fn is_engaged(&self, orientation: &UnitQuaternion<f64>) -> bool {
        self.correction(orientation) != Vector3::zeros()
    }
}
