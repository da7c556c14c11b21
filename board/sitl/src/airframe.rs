use autopilot::{Actuator, Attitude, ControlCommand};
use log::warn;
use nalgebra::{UnitQuaternion, Vector3};

use crate::stabilizer::Stabilizer;

#[derive(Debug, Clone)]
pub struct AirframeConfig {
    /// Linear drag, fraction of velocity lost per second
    pub drag: f64,
    /// Angular drag, fraction of angular velocity lost per second
    pub angular_drag: f64,
    /// Rate the orientation eases towards the tilt target, per second
    pub tilt_rate: f64,
}

impl Default for AirframeConfig {
    fn default() -> Self {
        Self {
            drag: 1.0,
            angular_drag: 0.05,
            tilt_rate: 5.0,
        }
    }
}

/// Kinematic stand-in for the vehicle body, NED frame.
///
/// Commands are applied as accelerations, yaw as an immediate rotation, tilt
/// by easing towards the target orientation.
#[derive(Debug, Clone)]
pub struct Airframe {
    config: AirframeConfig,
    stabilizer: Stabilizer,

    position: Vector3<f64>,
    velocity: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    // body rates from the stabilizer, degrees per second
    angular_velocity: Vector3<f64>,
}

impl Airframe {
    pub fn new(config: AirframeConfig, stabilizer: Stabilizer) -> Self {
        Self {
            config,
            stabilizer,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
        }
    }

    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    pub fn altitude(&self) -> f64 {
        -self.position.z
    }

    pub fn attitude(&self) -> Attitude {
        Attitude::from_orientation(&self.orientation)
    }

    pub fn is_stabilizing(&self) -> bool {
        self.stabilizer.is_engaged(&self.orientation)
    }

    fn integrate_linear(&mut self, command: &ControlCommand, dt: f64) {
        // lift is positive up, z is down
        let acceleration = command.movement + Vector3::new(0.0, 0.0, -command.lift);
        self.velocity += acceleration * dt;
        self.velocity *= (1.0 - self.config.drag * dt).max(0.0);
        self.position += self.velocity * dt;
    }

    fn ease_tilt(&mut self, command: &ControlCommand, dt: f64) {
        let target = command.target_orientation(&self.orientation);
        let t = (dt * self.config.tilt_rate).clamp(0.0, 1.0);
        self.orientation = self
            .orientation
            .try_slerp(&target, t, 1.0e-9)
            .unwrap_or(target);
    }

    fn stabilize(&mut self, dt: f64) {
        let torque = self.stabilizer.correction(&self.orientation);
        self.angular_velocity += torque * dt;
        self.angular_velocity *= (1.0 - self.config.angular_drag * dt).max(0.0);

        let rotation = self.angular_velocity.map(f64::to_radians) * dt;
        self.orientation *= UnitQuaternion::from_scaled_axis(rotation);
    }
}

impl Default for Airframe {
    fn default() -> Self {
        Self::new(AirframeConfig::default(), Stabilizer::default())
    }
}

impl Actuator for Airframe {
    fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    fn apply(&mut self, command: &ControlCommand, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            warn!("Ignoring command with invalid time step {}", dt);
            return;
        }

        self.integrate_linear(command, dt);
        self.orientation = command.yaw_delta(dt) * self.orientation;
        self.ease_tilt(command, dt);
        self.stabilize(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.02;

    #[test]
    fn test_idle_command_holds_still() {
        let mut airframe = Airframe::default();
        airframe.apply(&ControlCommand::default(), DT);
        assert_eq!(airframe.position(), Vector3::zeros());
        assert_eq!(airframe.attitude(), Attitude::default());
    }

    #[test]
    fn test_lift_climbs() {
        let mut airframe = Airframe::default();
        let climb = ControlCommand {
            lift: 10.0,
            ..Default::default()
        };
        for _ in 0..10 {
            airframe.apply(&climb, DT);
        }
        assert!(airframe.altitude() > 0.0, "altitude {}", airframe.altitude());
        assert!(airframe.velocity().z < 0.0);
    }

    #[test]
    fn test_movement_accelerates_along_command() {
        let mut airframe = Airframe::default();
        let forward = ControlCommand {
            movement: Vector3::new(5.0, 0.0, 0.0),
            ..Default::default()
        };
        airframe.apply(&forward, DT);
        assert!(airframe.velocity().x > 0.0);
        assert_eq!(airframe.velocity().y, 0.0);
    }

    #[test]
    fn test_yaw_applies_immediately() {
        let mut airframe = Airframe::default();
        let turn = ControlCommand {
            yaw_rate: 100.0,
            ..Default::default()
        };
        airframe.apply(&turn, 0.1);
        let yaw = airframe.attitude().yaw;
        assert!((yaw - 10.0).abs() < 1e-6, "yaw {}", yaw);
    }

    #[test]
    fn test_tilt_eases_towards_target() {
        let mut airframe = Airframe::default();
        let lean = ControlCommand {
            target_tilt_x: 10.0,
            ..Default::default()
        };

        airframe.apply(&lean, DT);
        let pitch = airframe.attitude().pitch;
        assert!(pitch < 0.0 && pitch > -10.0, "tilt should not snap, pitch {}", pitch);

        for _ in 0..500 {
            airframe.apply(&lean, DT);
        }
        let pitch = airframe.attitude().pitch;
        assert!((pitch + 10.0).abs() < 1e-3, "pitch {}", pitch);
    }

    #[test]
    fn test_invalid_dt_is_ignored() {
        let mut airframe = Airframe::default();
        let climb = ControlCommand {
            lift: 10.0,
            ..Default::default()
        };
        airframe.apply(&climb, 0.0);
        airframe.apply(&climb, f64::NAN);
        assert_eq!(airframe.velocity(), Vector3::zeros());
    }

    #[test]
    fn test_stabilizer_engages_past_limit() {
        let mut airframe = Airframe::default();
        airframe.orientation = Attitude::new(60.0, 0.0, 0.0).to_orientation();
        assert!(airframe.is_stabilizing());
    }
}
