use nalgebra::{UnitQuaternion, Vector3};
use telemetry::{MarkerSample, MARKER_COUNT};
use thiserror::Error;

use crate::{attitude, rules, ControlCommand};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TuningError {
    #[error("Tuning parameter {name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("Tuning parameter {name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("Tuning parameter {name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },
}

/// Fixed constants of the decision engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    /// Horizontal acceleration per unit of movement intent
    pub speed: f64,
    /// Vertical acceleration when ascending or descending
    pub lift_force: f64,
    /// Yaw rate in degrees per second
    pub rotation_speed: f64,
    /// Height difference a marker pair needs for translation and tilt
    pub translation_margin: f64,
    /// Height difference a marker pair needs for yaw
    pub yaw_margin: f64,
    /// Marker 1 height above which the vehicle climbs
    pub ascend_height: f64,
    /// Tilt target magnitude in degrees
    pub tilt_angle: f64,
    /// Rate the actuator eases towards the tilt target, per second
    pub tilt_rate: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            speed: 5.0,
            lift_force: 10.0,
            rotation_speed: 100.0,
            translation_margin: 15.0,
            yaw_margin: 60.0,
            ascend_height: 1700.0,
            tilt_angle: 10.0,
            tilt_rate: 5.0,
        }
    }
}

impl Tuning {
    pub fn validate(&self) -> Result<(), TuningError> {
        let params = [
            ("speed", self.speed),
            ("lift_force", self.lift_force),
            ("rotation_speed", self.rotation_speed),
            ("translation_margin", self.translation_margin),
            ("yaw_margin", self.yaw_margin),
            ("ascend_height", self.ascend_height),
            ("tilt_angle", self.tilt_angle),
            ("tilt_rate", self.tilt_rate),
        ];

        for (name, value) in params {
            if !value.is_finite() {
                return Err(TuningError::NonFinite { name, value });
            }
            // ascend_height is a position and may sit below the origin
            if name != "ascend_height" && value < 0.0 {
                return Err(TuningError::Negative { name, value });
            }
        }

        if self.tilt_rate == 0.0 {
            return Err(TuningError::NotPositive {
                name: "tilt_rate",
                value: self.tilt_rate,
            });
        }

        Ok(())
    }
}

/// Turns marker geometry into a control command, once per tick.
///
/// Holds no state besides its tuning: the same markers and orientation always
/// give the same command.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    tuning: Tuning,
}

impl DecisionEngine {
    pub fn new(tuning: Tuning) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self { tuning })
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Decide this tick's command.
    ///
    /// Only the `z` of each marker is used. `orientation` supplies the heading
    /// that turns forward/right intent into world-frame movement.
    pub fn decide(
        &self,
        markers: [MarkerSample; MARKER_COUNT],
        orientation: &UnitQuaternion<f64>,
    ) -> ControlCommand {
        let heights = markers.map(|marker| marker.z);
        let intent = rules::evaluate(&heights, &self.tuning);

        let heading = attitude::heading(orientation);
        let movement = heading * Vector3::new(intent.surge, intent.sway, 0.0) * self.tuning.speed;

        ControlCommand {
            movement,
            lift: intent.lift * self.tuning.lift_force,
            yaw_rate: intent.yaw * self.tuning.rotation_speed,
            target_tilt_x: intent.tilt_x * self.tuning.tilt_angle,
            target_tilt_z: intent.tilt_z * self.tuning.tilt_angle,
        }
    }
}
