use log::trace;
use telemetry::{MarkerSample, MARKER_COUNT};

use crate::{Actuator, ControlCommand, DecisionEngine};

/// Runs the decision engine once per tick and feeds the actuator.
#[derive(Debug, Default)]
pub struct Vehicle {
    engine: DecisionEngine,
    last_command: ControlCommand,
    ticks: u64,
}

impl Vehicle {
    pub fn new(engine: DecisionEngine) -> Self {
        Vehicle {
            engine,
            ..Default::default()
        }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    // Call once per control tick with a fresh snapshot of the marker buffer.
    pub fn update<A>(
        &mut self,
        markers: [MarkerSample; MARKER_COUNT],
        dt: f64,
        actuator: &mut A,
    ) -> &ControlCommand
    where
        A: Actuator + ?Sized,
    {
        let command = self.engine.decide(markers, &actuator.orientation());
        actuator.apply(&command, dt);
        trace!("Tick {}: {:?}", self.ticks, command);

        self.last_command = command;
        self.ticks += 1;
        &self.last_command
    }

    pub fn last_command(&self) -> &ControlCommand {
        &self.last_command
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::UnitQuaternion;

    use super::*;
    use crate::{Attitude, Tuning};

    struct RecordingActuator {
        orientation: UnitQuaternion<f64>,
        applied: Vec<(ControlCommand, f64)>,
    }

    impl Default for RecordingActuator {
        fn default() -> Self {
            Self {
                orientation: UnitQuaternion::identity(),
                applied: Vec::new(),
            }
        }
    }

    impl Actuator for RecordingActuator {
        fn orientation(&self) -> UnitQuaternion<f64> {
            self.orientation
        }

        fn apply(&mut self, command: &ControlCommand, dt: f64) {
            self.applied.push((*command, dt));
            self.orientation = command.yaw_delta(dt) * self.orientation;
        }
    }

    fn markers(z: [f64; MARKER_COUNT]) -> [MarkerSample; MARKER_COUNT] {
        z.map(|z| MarkerSample::new(0.0, 0.0, z))
    }

    #[test]
    fn test_update_applies_command() {
        let mut vehicle = Vehicle::default();
        let mut actuator = RecordingActuator::default();

        let raised = markers([1800.0, 1000.0, 1000.0, 1000.0]);
        let command = *vehicle.update(raised, 0.02, &mut actuator);

        assert_eq!(command.lift, 10.0);
        assert_eq!(actuator.applied, vec![(command, 0.02)]);
        assert_eq!(vehicle.ticks(), 1);
        assert_eq!(vehicle.last_command(), &command);
    }

    #[test]
    fn test_yaw_accumulates_across_ticks() {
        let mut vehicle = Vehicle::default();
        let mut actuator = RecordingActuator::default();
        let twist = markers([100.0, 100.0, 200.0, 200.0]);

        for _ in 0..5 {
            vehicle.update(twist, 0.1, &mut actuator);
        }

        let yaw = Attitude::from_orientation(&actuator.orientation).yaw;
        assert!((yaw - 50.0).abs() < 1e-9, "expected 50 degrees of yaw, got {}", yaw);
    }

    #[test]
    fn test_new_keeps_engine_tuning() {
        let tuning = Tuning {
            speed: 2.0,
            ..Default::default()
        };
        let vehicle = Vehicle::new(DecisionEngine::new(tuning.clone()).expect("valid tuning"));
        assert_eq!(vehicle.engine().tuning(), &tuning);
        assert_eq!(vehicle.ticks(), 0);
        assert!(vehicle.last_command().is_idle());
    }

    #[test]
    fn test_works_through_trait_object() {
        let mut vehicle = Vehicle::default();
        let mut recording = RecordingActuator::default();
        let actuator: &mut dyn Actuator = &mut recording;
        vehicle.update(markers([1000.0; MARKER_COUNT]), 0.02, actuator);
        assert!(vehicle.last_command().is_idle());
    }
}
