mod actuator;
mod attitude;
mod command;
mod decision;
pub mod rules;
mod vehicle;

pub use actuator::Actuator;
pub use attitude::{heading, normalize_degrees, Attitude};
pub use command::ControlCommand;
pub use decision::{DecisionEngine, Tuning, TuningError};
pub use vehicle::Vehicle;
