use nalgebra::{UnitQuaternion, Vector3};

/// Euler angles in degrees, NED body frame (roll about x, pitch about y,
/// yaw about z, positive yaw turns right).
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Attitude {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn from_orientation(orientation: &UnitQuaternion<f64>) -> Self {
        let (roll, pitch, yaw) = orientation.euler_angles();
        Self {
            roll: roll.to_degrees(),
            pitch: pitch.to_degrees(),
            yaw: yaw.to_degrees(),
        }
    }

    pub fn to_orientation(self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(
            self.roll.to_radians(),
            self.pitch.to_radians(),
            self.yaw.to_radians(),
        )
    }
}

/// Yaw-only part of an orientation.
pub fn heading(orientation: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    let (_, _, yaw) = orientation.euler_angles();
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw)
}

/// Wrap an angle in degrees to (-180, 180].
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
