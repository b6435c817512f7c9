//! Quaternion to Euler conversion for attitude telemetry.

use std::f64::consts::FRAC_PI_2;

/// Roll, pitch and yaw in radians (aerospace ZYX convention).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub fn roll_deg(&self) -> f64 {
        self.roll.to_degrees()
    }

    pub fn pitch_deg(&self) -> f64 {
        self.pitch.to_degrees()
    }

    pub fn yaw_deg(&self) -> f64 {
        self.yaw.to_degrees()
    }

    /// Build from the `q1..q4` fields of `ATTITUDE_QUATERNION` (w, x, y, z).
    pub fn from_quaternion(q: [f32; 4]) -> Self {
        quaternion_to_euler(
            f64::from(q[0]),
            f64::from(q[1]),
            f64::from(q[2]),
            f64::from(q[3]),
        )
    }

    /// Value by name: `roll`, `pitch`, `yaw` (radians) or `*_deg`.
    pub fn get(&self, field: &str) -> Option<f64> {
        match field {
            "roll" => Some(self.roll),
            "pitch" => Some(self.pitch),
            "yaw" => Some(self.yaw),
            "roll_deg" => Some(self.roll_deg()),
            "pitch_deg" => Some(self.pitch_deg()),
            "yaw_deg" => Some(self.yaw_deg()),
            _ => None,
        }
    }
}

/// Convert a unit quaternion `(w, x, y, z)` to Euler angles.
///
/// At gimbal lock, where rounding pushes `|sin(pitch)|` to 1 or beyond,
/// pitch is pinned to ±π/2 with the sign of the argument instead of
/// becoming NaN.
pub fn quaternion_to_euler(w: f64, x: f64, y: f64, z: f64) -> EulerAngles {
    let sinr_cosp = 2.0 * (w * x + y * z);
    let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
    let roll = sinr_cosp.atan2(cosr_cosp);

    let sinp = 2.0 * (w * y - z * x);
    let pitch = if sinp.abs() >= 1.0 {
        FRAC_PI_2.copysign(sinp)
    } else {
        sinp.asin()
    };

    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    EulerAngles { roll, pitch, yaw }
}
