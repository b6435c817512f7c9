//! Catalogue of numeric fields offered for live plotting.
//!
//! `EULER_ANGLES` is not a wire message. It names the roll/pitch/yaw
//! values the link layer derives from `ATTITUDE_QUATERNION`.

use mavlink::common::MavMessage;

/// Pseudo message type carrying angles derived from `ATTITUDE_QUATERNION`.
pub const EULER_ANGLES: &str = "EULER_ANGLES";

const IMU: &[&str] = &[
    "xacc", "yacc", "zacc", "xgyro", "ygyro", "zgyro", "xmag", "ymag", "zmag",
];

// Sorted by type name.
const CATALOGUE: &[(&str, &[&str])] = &[
    (
        "ATTITUDE",
        &["roll", "pitch", "yaw", "rollspeed", "pitchspeed", "yawspeed"],
    ),
    (
        "ATTITUDE_QUATERNION",
        &["q1", "q2", "q3", "q4", "rollspeed", "pitchspeed", "yawspeed"],
    ),
    (
        EULER_ANGLES,
        &["roll_deg", "pitch_deg", "yaw_deg", "roll", "pitch", "yaw"],
    ),
    (
        "GLOBAL_POSITION_INT",
        &["lat", "lon", "alt", "relative_alt", "vx", "vy", "vz", "hdg"],
    ),
    (
        "HIGHRES_IMU",
        &[
            "xacc",
            "yacc",
            "zacc",
            "xgyro",
            "ygyro",
            "zgyro",
            "xmag",
            "ymag",
            "zmag",
            "abs_pressure",
            "diff_pressure",
            "pressure_alt",
            "temperature",
        ],
    ),
    ("LOCAL_POSITION_NED", &["x", "y", "z", "vx", "vy", "vz"]),
    ("RAW_IMU", IMU),
    (
        "RC_CHANNELS",
        &[
            "chan1_raw",
            "chan2_raw",
            "chan3_raw",
            "chan4_raw",
            "chan5_raw",
            "chan6_raw",
            "chan7_raw",
            "chan8_raw",
        ],
    ),
    ("SCALED_IMU", IMU),
    ("SCALED_IMU2", IMU),
    (
        "SERVO_OUTPUT_RAW",
        &["servo1_raw", "servo2_raw", "servo3_raw", "servo4_raw"],
    ),
    (
        "SYS_STATUS",
        &["voltage_battery", "current_battery", "battery_remaining"],
    ),
    (
        "VFR_HUD",
        &["airspeed", "groundspeed", "heading", "throttle", "alt", "climb"],
    ),
];

/// Message types that have plottable fields, in name order.
pub fn plottable_types() -> impl Iterator<Item = &'static str> {
    CATALOGUE.iter().map(|(name, _)| *name)
}

/// Plottable fields of a message type, or `None` if the type has none.
pub fn plot_fields(type_name: &str) -> Option<&'static [&'static str]> {
    CATALOGUE
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, fields)| *fields)
}

/// Numeric value of a catalogued field, scaled to display units.
///
/// `GLOBAL_POSITION_INT` is converted from its integer wire encoding:
/// degrees for `lat`/`lon`, metres for `alt`/`relative_alt` and degrees for
/// `hdg`.
pub(crate) fn extract(message: &MavMessage, field: &str) -> Option<f64> {
    let value: f64 = match message {
        MavMessage::ATTITUDE(d) => match field {
            "roll" => d.roll,
            "pitch" => d.pitch,
            "yaw" => d.yaw,
            "rollspeed" => d.rollspeed,
            "pitchspeed" => d.pitchspeed,
            "yawspeed" => d.yawspeed,
            _ => return None,
        }
        .into(),
        MavMessage::ATTITUDE_QUATERNION(d) => match field {
            "q1" => d.q1,
            "q2" => d.q2,
            "q3" => d.q3,
            "q4" => d.q4,
            "rollspeed" => d.rollspeed,
            "pitchspeed" => d.pitchspeed,
            "yawspeed" => d.yawspeed,
            _ => return None,
        }
        .into(),
        MavMessage::LOCAL_POSITION_NED(d) => match field {
            "x" => d.x,
            "y" => d.y,
            "z" => d.z,
            "vx" => d.vx,
            "vy" => d.vy,
            "vz" => d.vz,
            _ => return None,
        }
        .into(),
        MavMessage::GLOBAL_POSITION_INT(d) => match field {
            "lat" => f64::from(d.lat) / 1e7,
            "lon" => f64::from(d.lon) / 1e7,
            "alt" => f64::from(d.alt) / 1000.0,
            "relative_alt" => f64::from(d.relative_alt) / 1000.0,
            "vx" => f64::from(d.vx),
            "vy" => f64::from(d.vy),
            "vz" => f64::from(d.vz),
            "hdg" => f64::from(d.hdg) / 100.0,
            _ => return None,
        },
        MavMessage::SCALED_IMU(d) => imu(
            field,
            [d.xacc, d.yacc, d.zacc, d.xgyro, d.ygyro, d.zgyro, d.xmag, d.ymag, d.zmag],
        )?,
        MavMessage::SCALED_IMU2(d) => imu(
            field,
            [d.xacc, d.yacc, d.zacc, d.xgyro, d.ygyro, d.zgyro, d.xmag, d.ymag, d.zmag],
        )?,
        MavMessage::RAW_IMU(d) => imu(
            field,
            [d.xacc, d.yacc, d.zacc, d.xgyro, d.ygyro, d.zgyro, d.xmag, d.ymag, d.zmag],
        )?,
        MavMessage::HIGHRES_IMU(d) => match field {
            "abs_pressure" => f64::from(d.abs_pressure),
            "diff_pressure" => f64::from(d.diff_pressure),
            "pressure_alt" => f64::from(d.pressure_alt),
            "temperature" => f64::from(d.temperature),
            _ => imu(
                field,
                [d.xacc, d.yacc, d.zacc, d.xgyro, d.ygyro, d.zgyro, d.xmag, d.ymag, d.zmag],
            )?,
        },
        MavMessage::RC_CHANNELS(d) => match field {
            "chan1_raw" => d.chan1_raw,
            "chan2_raw" => d.chan2_raw,
            "chan3_raw" => d.chan3_raw,
            "chan4_raw" => d.chan4_raw,
            "chan5_raw" => d.chan5_raw,
            "chan6_raw" => d.chan6_raw,
            "chan7_raw" => d.chan7_raw,
            "chan8_raw" => d.chan8_raw,
            _ => return None,
        }
        .into(),
        MavMessage::SERVO_OUTPUT_RAW(d) => match field {
            "servo1_raw" => d.servo1_raw,
            "servo2_raw" => d.servo2_raw,
            "servo3_raw" => d.servo3_raw,
            "servo4_raw" => d.servo4_raw,
            _ => return None,
        }
        .into(),
        MavMessage::VFR_HUD(d) => match field {
            "airspeed" => f64::from(d.airspeed),
            "groundspeed" => f64::from(d.groundspeed),
            "heading" => f64::from(d.heading),
            "throttle" => f64::from(d.throttle),
            "alt" => f64::from(d.alt),
            "climb" => f64::from(d.climb),
            _ => return None,
        },
        MavMessage::SYS_STATUS(d) => match field {
            "voltage_battery" => f64::from(d.voltage_battery),
            "current_battery" => f64::from(d.current_battery),
            "battery_remaining" => f64::from(d.battery_remaining),
            _ => return None,
        },
        _ => return None,
    };
    Some(value)
}

fn imu<T: Into<f64>>(field: &str, values: [T; 9]) -> Option<f64> {
    let index = IMU.iter().position(|name| *name == field)?;
    values.into_iter().nth(index).map(Into::into)
}
