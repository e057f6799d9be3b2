//! Input channel messages.
//!
//! Every local input event becomes one JSON object sent as one text message
//! on the session's `input` data channel.  The `t` field names the event:
//!
//! | `t`        | Fields                                   |
//! |------------|------------------------------------------|
//! | `mmoveAbs` | `x`, `y` in `[0,1]`, `inside` (0/1), `ts`  |
//! | `mdown`    | `b` (button index), `x`, `y`, `ts`        |
//! | `mup`      | `b`, `x`, `y`, `ts`                       |
//! | `mwheel`   | `dx`, `dy`, `ts`                          |
//! | `kdown`    | `k` (physical key code), `ts`             |
//! | `kup`      | `k`, `ts`                                 |
//! | `gp`       | `id`, `index`, `axes`, `buttons` (0/1), `ts` |
//!
//! `ts` is a client-local timestamp in milliseconds.  The host only uses it
//! to order and age events, so its epoch does not matter.

use serde::{Deserialize, Serialize};

/// Decimal places kept for gamepad axis values.
pub const AXIS_DECIMALS: i32 = 3;

/// One controller's state at a polling instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamepadState {
    /// Controller identification string reported by the platform.
    pub id: String,
    /// Slot index of the controller.
    pub index: u32,
    pub axes: Vec<f64>,
    #[serde(with = "bits")]
    pub buttons: Vec<bool>,
}

impl GamepadState {
    /// Subtracts `baseline` from the axes and rounds to [`AXIS_DECIMALS`].
    ///
    /// Axes beyond the end of the baseline are only rounded.
    pub fn normalized(&self, baseline: Option<&[f64]>) -> Self {
        let scale = 10f64.powi(AXIS_DECIMALS);
        let axes = self
            .axes
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let zero = baseline.and_then(|b| b.get(i)).copied().unwrap_or(0.0);
                let rounded = ((v - zero) * scale).round() / scale;
                // Avoid emitting "-0.0", which would differ textually from "0.0".
                if rounded == 0.0 {
                    0.0
                } else {
                    rounded
                }
            })
            .collect();
        Self {
            id: self.id.clone(),
            index: self.index,
            axes,
            buttons: self.buttons.clone(),
        }
    }
}

/// One message on the input channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum InputMessage {
    /// Absolute pointer position relative to the picture.
    #[serde(rename = "mmoveAbs")]
    MouseMoveAbs {
        x: f64,
        y: f64,
        #[serde(with = "bit")]
        inside: bool,
        ts: f64,
    },

    #[serde(rename = "mdown")]
    MouseDown {
        #[serde(rename = "b")]
        button: u8,
        x: f64,
        y: f64,
        ts: f64,
    },

    #[serde(rename = "mup")]
    MouseUp {
        #[serde(rename = "b")]
        button: u8,
        x: f64,
        y: f64,
        ts: f64,
    },

    /// Wheel deltas exactly as the platform reported them.
    #[serde(rename = "mwheel")]
    MouseWheel { dx: f64, dy: f64, ts: f64 },

    #[serde(rename = "kdown")]
    KeyDown {
        #[serde(rename = "k")]
        key: String,
        ts: f64,
    },

    #[serde(rename = "kup")]
    KeyUp {
        #[serde(rename = "k")]
        key: String,
        ts: f64,
    },

    #[serde(rename = "gp")]
    Gamepad {
        #[serde(flatten)]
        state: GamepadState,
        ts: f64,
    },
}

impl InputMessage {
    /// Serialises the message as the JSON text sent on the channel.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses one channel message.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The wire name of the message (`"mmoveAbs"`, `"kdown"`, …).
    pub fn kind(&self) -> &'static str {
        match self {
            InputMessage::MouseMoveAbs { .. } => "mmoveAbs",
            InputMessage::MouseDown { .. } => "mdown",
            InputMessage::MouseUp { .. } => "mup",
            InputMessage::MouseWheel { .. } => "mwheel",
            InputMessage::KeyDown { .. } => "kdown",
            InputMessage::KeyUp { .. } => "kup",
            InputMessage::Gamepad { .. } => "gp",
        }
    }
}

/// `bool` carried as `0`/`1`.
mod bit {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(d)? != 0)
    }
}

/// `Vec<bool>` carried as an array of `0`/`1`.
mod bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[bool], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter().map(|b| u8::from(*b)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<bool>, D::Error> {
        Ok(Vec::<u8>::deserialize(d)?
            .into_iter()
            .map(|b| b != 0)
            .collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_value(msg: &InputMessage) -> Value {
        serde_json::from_str(&msg.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_mouse_move_wire_shape() {
        // Arrange
        let msg = InputMessage::MouseMoveAbs {
            x: 0.25,
            y: 0.75,
            inside: true,
            ts: 12.5,
        };

        // Act
        let v = as_value(&msg);

        // Assert
        assert_eq!(
            v,
            json!({"t": "mmoveAbs", "x": 0.25, "y": 0.75, "inside": 1, "ts": 12.5})
        );
    }

    #[test]
    fn test_mouse_button_uses_short_field_names() {
        let msg = InputMessage::MouseUp {
            button: 2,
            x: 0.5,
            y: 0.5,
            ts: 1.0,
        };
        assert_eq!(
            as_value(&msg),
            json!({"t": "mup", "b": 2, "x": 0.5, "y": 0.5, "ts": 1.0})
        );
    }

    #[test]
    fn test_key_and_wheel_wire_shape() {
        let key = InputMessage::KeyDown {
            key: "KeyA".into(),
            ts: 3.0,
        };
        let wheel = InputMessage::MouseWheel {
            dx: 0.0,
            dy: -120.0,
            ts: 4.0,
        };
        assert_eq!(as_value(&key), json!({"t": "kdown", "k": "KeyA", "ts": 3.0}));
        assert_eq!(
            as_value(&wheel),
            json!({"t": "mwheel", "dx": 0.0, "dy": -120.0, "ts": 4.0})
        );
    }

    #[test]
    fn test_gamepad_is_flattened_with_bit_buttons() {
        // Arrange
        let msg = InputMessage::Gamepad {
            state: GamepadState {
                id: "Xbox Controller".into(),
                index: 0,
                axes: vec![0.5, -1.0],
                buttons: vec![true, false, true],
            },
            ts: 8.0,
        };

        // Act
        let v = as_value(&msg);
        let back = InputMessage::from_json(&msg.to_json().unwrap()).unwrap();

        // Assert
        assert_eq!(
            v,
            json!({"t": "gp", "id": "Xbox Controller", "index": 0,
                   "axes": [0.5, -1.0], "buttons": [1, 0, 1], "ts": 8.0})
        );
        assert_eq!(back, msg);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(InputMessage::from_json(r#"{"t":"teleport","ts":0}"#).is_err());
    }

    #[test]
    fn test_gamepad_normalization_subtracts_baseline_and_rounds() {
        // Arrange
        let raw = GamepadState {
            id: "pad".into(),
            index: 1,
            axes: vec![0.12349, 0.5, 0.01],
            buttons: vec![false],
        };

        // Act
        let n = raw.normalized(Some(&[0.0, 0.5]));

        // Assert
        assert_eq!(n.axes, vec![0.123, 0.0, 0.01]);
    }

    #[test]
    fn test_negative_zero_is_normalized_to_zero() {
        let raw = GamepadState {
            id: "pad".into(),
            index: 0,
            axes: vec![-0.0001],
            buttons: vec![],
        };
        let n = raw.normalized(None);
        assert!(n.axes[0].is_sign_positive());
    }
}
