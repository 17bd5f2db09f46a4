use serde::{Deserialize, Serialize};

/// Bit set in [`PointerState::buttons`] while the left button is held.
pub const LEFT_BUTTON: u8 = 0b01;

/// Bit set in [`PointerState::buttons`] while the right button is held.
pub const RIGHT_BUTTON: u8 = 0b10;

/// One captured snapshot of pointer position, buttons and scroll delta.
///
/// Samples are plain values: the queue reorders and drops them but never
/// rewrites one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerState {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub left_button_down: bool,
    #[serde(default)]
    pub right_button_down: bool,
    /// Signed scroll delta. Only its sign reaches the wire.
    #[serde(default)]
    pub wheel: i32,
}

/// Direction of a scroll delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Down,
    None,
    Up,
}

impl PointerState {
    /// Creates a sample at `(x, y)` with no buttons held and no scroll.
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    /// Returns a copy with the given button flags.
    pub fn with_buttons(self, left: bool, right: bool) -> Self {
        Self {
            left_button_down: left,
            right_button_down: right,
            ..self
        }
    }

    /// Returns a copy with the given scroll delta.
    pub fn with_wheel(self, wheel: i32) -> Self {
        Self { wheel, ..self }
    }

    /// Button flags packed as [`LEFT_BUTTON`] | [`RIGHT_BUTTON`].
    pub fn buttons(&self) -> u8 {
        let mut flags = 0;
        if self.left_button_down {
            flags |= LEFT_BUTTON;
        }
        if self.right_button_down {
            flags |= RIGHT_BUTTON;
        }
        flags
    }

    pub fn wheel_direction(&self) -> WheelDirection {
        match self.wheel {
            w if w < 0 => WheelDirection::Down,
            w if w > 0 => WheelDirection::Up,
            _ => WheelDirection::None,
        }
    }

    /// Whether `next` may replace `self` as the reported sample: same
    /// buttons and same scroll direction.
    pub(crate) fn same_transition_as(&self, next: &PointerState) -> bool {
        self.buttons() == next.buttons() && self.wheel_direction() == next.wheel_direction()
    }

    /// Whether `self` lies within `distance` of `origin` on both axes.
    pub(crate) fn within(&self, origin: &PointerState, distance: u32) -> bool {
        self.x.abs_diff(origin.x) < distance && self.y.abs_diff(origin.y) < distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_flags() {
        assert_eq!(PointerState::at(0, 0).buttons(), 0);
        assert_eq!(PointerState::at(0, 0).with_buttons(true, false).buttons(), 1);
        assert_eq!(PointerState::at(0, 0).with_buttons(false, true).buttons(), 2);
        assert_eq!(PointerState::at(0, 0).with_buttons(true, true).buttons(), 3);
    }

    #[test]
    fn wheel_direction_uses_sign() {
        assert_eq!(
            PointerState::at(0, 0).with_wheel(-5).wheel_direction(),
            WheelDirection::Down
        );
        assert_eq!(
            PointerState::at(0, 0).with_wheel(3).wheel_direction(),
            WheelDirection::Up
        );
        assert_eq!(PointerState::at(0, 0).wheel_direction(), WheelDirection::None);
    }

    #[test]
    fn same_transition_ignores_wheel_magnitude() {
        let a = PointerState::at(0, 0).with_wheel(1);
        let b = PointerState::at(5, 5).with_wheel(120);
        assert!(a.same_transition_as(&b));
        assert!(!a.same_transition_as(&b.with_wheel(-1)));
        assert!(!a.same_transition_as(&b.with_buttons(false, true)));
    }

    #[test]
    fn within_is_exclusive_at_threshold() {
        let origin = PointerState::at(0, 0);
        assert!(PointerState::at(299, -299).within(&origin, 300));
        assert!(!PointerState::at(300, 0).within(&origin, 300));
        assert!(!PointerState::at(0, -300).within(&origin, 300));
    }

    #[test]
    fn within_handles_extreme_coordinates() {
        let origin = PointerState::at(i32::MIN, i32::MIN);
        assert!(!PointerState::at(i32::MAX, 0).within(&origin, 300));
    }

    #[test]
    fn json_uses_camel_case() {
        let state: PointerState =
            serde_json::from_str(r#"{"x":10,"y":20,"leftButtonDown":true}"#).unwrap();
        assert_eq!(state, PointerState::at(10, 20).with_buttons(true, false));

        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["rightButtonDown"], false);
        assert_eq!(json["wheel"], 0);
    }
}
