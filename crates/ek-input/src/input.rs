//! Controller inputs and input deltas

use bitflags::bitflags;

bitflags! {
    /// Logical controller inputs a delta can refer to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CoreInput: u32 {
        const FACE_BUTTON_UP       = 1 << 0;
        const FACE_BUTTON_DOWN     = 1 << 1;
        const FACE_BUTTON_LEFT     = 1 << 2;
        const FACE_BUTTON_RIGHT    = 1 << 3;
        const LEFT_SHOULDER        = 1 << 4;
        const LEFT_TRIGGER         = 1 << 5;
        const RIGHT_SHOULDER       = 1 << 6;
        const RIGHT_TRIGGER        = 1 << 7;
        const START                = 1 << 8;
        const SELECT               = 1 << 9;
        const DPAD                 = 1 << 10;
        const LEFT_JOYSTICK        = 1 << 11;
        const LEFT_JOYSTICK_PRESS  = 1 << 12;
        const RIGHT_JOYSTICK       = 1 << 13;
        const RIGHT_JOYSTICK_PRESS = 1 << 14;
        const TOUCH_SURFACE        = 1 << 15;
        const TOUCH_PRESS          = 1 << 16;
        const SLEEP                = 1 << 17;
    }
}

/// A change in one or more inputs.
///
/// Buttons carry 1.0 or 0.0 in `x` for pressed/released and an optional
/// analog pressure in `y`. Axes carry both components; a partial update
/// marks the untouched component with [`InputDelta::IGNORE_VALUE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputDelta {
    pub input: CoreInput,
    pub value: [f32; 2],
    /// Seconds
    pub timestamp: f64,
}

impl InputDelta {
    pub const IGNORE_VALUE: f32 = f32::NAN;

    pub const ZERO: Self = Self {
        input: CoreInput::empty(),
        value: [0.0, 0.0],
        timestamp: 0.0,
    };

    pub fn new(input: CoreInput, x: f32, y: f32, timestamp: f64) -> Self {
        Self {
            input,
            value: [x, y],
            timestamp,
        }
    }

    pub fn button(input: CoreInput, pressed: bool, analog: f32, timestamp: f64) -> Self {
        Self::new(input, if pressed { 1.0 } else { 0.0 }, analog, timestamp)
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.value[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.value[1]
    }

    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.x() != 0.0
    }

    #[inline]
    pub fn use_x(&self) -> bool {
        !self.x().is_nan()
    }

    #[inline]
    pub fn use_y(&self) -> bool {
        !self.y().is_nan()
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.y() > 0.0
    }

    #[inline]
    pub fn is_down(&self) -> bool {
        self.y() < 0.0
    }

    #[inline]
    pub fn is_left(&self) -> bool {
        self.x() < 0.0
    }

    #[inline]
    pub fn is_right(&self) -> bool {
        self.x() > 0.0
    }
}

impl Default for InputDelta {
    fn default() -> Self {
        Self::ZERO
    }
}
