//! Resistive touch panel sample decoding and calibration.

use core::f32::consts::PI;

/// A calibrated touch position in display pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
}

/// Reconstruct the two 10-bit ADC readings from the X high, Y high and combined low-bits
/// registers. The low register holds X in bits 1:0 and Y in bits 3:2.
pub fn decode_raw(x_high: u8, y_high: u8, low: u8) -> (u16, u16) {
    let x = (x_high as u16) << 2 | (low & 0x03) as u16;
    let y = (y_high as u16) << 2 | ((low >> 2) & 0x03) as u16;
    (x, y)
}

/// Maps raw ADC readings to display pixels.
///
/// Y is remapped linearly: `(raw - y_offset) * y_span_out / y_span_in`. X passes through, plus
/// an optional sine bow that depends on the calibrated Y, `sin(y * PI / bow_period) *
/// bow_amplitude`, for panels mounted with a curved X response. Both results are truncated
/// toward zero and clamped at 0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchCalibration {
    pub y_offset: f32,
    pub y_span_out: f32,
    pub y_span_in: f32,
    pub bow_amplitude: f32,
    pub bow_period: f32,
}

impl Default for TouchCalibration {
    fn default() -> Self {
        TouchCalibration {
            y_offset: 120.0,
            y_span_out: 480.0,
            y_span_in: 830.0,
            bow_amplitude: 0.0,
            bow_period: 480.0,
        }
    }
}

impl TouchCalibration {
    pub fn apply(&self, raw_x: u16, raw_y: u16) -> TouchPoint {
        let y = (raw_y as f32 - self.y_offset) * self.y_span_out / self.y_span_in;
        let y = clamp(y as i32);
        let bow = if self.bow_amplitude != 0.0 {
            libm::sinf(y as f32 * PI / self.bow_period) * self.bow_amplitude
        } else {
            0.0
        };
        let x = clamp((raw_x as f32 + bow) as i32);
        TouchPoint { x, y }
    }
}

fn clamp(v: i32) -> u16 {
    if v < 0 {
        0
    } else if v > u16::max_value() as i32 {
        u16::max_value()
    } else {
        v as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_reconstruction() {
        assert_eq!(decode_raw(0x64, 0x1E, 0b1101), (401, 123));
        assert_eq!(decode_raw(0xFF, 0xFF, 0x0F), (1023, 1023));
        assert_eq!(decode_raw(0, 0, 0xF0), (0, 0));
    }

    #[test]
    fn default_calibration() {
        let cal = TouchCalibration::default();
        assert_eq!(cal.apply(401, 123), TouchPoint { x: 401, y: 1 });
        assert_eq!(cal.apply(500, 950), TouchPoint { x: 500, y: 480 });
        // Exact multiples must not round down.
        assert_eq!(cal.apply(0, 120 + 83 * 5), TouchPoint { x: 0, y: 240 });
    }

    #[test]
    fn clamps_below_offset() {
        let cal = TouchCalibration::default();
        assert_eq!(cal.apply(0, 10), TouchPoint { x: 0, y: 0 });
    }

    #[test]
    fn bow_correction() {
        let cal = TouchCalibration {
            bow_amplitude: 60.5,
            ..TouchCalibration::default()
        };
        // sin(240 * PI / 480) = 1
        assert_eq!(cal.apply(100, 120 + 83 * 5), TouchPoint { x: 160, y: 240 });
        let cal = TouchCalibration {
            bow_amplitude: -200.0,
            ..TouchCalibration::default()
        };
        assert_eq!(cal.apply(100, 120 + 83 * 5).x, 0);
    }
}
