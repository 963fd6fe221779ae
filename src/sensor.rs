//! Capabilities of the sensors an application shows on the display. The driver does not talk to
//! sensors itself; these traits describe what an application loop consumes, and closures
//! implement them so any driver can be adapted in place.

/// An analog-to-digital converter with single-ended input channels.
pub trait VoltageSource {
    type Error;

    /// Read the voltage on `channel`, in volts.
    fn read_voltage(&mut self, channel: u8) -> Result<f32, Self::Error>;
}

impl<F, E> VoltageSource for F
where
    F: FnMut(u8) -> Result<f32, E>,
{
    type Error = E;

    fn read_voltage(&mut self, channel: u8) -> Result<f32, E> {
        self(channel)
    }
}

/// A sensor producing one typed reading per call, such as an accelerometer axis triple or a
/// temperature.
pub trait MeasurementSource<T> {
    type Error;

    fn read(&mut self) -> Result<T, Self::Error>;
}

impl<F, T, E> MeasurementSource<T> for F
where
    F: FnMut() -> Result<T, E>,
{
    type Error = E;

    fn read(&mut self) -> Result<T, E> {
        self()
    }
}

/// A reading along three axes, as returned by accelerometers, gyroscopes and magnetometers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Axes {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Axes {
    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Axes { x, y, z }
    }

    /// Compass heading in radians, 0 to 2*PI, from the horizontal field components.
    pub fn heading(&self) -> f32 {
        let h = libm::atan2f(self.y as f32, self.x as f32);
        if h < 0.0 {
            h + 2.0 * core::f32::consts::PI
        } else {
            h
        }
    }
}

/// Read every channel in `channels` from `adc` into `out`, stopping at the first failure.
pub fn sample_channels<V>(adc: &mut V, channels: &[u8], out: &mut [f32]) -> Result<usize, V::Error>
where
    V: VoltageSource,
{
    let mut n = 0;
    for (&ch, slot) in channels.iter().zip(out.iter_mut()) {
        *slot = adc.read_voltage(ch)?;
        n += 1;
    }
    Ok(n)
}
