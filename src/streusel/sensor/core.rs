// Streusel - SHT31 temperature and humidity check for monitoring systems
//
// Copyright 2024 The streusel developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use std::error::Error;
use std::fmt::{self, Formatter};

use rppal::i2c::I2c;

/// Fixed I2C peripheral address of the SHT31-D.
pub const SENSOR_ADDR: u16 = 0x44;

/// Temperature, in degrees celsius
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(transparent)]
pub struct TemperatureCelsius(f64);

impl TemperatureCelsius {
    pub const fn new(v: f64) -> Self {
        Self(v)
    }
}

impl From<TemperatureCelsius> for f64 {
    fn from(v: TemperatureCelsius) -> Self {
        v.0
    }
}

impl From<f64> for TemperatureCelsius {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl fmt::Display for TemperatureCelsius {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}c", self.0)
    }
}

/// Relative humidity (from 0 to 100)
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(transparent)]
pub struct Humidity(f64);

impl Humidity {
    pub const fn new(v: f64) -> Self {
        Self(v)
    }
}

impl From<Humidity> for f64 {
    fn from(v: Humidity) -> Self {
        v.0
    }
}

impl From<f64> for Humidity {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl fmt::Display for Humidity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Potential kinds of errors that can be encountered talking to the sensor
#[derive(PartialEq, Eq, Debug, Hash, Clone, Copy)]
pub enum SensorErrorKind {
    DeviceOpen,
    BusBind,
    CommandSend,
    CommandReceive,
    Checksum,
    UnknownCommand,
}

impl SensorErrorKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            SensorErrorKind::DeviceOpen => "device_open",
            SensorErrorKind::BusBind => "bus_bind",
            SensorErrorKind::CommandSend => "command_send",
            SensorErrorKind::CommandReceive => "command_receive",
            SensorErrorKind::Checksum => "checksum",
            SensorErrorKind::UnknownCommand => "unknown_command",
        }
    }
}

/// Error opening the I2C bus or exchanging commands with the SHT31 sensor
#[derive(Debug)]
pub enum SensorError {
    Checksum(u8, u8),
    KindMsg(SensorErrorKind, String),
    KindMsgCause(SensorErrorKind, String, Box<dyn Error + Send + Sync>),
}

impl SensorError {
    pub fn msg<S>(kind: SensorErrorKind, msg: S) -> Self
    where
        S: Into<String>,
    {
        SensorError::KindMsg(kind, msg.into())
    }

    pub fn with_cause<S, E>(kind: SensorErrorKind, msg: S, cause: E) -> Self
    where
        S: Into<String>,
        E: Error + Send + Sync + 'static,
    {
        SensorError::KindMsgCause(kind, msg.into(), Box::new(cause))
    }

    pub fn kind(&self) -> SensorErrorKind {
        match self {
            SensorError::Checksum(_, _) => SensorErrorKind::Checksum,
            SensorError::KindMsg(kind, _) => *kind,
            SensorError::KindMsgCause(kind, _, _) => *kind,
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Checksum(expected, computed) => {
                write!(
                    f,
                    "corrupted sensor response: expected checksum {:#04x}, computed {:#04x}",
                    expected, computed
                )
            }
            SensorError::KindMsg(_, msg) => msg.fmt(f),
            SensorError::KindMsgCause(_, msg, ref e) => write!(f, "{}: {}", msg, e),
        }
    }
}

impl Error for SensorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SensorError::KindMsgCause(_, _, ref e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Open the I2C bus behind the given device file and bind the fixed SHT31
/// peripheral address.
///
/// rppal addresses buses by index rather than path, so the index is taken
/// from the trailing number of the usual `/dev/i2c-N` device path (a bare
/// index is accepted as well). The returned handle releases the bus when
/// dropped.
pub fn open_bus(path: &str) -> Result<I2c, SensorError> {
    let bus = parse_bus_id(path).ok_or_else(|| {
        SensorError::msg(
            SensorErrorKind::DeviceOpen,
            format!("could not determine a bus index from device file: {}", path),
        )
    })?;

    let mut i2c = I2c::with_bus(bus).map_err(|e| {
        SensorError::with_cause(
            SensorErrorKind::DeviceOpen,
            format!("could not open device file: {}", path),
            e,
        )
    })?;

    i2c.set_slave_address(SENSOR_ADDR)
        .map_err(|e| SensorError::with_cause(SensorErrorKind::BusBind, "could not initialize the I2C bus", e))?;

    Ok(i2c)
}

fn parse_bus_id(path: &str) -> Option<u8> {
    let start = path.rfind(|c: char| !c.is_ascii_digit()).map(|i| i + 1).unwrap_or(0);
    path[start..].parse().ok()
}

/// Abstraction around `rppal::i2c::I2c` to allow for easier testing.
pub trait SensorBus {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SensorError>;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SensorError>;
}

impl SensorBus for I2c {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SensorError> {
        I2c::write(self, bytes).map_err(|e| {
            SensorError::with_cause(
                SensorErrorKind::CommandSend,
                "command could not be written to the bus",
                e,
            )
        })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SensorError> {
        I2c::read(self, buf).map_err(|e| {
            SensorError::with_cause(
                SensorErrorKind::CommandReceive,
                "response could not be read from the bus",
                e,
            )
        })
    }
}

#[cfg(test)]
mod test {
    use super::parse_bus_id;

    #[test]
    fn test_parse_bus_id_device_path() {
        assert_eq!(Some(1), parse_bus_id("/dev/i2c-1"));
        assert_eq!(Some(0), parse_bus_id("/dev/i2c-0"));
        assert_eq!(Some(10), parse_bus_id("/dev/i2c-10"));
    }

    #[test]
    fn test_parse_bus_id_bare_index() {
        assert_eq!(Some(3), parse_bus_id("3"));
    }

    #[test]
    fn test_parse_bus_id_invalid() {
        assert_eq!(None, parse_bus_id("/dev/i2c-"));
        assert_eq!(None, parse_bus_id("/dev/spidev0.0x"));
        assert_eq!(None, parse_bus_id(""));
    }
}
