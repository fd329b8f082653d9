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

use crate::sensor::core::{Humidity, SensorBus, SensorError, SensorErrorKind, TemperatureCelsius};
use std::fmt::{self, Formatter};
use std::thread;
use std::time::Duration;

const ENV_DATA_SIZE: usize = 6;
const SERIAL_DATA_SIZE: usize = 6;
const STATUS_DATA_SIZE: usize = 3;

// One initial attempt plus three retries, per the SHT31 plugin heritage:
// I2C reads on commodity SBC hardware are occasionally noisy and a retry
// with settling time absorbs transient bus errors.
const READ_ATTEMPTS: u32 = 4;
const CONVERSION_DELAY: Duration = Duration::from_millis(10);
const RETRY_DELAY: Duration = Duration::from_millis(1000);

const TEMPERATURE_MIN: f64 = -40.0;
const TEMPERATURE_MAX: f64 = 125.0;
const HUMIDITY_MIN: f64 = 0.0;
const HUMIDITY_MAX: f64 = 100.0;
const NOT_AVAILABLE: f64 = 130.0;

/// 16-bit SHT31 command codes, from the sensor datasheet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    EnvironmentRead,
    SoftReset,
    SerialRead,
    StatusRead,
    StatusClear,
    HeaterEnable,
    HeaterDisable,
}

impl Command {
    fn code(self) -> u16 {
        match self {
            Command::EnvironmentRead => 0x240B,
            Command::SoftReset => 0x30A2,
            Command::SerialRead => 0x3780,
            Command::StatusRead => 0xF32D,
            Command::StatusClear => 0x3041,
            Command::HeaterEnable => 0x306D,
            Command::HeaterDisable => 0x3066,
        }
    }

    /// Wire encoding of the command, high byte first.
    fn to_bytes(self) -> [u8; 2] {
        self.code().to_be_bytes()
    }
}

/// CRC-8 with polynomial 0x31 and initial value 0xFF, from page 14 of the
/// SHT31 datasheet. The sensor appends this checksum to every 16-bit word
/// of a response, so the algorithm has to match the vendor's bit for bit.
fn crc8(bytes: &[u8]) -> u8 {
    let mut result: u8 = 0xFF;

    for &b in bytes {
        result ^= b;
        for _ in 0..8 {
            result = if result & 0x80 != 0 {
                (result << 1) ^ 0x31
            } else {
                result << 1
            };
        }
    }

    result
}

fn checked(word: &[u8], expected: u8) -> Result<(), SensorError> {
    let computed = crc8(word);
    if computed != expected {
        Err(SensorError::Checksum(expected, computed))
    } else {
        Ok(())
    }
}

/// One converted temperature and humidity measurement.
///
/// A reading is only meaningful when both values fall within the sensor's
/// documented range; the `NOT_AVAILABLE` sentinel signals that no valid
/// measurement could be obtained.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EnvironmentReading {
    pub temperature: TemperatureCelsius,
    pub humidity: Humidity,
}

impl EnvironmentReading {
    /// Sentinel returned when every read attempt failed validation.
    pub const NOT_AVAILABLE: EnvironmentReading = EnvironmentReading {
        temperature: TemperatureCelsius::new(NOT_AVAILABLE),
        humidity: Humidity::new(NOT_AVAILABLE),
    };

    /// Convert raw 16-bit sensor counts into degrees celsius and %RH,
    /// per the conversion formulas in the SHT31 datasheet.
    fn from_raw(raw_temperature: u16, raw_humidity: u16) -> Self {
        EnvironmentReading {
            temperature: TemperatureCelsius::new(-45.0 + 175.0 * (raw_temperature as f64 / 65535.0)),
            humidity: Humidity::new(100.0 * (raw_humidity as f64 / 65535.0)),
        }
    }

    /// True when both values fall within the sensor's documented capabilities.
    pub fn is_available(&self) -> bool {
        let t = f64::from(self.temperature);
        let h = f64::from(self.humidity);
        (TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&t) && (HUMIDITY_MIN..=HUMIDITY_MAX).contains(&h)
    }
}

/// Decoded SHT31 status register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusRegister {
    raw: u16,
}

impl StatusRegister {
    pub fn from_word(raw: u16) -> Self {
        StatusRegister { raw }
    }

    pub fn raw(&self) -> u16 {
        self.raw
    }

    fn bit(&self, n: u16) -> u8 {
        ((self.raw >> n) & 1) as u8
    }

    pub fn checksum_failed(&self) -> u8 {
        self.bit(0)
    }

    pub fn last_command_failed(&self) -> u8 {
        self.bit(1)
    }

    pub fn reset_detected(&self) -> u8 {
        self.bit(4)
    }

    pub fn temperature_tracking_alert(&self) -> u8 {
        self.bit(10)
    }

    pub fn humidity_tracking_alert(&self) -> u8 {
        self.bit(11)
    }

    pub fn heater_enabled(&self) -> u8 {
        self.bit(13)
    }

    pub fn alert_pending(&self) -> u8 {
        self.bit(15)
    }
}

impl fmt::Display for StatusRegister {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sensor status:")?;
        writeln!(f, "Checksum:\t\t{}", self.checksum_failed())?;
        writeln!(f, "Last Command:\t\t{}", self.last_command_failed())?;
        writeln!(f, "Reset Detected:\t\t{}", self.reset_detected())?;
        writeln!(f, "Tmp Tracking Alert:\t{}", self.temperature_tracking_alert())?;
        writeln!(f, "Hum Tracking Alert:\t{}", self.humidity_tracking_alert())?;
        writeln!(f, "Heater:\t\t\t{}", self.heater_enabled())?;
        writeln!(f, "Alert Pending:\t\t{}", self.alert_pending())
    }
}

/// User-facing sensor commands, resolved from their plugin names.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CheckCommand {
    EnvironmentData,
    Serial,
    Status,
    ClearStatus,
    SoftReset,
    HeaterEnable,
    HeaterDisable,
}

impl CheckCommand {
    pub const NAMES: [&'static str; 7] = [
        "getEnvData",
        "getSerial",
        "getStatus",
        "clearStatus",
        "softReset",
        "heaterEnable",
        "heaterDisable",
    ];

    /// Case-insensitive resolution of a user supplied command name.
    pub fn from_name(name: &str) -> Result<Self, SensorError> {
        match name.to_ascii_lowercase().as_str() {
            "getenvdata" => Ok(CheckCommand::EnvironmentData),
            "getserial" => Ok(CheckCommand::Serial),
            "getstatus" => Ok(CheckCommand::Status),
            "clearstatus" => Ok(CheckCommand::ClearStatus),
            "softreset" => Ok(CheckCommand::SoftReset),
            "heaterenable" => Ok(CheckCommand::HeaterEnable),
            "heaterdisable" => Ok(CheckCommand::HeaterDisable),
            _ => Err(SensorError::msg(
                SensorErrorKind::UnknownCommand,
                format!(
                    "unknown sensor command '{}', available commands: {}",
                    name,
                    CheckCommand::NAMES.join(", ")
                ),
            )),
        }
    }
}

/// SHT31 protocol driver over an I2C bus handle.
///
/// All top level operations consume the driver, so the underlying bus
/// handle is released before any result crosses back to the caller.
pub struct Sht31Sensor {
    bus: Box<dyn SensorBus + Send>,
    conversion_delay: Duration,
    retry_delay: Duration,
}

impl Sht31Sensor {
    pub fn from_bus<T>(bus: T) -> Self
    where
        T: SensorBus + Send + 'static,
    {
        Self {
            bus: Box::new(bus),
            conversion_delay: CONVERSION_DELAY,
            retry_delay: RETRY_DELAY,
        }
    }

    fn send(&mut self, command: Command) -> Result<(), SensorError> {
        let bytes = command.to_bytes();
        let written = self.bus.write(&bytes)?;
        if written != bytes.len() {
            return Err(SensorError::msg(
                SensorErrorKind::CommandSend,
                format!(
                    "short write sending command {:?}: {} of {} bytes",
                    command,
                    written,
                    bytes.len()
                ),
            ));
        }

        tracing::trace!(message = "sent sensor command", command = ?command, code = command.code());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
        // The sensor needs time to finish its conversion before it will
        // answer on the bus.
        thread::sleep(self.conversion_delay);

        let read = self.bus.read(buf)?;
        if read < buf.len() {
            return Err(SensorError::msg(
                SensorErrorKind::CommandReceive,
                format!("short read of sensor response: {} of {} bytes", read, buf.len()),
            ));
        }

        Ok(())
    }

    fn transact(&mut self, command: Command, buf: &mut [u8]) -> Result<(), SensorError> {
        self.send(command)?;
        self.receive(buf)
    }

    /// Read temperature and humidity from the sensor, retrying reads whose
    /// checksums fail or whose converted values fall outside the sensor's
    /// documented range.
    ///
    /// Returns the `NOT_AVAILABLE` sentinel once the attempt budget is
    /// exhausted; only transport failures surface as errors.
    pub fn read_environment(mut self) -> Result<EnvironmentReading, SensorError> {
        for attempt in 1..=READ_ATTEMPTS {
            // A fresh buffer per attempt, so a failed checksum can never
            // leave a previous iteration's bytes in play.
            let mut data = [0u8; ENV_DATA_SIZE];
            self.transact(Command::EnvironmentRead, &mut data)?;

            if checked(&data[0..2], data[2]).is_ok() && checked(&data[3..5], data[5]).is_ok() {
                let raw_temperature = u16::from_be_bytes([data[0], data[1]]);
                let raw_humidity = u16::from_be_bytes([data[3], data[4]]);
                let reading = EnvironmentReading::from_raw(raw_temperature, raw_humidity);

                tracing::debug!(
                    message = "parsed environment data",
                    attempt = attempt,
                    raw_temperature = raw_temperature,
                    raw_humidity = raw_humidity,
                    temperature = %reading.temperature,
                    humidity = %reading.humidity,
                );

                if reading.is_available() {
                    return Ok(reading);
                }
            } else {
                tracing::debug!(message = "environment data failed checksum validation", attempt = attempt);
            }

            if attempt < READ_ATTEMPTS {
                thread::sleep(self.retry_delay);
            }
        }

        Ok(EnvironmentReading::NOT_AVAILABLE)
    }

    /// Read the sensor serial number.
    pub fn read_serial(mut self) -> Result<u32, SensorError> {
        let mut data = [0u8; SERIAL_DATA_SIZE];
        self.transact(Command::SerialRead, &mut data)?;

        checked(&data[0..2], data[2])?;
        checked(&data[3..5], data[5])?;

        Ok(u32::from_be_bytes([data[0], data[1], data[3], data[4]]))
    }

    /// Read and decode the sensor status register.
    pub fn read_status(mut self) -> Result<StatusRegister, SensorError> {
        let mut data = [0u8; STATUS_DATA_SIZE];
        self.transact(Command::StatusRead, &mut data)?;

        checked(&data[0..2], data[2])?;

        Ok(StatusRegister::from_word(u16::from_be_bytes([data[0], data[1]])))
    }

    pub fn clear_status(mut self) -> Result<(), SensorError> {
        self.send(Command::StatusClear)
    }

    pub fn soft_reset(mut self) -> Result<(), SensorError> {
        self.send(Command::SoftReset)
    }

    pub fn heater_enable(mut self) -> Result<(), SensorError> {
        self.send(Command::HeaterEnable)
    }

    pub fn heater_disable(mut self) -> Result<(), SensorError> {
        self.send(Command::HeaterDisable)
    }
}

/// Execute one of the diagnostic commands and write its human readable
/// result to stdout. The environment check has its own output path and is
/// not accepted here.
pub fn run_diagnostic(sensor: Sht31Sensor, command: CheckCommand) -> Result<(), SensorError> {
    match command {
        CheckCommand::EnvironmentData => Err(SensorError::msg(
            SensorErrorKind::UnknownCommand,
            "getEnvData is not a diagnostic command",
        )),
        CheckCommand::Serial => {
            let serial = sensor.read_serial()?;
            println!("S/N: 0x{:08x}", serial);
            Ok(())
        }
        CheckCommand::Status => {
            let status = sensor.read_status()?;
            print!("{}", status);
            Ok(())
        }
        CheckCommand::ClearStatus => {
            sensor.clear_status()?;
            println!("Sensor status cleared.");
            Ok(())
        }
        CheckCommand::SoftReset => {
            sensor.soft_reset()?;
            println!("Sensor was soft reset.");
            Ok(())
        }
        CheckCommand::HeaterEnable => {
            sensor.heater_enable()?;
            println!("Sensor heater unit enabled.");
            Ok(())
        }
        CheckCommand::HeaterDisable => {
            sensor.heater_disable()?;
            println!("Sensor heater unit disabled.");
            Ok(())
        }
    }
}
