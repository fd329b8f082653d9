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

mod core;
mod sht31;
mod test;

pub use crate::sensor::core::{
    open_bus, Humidity, SensorBus, SensorError, SensorErrorKind, TemperatureCelsius, SENSOR_ADDR,
};
pub use crate::sensor::sht31::{
    run_diagnostic, CheckCommand, Command, EnvironmentReading, Sht31Sensor, StatusRegister,
};
