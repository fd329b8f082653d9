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

//! Check environment temperature and humidity with an SHT31-D sensor over I2C.
//!
//! ## Features
//!
//! Streusel is a single-shot Nagios-compatible plugin for single board
//! computers (Raspberry Pi and similar). It reads temperature and relative
//! humidity from a [Sensirion SHT31-D](https://sensirion.com/products/catalog/SHT31-DIS-B)
//! sensor attached to an I2C bus, validates the response checksums, and
//! prints a standard plugin status line with performance data. The process
//! exit code follows plugin conventions: `0` OK, `1` WARNING, `2` CRITICAL,
//! `3` UNKNOWN.
//!
//! ```text
//! streusel --device /dev/i2c-1 --temp-warn 18:28 --temp-crit 15:35
//! SHT31 OK - temperature: 24.3 C, humidity: 30.7 %RH | temperature=24.32;18:28;15:35 humidity=30.67%;;
//! ```
//!
//! A handful of diagnostic sub-commands are also available through the
//! `--command` flag: `getSerial`, `getStatus`, `clearStatus`, `softReset`,
//! `heaterEnable`, and `heaterDisable`.
//!
//! ## Build
//!
//! `streusel` is a Rust program and must be built from source using a
//! [Rust toolchain](https://rustup.rs/). Since it's meant to run on a single
//! board computer, you will likely need to cross-compile it. On Ubuntu
//! GNU/Linux:
//!
//! ```text
//! apt-get install gcc-arm-linux-gnueabihf musl-tools
//! rustup target add armv7-unknown-linux-musleabihf
//! cargo build --release --target armv7-unknown-linux-musleabihf
//! ```
//!
//! ## Run
//!
//! The sensor must be wired to an I2C bus of the machine and answers at the
//! fixed peripheral address `0x44`. The invoking user needs read/write
//! access to the bus device file (usually membership in the `i2c` group, or
//! root). The device file is selected with `--device`, `/dev/i2c-1` by
//! default.
//!

pub mod check;
pub mod sensor;
