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

use clap::Parser;
use std::io;
use std::process;
use streusel::check::{self, Bounds, Thresholds};
use streusel::sensor::{open_bus, run_diagnostic, CheckCommand, Sht31Sensor};
use tracing::Level;

const DEFAULT_DEVICE: &str = "/dev/i2c-1";
const DEFAULT_COMMAND: &str = "getEnvData";
const DEFAULT_LOG_LEVEL: Level = Level::WARN;

/// Check environment temperature and humidity with an SHT31-D sensor
///
/// Reads the sensor over an I2C bus of a single board computer and emits a
/// Nagios compatible status line with performance data; the process exit
/// code is the plugin status (0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN).
/// Diagnostic sub-commands expose the sensor serial number and status
/// register and control soft reset and the built-in heater.
#[derive(Debug, Parser)]
#[clap(name = "streusel", version = clap::crate_version!())]
struct StreuselApplication {
    /// I2C device file the sensor is attached to
    #[arg(long, default_value = DEFAULT_DEVICE)]
    device: String,

    /// Sensor command to run: getEnvData, getSerial, getStatus, clearStatus,
    /// softReset, heaterEnable, or heaterDisable (case insensitive)
    #[arg(long, default_value = DEFAULT_COMMAND)]
    command: String,

    /// Warning range for temperature in degrees celsius, as MIN:MAX
    #[arg(long, allow_hyphen_values = true)]
    temp_warn: Option<Bounds>,

    /// Critical range for temperature in degrees celsius, as MIN:MAX
    #[arg(long, allow_hyphen_values = true)]
    temp_crit: Option<Bounds>,

    /// Warning range for relative humidity, as MIN:MAX
    #[arg(long)]
    hum_warn: Option<Bounds>,

    /// Critical range for relative humidity, as MIN:MAX
    #[arg(long)]
    hum_crit: Option<Bounds>,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn',
    /// and 'error' (case insensitive)
    #[arg(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,
}

fn main() {
    let opts = StreuselApplication::parse();

    // Logging goes to stderr: stdout belongs to the plugin output that the
    // monitoring system parses.
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .with_writer(io::stderr)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    // Resolve the command name before touching the bus so that an unknown
    // name never results in any device I/O.
    let command = CheckCommand::from_name(&opts.command).unwrap_or_else(|e| {
        tracing::error!(message = "unrecognized sensor command", kind = e.kind().as_label(), error = %e);
        process::exit(1)
    });

    let bus = open_bus(&opts.device).unwrap_or_else(|e| {
        tracing::error!(
            message = "failed to open sensor bus",
            device = %opts.device,
            kind = e.kind().as_label(),
            error = %e,
        );
        process::exit(1)
    });
    let sensor = Sht31Sensor::from_bus(bus);

    match command {
        CheckCommand::EnvironmentData => {
            let temperature = Thresholds {
                warn: opts.temp_warn,
                crit: opts.temp_crit,
            };
            let humidity = Thresholds {
                warn: opts.hum_warn,
                crit: opts.hum_crit,
            };

            // The sensor is consumed here; the bus handle is already closed
            // by the time the reading comes back.
            let reading = sensor.read_environment().unwrap_or_else(|e| {
                tracing::error!(message = "failed to read the sensor", kind = e.kind().as_label(), error = %e);
                process::exit(1)
            });

            let status = check::classify(&reading, &temperature, &humidity);
            println!("{}", check::render(&reading, status, &temperature, &humidity));
            process::exit(status.exit_code())
        }
        diagnostic => {
            if let Err(e) = run_diagnostic(sensor, diagnostic) {
                tracing::error!(
                    message = "sensor command failed",
                    command = %opts.command,
                    kind = e.kind().as_label(),
                    error = %e,
                );
                process::exit(1)
            }
        }
    }
}
