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

#![cfg(test)]

use crate::sensor::core::{SensorBus, SensorError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// SensorBus implementation fed from a script of canned responses.
///
/// Every write is recorded so tests can assert on the exact commands that
/// reached the bus; the write log is shared via `Arc` since the bus itself
/// is consumed by the sensor under test.
pub(crate) struct ScriptedBus {
    responses: VecDeque<Vec<u8>>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ScriptedBus {
    pub(crate) fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        ScriptedBus {
            responses: responses.into_iter().collect(),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn writes(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        self.writes.clone()
    }
}

impl SensorBus for ScriptedBus {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SensorError> {
        self.writes.lock().unwrap().push(bytes.to_vec());
        Ok(bytes.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SensorError> {
        // A script shorter than the requested read surfaces as a short
        // read, exactly like a sensor that stopped answering.
        let next = self.responses.pop_front().unwrap_or_default();
        let n = next.len().min(buf.len());
        buf[..n].copy_from_slice(&next[..n]);
        Ok(n)
    }
}

/// SensorBus implementation that never writes a full command.
pub(crate) struct ShortWriteBus;

impl SensorBus for ShortWriteBus {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SensorError> {
        Ok(bytes.len().saturating_sub(1))
    }

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, SensorError> {
        Ok(0)
    }
}

/// SensorBus implementation that accepts commands but always comes up one
/// byte short on the response.
pub(crate) struct ShortReadBus;

impl SensorBus for ShortReadBus {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, SensorError> {
        Ok(bytes.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SensorError> {
        Ok(buf.len().saturating_sub(1))
    }
}
