//! Reads the combined sensor from a Linux I2C bus.
//!
//! ```text
//! RUST_LOG=info cargo run --example linux -- /dev/i2c-1
//! ```

use std::cell::RefCell;
use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c, Operation};
use env_voc_sensor::{BusControl, BusPins, ConfigStore, Sensor, StoreError, VocSensorBuilder};
use linux_embedded_hal::{Delay, I2cdev};
use log::{info, warn};

/// `/dev/i2c-*` handle. The kernel owns the pin mux, so starting is a no-op.
struct LinuxBus(I2cdev);

impl ErrorType for LinuxBus {
    type Error = <I2cdev as ErrorType>::Error;
}

impl I2c for LinuxBus {
    fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.0.read(address, read)
    }

    fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.0.write(address, write)
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Self::Error> {
        self.0.write_read(address, write, read)
    }

    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        self.0.transaction(address, operations)
    }
}

impl BusControl for LinuxBus {
    type Error = Infallible;

    fn start(&mut self, pins: Option<BusPins>) -> Result<(), Infallible> {
        if let Some(pins) = pins {
            warn!("ignoring pins {:?}, the bus is configured by the kernel", pins);
        }
        Ok(())
    }
}

/// Maps store paths below a local directory.
struct FsStore {
    root: PathBuf,
}

impl FsStore {
    fn file(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl ConfigStore for FsStore {
    fn exists(&mut self, path: &str) -> bool {
        self.file(path).is_file()
    }

    fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, StoreError> {
        let data = fs::read(self.file(path)).map_err(|_| StoreError::NotFound)?;
        buf.get_mut(..data.len())
            .ok_or(StoreError::BufferTooSmall)?
            .copy_from_slice(&data);
        Ok(data.len())
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        let file = self.file(path);
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir).map_err(|_| StoreError::Io)?;
        }
        fs::write(file, data).map_err(|_| StoreError::Io)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let device = std::env::args().nth(1).unwrap_or_else(|| "/dev/i2c-1".into());
    let bus = RefCell::new(LinuxBus(I2cdev::new(&device)?));
    let store = FsStore {
        root: Path::new("voc-data").to_path_buf(),
    };

    let mut sensor = VocSensorBuilder::new("Air")
        .build(&bus, store, Delay)
        .map_err(|e| format!("{:?}", e))?;

    if !sensor.begin() {
        return Err(format!("startup failed on {}", device).into());
    }

    let mut delay = Delay;
    for _ in 0..10 {
        if sensor.take_measurement() {
            let description = sensor.description();
            for ((parameter, unit), value) in description
                .parameters
                .iter()
                .zip(description.units)
                .zip(sensor.values())
            {
                info!("{:<12} {:>9.2} {}", parameter, value, unit);
            }
        }
        delay.delay_ms(1000);
    }

    Ok(())
}
