//! Full device cycles through the bundled drivers on a mocked bus.

use core::cell::RefCell;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
use env_voc_sensor::{BusControl, BusPins, ConfigStore, DeviceState, Sensor, StoreError, VocSensorBuilder};

const ENS: u8 = 0x53;
const BME: u8 = 0x76;

struct MockBus {
    i2c: I2cMock,
    starts: Vec<Option<BusPins>>,
}

impl MockBus {
    fn new(expectations: &[Transaction]) -> Self {
        Self {
            i2c: I2cMock::new(expectations),
            starts: Vec::new(),
        }
    }
}

impl ErrorType for MockBus {
    type Error = ErrorKind;
}

impl I2c for MockBus {
    fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.read(address, read)
    }

    fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, write)
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(address, write, read)
    }

    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        self.i2c.transaction(address, operations)
    }
}

impl BusControl for MockBus {
    type Error = ErrorKind;

    fn start(&mut self, pins: Option<BusPins>) -> Result<(), ErrorKind> {
        self.starts.push(pins);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStore {
    files: Vec<(String, String)>,
}

impl ConfigStore for MemoryStore {
    fn exists(&mut self, path: &str) -> bool {
        self.files.iter().any(|(p, _)| p == path)
    }

    fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, StoreError> {
        let (_, text) = self
            .files
            .iter()
            .find(|(p, _)| p == path)
            .ok_or(StoreError::NotFound)?;
        buf.get_mut(..text.len())
            .ok_or(StoreError::BufferTooSmall)?
            .copy_from_slice(text.as_bytes());
        Ok(text.len())
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        let text = String::from_utf8(data.to_vec()).map_err(|_| StoreError::Io)?;
        self.files.retain(|(p, _)| p != path);
        self.files.push((path.to_string(), text));
        Ok(())
    }
}

fn bme280_init() -> Vec<Transaction> {
    let words: [i32; 12] = [
        27504, 26435, -1000, 36477, -10685, 3024, 2855, 140, -7, 15500, -14600, 6000,
    ];
    let mut block_1: Vec<u8> = words.iter().flat_map(|w| (*w as u16).to_le_bytes()).collect();
    block_1.extend([0x00, 75]);
    let [h2_lo, h2_hi] = 362i16.to_le_bytes();
    let block_2 = vec![h2_lo, h2_hi, 0, 0x14, 0x21, 0x03, 30];

    vec![
        Transaction::write_read(BME, vec![0xD0], vec![0x60]),
        Transaction::write(BME, vec![0xE0, 0xB6]),
        Transaction::write_read(BME, vec![0xF3], vec![0x00]),
        Transaction::write_read(BME, vec![0x88], block_1),
        Transaction::write_read(BME, vec![0xE1], block_2),
        Transaction::write(BME, vec![0xF2, 0x01]),
        Transaction::write(BME, vec![0xF5, 0xA0]),
        Transaction::write(BME, vec![0xF4, 0x27]),
    ]
}

fn ens160_init() -> Vec<Transaction> {
    vec![
        Transaction::write_read(ENS, vec![0x00], vec![0x60, 0x01]),
        Transaction::write(ENS, vec![0x10, 0xF0]),
        Transaction::write(ENS, vec![0x10, 0x01]),
        Transaction::write(ENS, vec![0x12, 0x00]),
        Transaction::write(ENS, vec![0x12, 0xCC]),
        Transaction::write(ENS, vec![0x10, 0x02]),
    ]
}

/// adc_P = 415148, adc_T = 519888, adc_H = 30000
fn bme280_burst() -> Transaction {
    Transaction::write_read(
        BME,
        vec![0xF7],
        vec![0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x75, 0x30],
    )
}

#[test]
fn startup_and_measurement_cycle() {
    let mut expectations = bme280_init();
    expectations.extend(ens160_init());
    expectations.extend([
        Transaction::write_read(ENS, vec![0x20], vec![0x83]),
        bme280_burst(),
        bme280_burst(),
        // 25.08 C -> 0x4A8E, 52.148 %RH -> 0x684C
        Transaction::write(ENS, vec![0x13, 0x8E, 0x4A, 0x4C, 0x68]),
        Transaction::write_read(ENS, vec![0x21], vec![0x02]),
        Transaction::write_read(ENS, vec![0x22], vec![0x78, 0x00]),
        Transaction::write_read(ENS, vec![0x24], vec![0xC2, 0x01]),
        bme280_burst(),
    ]);

    let bus = RefCell::new(MockBus::new(&expectations));
    let mut sensor = VocSensorBuilder::new("Air")
        .pins(4, 5)
        .build(&bus, MemoryStore::default(), NoopDelay::new())
        .unwrap();

    assert!(sensor.begin());
    assert_eq!(sensor.state(), DeviceState::Ready);
    assert!(sensor.take_measurement());

    let values = sensor.values();
    assert_eq!(values[0], 2.0);
    assert_eq!(values[1], 120.0);
    assert_eq!(values[2], 450.0);
    assert!((values[3] - 25.08).abs() < 1e-4);
    assert!((values[4] - 52.148_437).abs() < 1e-4);
    assert!((values[5] - 1006.53).abs() < 1e-3);
    assert!(values[6] > 50.0 && values[6] < 62.0);

    let stored = sensor.store().files[0].clone();
    assert_eq!(stored.0, "/settings/sen/DFVOC.json");
    assert_eq!(stored.1, r#"{"Name":"Air","pressureSeaLevel":1013.25}"#);

    drop(sensor);
    let mut bus = bus.into_inner();
    assert_eq!(bus.starts, [Some(BusPins { sda: 4, scl: 5 })]);
    bus.i2c.done();
}

#[test]
fn warming_up_stops_after_status_read() {
    let mut expectations = bme280_init();
    expectations.extend(ens160_init());
    // Validity flag 1: warm-up
    expectations.push(Transaction::write_read(ENS, vec![0x20], vec![0x04]));

    let bus = RefCell::new(MockBus::new(&expectations));
    let mut sensor = VocSensorBuilder::new("Air")
        .build(&bus, MemoryStore::default(), NoopDelay::new())
        .unwrap();

    assert!(sensor.begin());
    assert!(!sensor.take_measurement());
    assert!(sensor.values().iter().all(|v| *v == 0.0));

    drop(sensor);
    bus.into_inner().i2c.done();
}

#[test]
fn missing_bme280_fails_startup() {
    let expectations = [Transaction::write_read(BME, vec![0xD0], vec![0x00]).with_error(ErrorKind::Other)];

    let bus = RefCell::new(MockBus::new(&expectations));
    let mut sensor = VocSensorBuilder::new("Air")
        .build(&bus, MemoryStore::default(), NoopDelay::new())
        .unwrap();

    assert!(!sensor.begin());
    assert_eq!(sensor.state(), DeviceState::Failed);
    // No further bus traffic once startup failed
    assert!(!sensor.take_measurement());

    drop(sensor);
    bus.into_inner().i2c.done();
}
