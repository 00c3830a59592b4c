//! Device support for DS18x20 type temperature sensors.
//!
//! The driver borrows the bus per operation; many devices share one bus, so
//! nothing here holds it. Conversions come in two shapes:
//!
//! * [`Ds18x20::measure`] blocks for the resolution's worst-case conversion
//!   time and returns the reading;
//! * [`Ds18x20::read_temperature`] is the non-blocking poll form: the first
//!   call starts a conversion and records its completion deadline, later
//!   calls return `Ok(None)` without touching the bus until the deadline has
//!   elapsed, then read and return the result. Starting a new conversion
//!   abandons an in-flight one; no cleanup is needed.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use fixed::types::I12F4;
use onewire_bus::{OneWire, OneWireCrc, OneWireError, OneWireResult, Rom};
use onewire_devices::{Device, DeviceParams, Registry};

/// Temperature in sixteenths of a degree Celsius.
pub type Temperature = I12F4;

/// Family code shared by the DS18B20 and its pin-compatible siblings.
pub const FAMILY: u8 = 0x28;

/// Measurement resolution, as stored in the scratchpad configuration byte.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 9-bit, 0.5 °C steps
    Bits9 = 0x1f,
    /// 10-bit, 0.25 °C steps
    Bits10 = 0x3f,
    /// 11-bit, 0.125 °C steps
    Bits11 = 0x5f,
    /// 12-bit, 0.0625 °C steps
    Bits12 = 0x7f,
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Bits12
    }
}

impl Resolution {
    /// Maps a bit count (9-12) to its resolution.
    pub fn from_bits(bits: u8) -> Option<Self> {
        use Resolution::*;
        match bits {
            9 => Some(Bits9),
            10 => Some(Bits10),
            11 => Some(Bits11),
            12 => Some(Bits12),
            _ => None,
        }
    }

    /// The bit count.
    pub fn bits(&self) -> u8 {
        use Resolution::*;
        match self {
            Bits9 => 9,
            Bits10 => 10,
            Bits11 => 11,
            Bits12 => 12,
        }
    }

    /// Worst-case conversion time at this resolution.
    pub fn conversion_time_us(&self) -> u32 {
        use Resolution::*;
        match self {
            Bits9 => 93750,
            Bits10 => 187500,
            Bits11 => 375000,
            Bits12 => 750000,
        }
    }
}

impl TryFrom<u8> for Resolution {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Resolution::*;
        match value {
            0x1f => Ok(Bits9),
            0x3f => Ok(Bits10),
            0x5f => Ok(Bits11),
            0x7f => Ok(Bits12),
            _ => Err("Invalid configuration byte"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Idle,
    Converting { deadline: Instant },
}

/// A DS18x20 temperature sensor on a 1-Wire bus.
#[derive(Debug)]
pub struct Ds18x20 {
    rom: Rom,
    resolution: Resolution,
    state: Conversion,
}

impl Ds18x20 {
    /// Creates a sensor handle for `rom` at the default 12-bit resolution.
    pub fn new(rom: Rom) -> Self {
        Self {
            rom,
            resolution: Resolution::default(),
            state: Conversion::Idle,
        }
    }

    /// Sets the resolution the driver times conversions for and writes with
    /// [`configure`](Ds18x20::configure).
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// The configured resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Writes the alarm thresholds and the resolution to the scratchpad.
    ///
    /// The settings are volatile until copied with
    /// [`copy_scratchpad`](Ds18x20::copy_scratchpad).
    pub fn configure<O: OneWire>(
        &self,
        bus: &mut O,
        low: i8,
        high: i8,
    ) -> OneWireResult<(), O::BusError> {
        self.select(bus)?;
        bus.write_byte(DS18X20_WRITE_SCRATCH)?;
        bus.write_block(&[high as u8, low as u8, self.resolution as u8])
    }

    /// Copies the scratchpad configuration into the device EEPROM.
    pub fn copy_scratchpad<O: OneWire>(&self, bus: &mut O) -> OneWireResult<(), O::BusError> {
        self.select(bus)?;
        bus.write_byte(DS18X20_COPY_SCRATCH)
    }

    /// Reads the 8 scratchpad bytes, validating the trailing CRC-8.
    ///
    /// # Errors
    /// [`OneWireError::InvalidCrc`] when the ninth byte does not check out;
    /// the partial data is discarded.
    pub fn read_scratchpad<O: OneWire>(&self, bus: &mut O) -> OneWireResult<[u8; 8], O::BusError> {
        self.select(bus)?;
        bus.write_byte(DS18X20_READ_SCRATCH)?;
        let mut buf = [0u8; 9];
        bus.read_block(&mut buf)?;
        if !OneWireCrc::validate(&buf) {
            return Err(OneWireError::InvalidCrc);
        }
        let mut scratchpad = [0u8; 8];
        scratchpad.copy_from_slice(&buf[..8]);
        Ok(scratchpad)
    }

    /// Starts a temperature conversion and records its completion deadline,
    /// returning immediately. An in-flight conversion is abandoned.
    pub fn start_conversion<O: OneWire>(&mut self, bus: &mut O) -> OneWireResult<(), O::BusError> {
        self.select(bus)?;
        bus.write_byte(DS18X20_START_CONV)?;
        self.state = Conversion::Converting {
            deadline: Instant::now()
                + Duration::from_micros(self.resolution.conversion_time_us() as u64),
        };
        Ok(())
    }

    /// Non-blocking temperature read.
    ///
    /// When idle, starts a conversion and returns `Ok(None)`. While the
    /// conversion deadline has not elapsed, returns `Ok(None)` without any
    /// bus traffic. Once it has, reads the scratchpad and returns the
    /// temperature, going back to idle.
    pub fn read_temperature<O: OneWire>(
        &mut self,
        bus: &mut O,
    ) -> OneWireResult<Option<Temperature>, O::BusError> {
        match self.state {
            Conversion::Idle => {
                self.start_conversion(bus)?;
                Ok(None)
            }
            Conversion::Converting { deadline } => {
                if Instant::now() < deadline {
                    return Ok(None);
                }
                self.state = Conversion::Idle;
                let scratchpad = self.read_scratchpad(bus)?;
                Ok(Some(Temperature::from_le_bytes([
                    scratchpad[0],
                    scratchpad[1],
                ])))
            }
        }
    }

    /// Blocking temperature read: convert, wait out the resolution's
    /// conversion time, read the scratchpad.
    pub fn measure<O: OneWire, D: DelayNs>(
        &mut self,
        bus: &mut O,
        delay: &mut D,
    ) -> OneWireResult<Temperature, O::BusError> {
        self.start_conversion(bus)?;
        delay.delay_us(self.resolution.conversion_time_us());
        self.state = Conversion::Idle;
        let scratchpad = self.read_scratchpad(bus)?;
        Ok(Temperature::from_le_bytes([scratchpad[0], scratchpad[1]]))
    }
}

impl Device for Ds18x20 {
    fn rom(&self) -> Rom {
        self.rom
    }

    fn description(&self) -> &str {
        "DS18x20 (0x28) temperature sensor"
    }
}

/// Starts a conversion on every device on the bus at once (Skip-ROM) and
/// blocks for the worst-case conversion time of `resolution`.
pub fn convert_all<O: OneWire, D: DelayNs>(
    bus: &mut O,
    delay: &mut D,
    resolution: Resolution,
) -> OneWireResult<(), O::BusError> {
    bus.address(None)?;
    bus.write_byte(DS18X20_START_CONV)?;
    delay.delay_us(resolution.conversion_time_us());
    Ok(())
}

/// Installs this driver's constructor in `registry` for [`FAMILY`].
pub fn register(registry: &mut Registry) {
    registry.register(FAMILY, construct);
}

fn construct(rom: Rom, params: &DeviceParams) -> Box<dyn Device> {
    let mut device = Ds18x20::new(rom);
    if let Some(resolution) = params.resolution.and_then(Resolution::from_bits) {
        device = device.with_resolution(resolution);
    }
    Box::new(device)
}

const DS18X20_START_CONV: u8 = 0x44;
const DS18X20_READ_SCRATCH: u8 = 0xbe;
const DS18X20_WRITE_SCRATCH: u8 = 0x4e;
const DS18X20_COPY_SCRATCH: u8 = 0x48;
