use onewire_bus::{OneWire, OneWireResult, Rom};

use crate::hex_spaced;

/// Best-effort description for the device families this workspace knows
/// about, whether or not a driver is registered for them.
pub fn family_description(family: u8) -> &'static str {
    match family {
        0x10 => "DS18S20 temperature sensor",
        0x1d => "DS2423 4kb RAM and counter",
        0x22 => "DS1822 temperature sensor",
        0x26 => "DS2438 battery gauge",
        0x28 => "DS18B20 temperature sensor",
        0x29 => "DS2408 8-bit I/O port",
        0x3a => "DS2413 2-bit I/O port",
        0x42 => "DS28EA00 temperature sensor",
        _ => "unrecognized device",
    }
}

/// Identity snapshot of a bus participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// The device's ROM code.
    pub rom: Rom,
    /// Family code (byte 0 of the ROM).
    pub family: u8,
    /// Human-readable serial: the full code as spaced upper-case hex.
    pub serial: String,
    /// Device type description.
    pub description: String,
}

/// Base contract for any addressable 1-Wire bus participant.
///
/// A device is an immutable ROM code plus whatever it re-reads from the
/// physical part on demand; it carries no other implicit hardware state.
/// Driver types add their own command sequences on top but never alter the
/// selection contract.
pub trait Device {
    /// The device's ROM code.
    fn rom(&self) -> Rom;

    /// Device type description.
    fn description(&self) -> &str;

    /// Identity snapshot: ROM, family, serial string, and description.
    fn info(&self) -> DeviceInfo {
        let rom = self.rom();
        DeviceInfo {
            rom,
            family: rom.family(),
            serial: hex_spaced(rom.as_bytes()),
            description: self.description().to_string(),
        }
    }

    /// Selects this device for the commands that follow: bus reset, then
    /// Match-ROM with this device's code. The selection holds until the next
    /// reset. Trait objects select through [`OneWire::address`] directly.
    fn select<O: OneWire>(&self, bus: &mut O) -> OneWireResult<(), O::BusError>
    where
        Self: Sized,
    {
        bus.address(Some(self.rom()))
    }
}

/// A device of a family with no registered driver, exposing only the base
/// contract.
#[derive(Debug, Clone)]
pub struct GenericDevice {
    rom: Rom,
}

impl GenericDevice {
    /// Wraps a validated ROM code.
    pub fn new(rom: Rom) -> Self {
        Self { rom }
    }
}

impl Device for GenericDevice {
    fn rom(&self) -> Rom {
        self.rom
    }

    fn description(&self) -> &str {
        family_description(self.rom.family())
    }
}
