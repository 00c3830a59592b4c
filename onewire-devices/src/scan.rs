use onewire_bus::{
    OneWire, OneWireError, OneWireResult, OneWireSearch, OneWireSearchKind, Rom,
};

use crate::hex_spaced;

/// One discovered, CRC-valid address with its common text renderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    /// Family code (byte 0 of the ROM).
    pub family: u8,
    /// The raw ROM code.
    pub rom: Rom,
    /// Upper-case, space-separated hex, transmission order.
    pub hex: String,
    /// Compact upper-case hex.
    pub hex_compact: String,
    /// Hyphenated lower-case `family-serial` name, as the Linux w1 subsystem
    /// names its device directories.
    pub w1_name: String,
    /// Space-separated hex in reversed byte order.
    pub hex_reversed: String,
}

impl ScanRecord {
    /// Builds the record and its renderings for a discovered ROM code.
    pub fn new(rom: Rom) -> Self {
        Self {
            family: rom.family(),
            rom,
            hex: hex_spaced(rom.as_bytes()),
            hex_compact: format!("{rom:X}"),
            w1_name: rom.to_string(),
            hex_reversed: hex_spaced(rom.as_bytes().iter().rev()),
        }
    }
}

/// Scans the bus for devices present and returns their addresses in
/// discovery order.
///
/// Drives the ROM search to exhaustion. Codes that fail their CRC-8 are
/// logged at `warn` and excluded from the result; a missing presence pulse
/// ends the scan with whatever was found up to that point, an empty result on
/// the first pass. Repeated scans of an unchanged bus return the same records
/// in the same order.
pub fn scan<O: OneWire>(bus: &mut O) -> OneWireResult<Vec<ScanRecord>, O::BusError> {
    let mut found = Vec::new();
    let mut search = OneWireSearch::new(bus, OneWireSearchKind::Normal);
    loop {
        match search.next() {
            Ok(Some(rom)) if rom.is_valid() => found.push(ScanRecord::new(rom)),
            Ok(Some(rom)) => log::warn!("ROM [{rom:x}] failed CRC check, device ignored"),
            Ok(None) => break,
            Err(OneWireError::NoDevicePresent) => {
                log::debug!("no presence pulse; scan ends with {} device(s)", found.len());
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use onewire_bus::ONEWIRE_SEARCH_CMD;
    use std::convert::Infallible;

    /// Minimal wired-AND bus simulation, enough to drive the ROM search.
    struct SimBus {
        devices: Vec<[u8; 8]>,
        active: Vec<bool>,
        cmd_bits: u8,
        cmd: u8,
        bit: u8,
        phase: u8,
        searching: bool,
    }

    impl SimBus {
        fn new(devices: Vec<[u8; 8]>) -> Self {
            let active = vec![true; devices.len()];
            Self {
                devices,
                active,
                cmd_bits: 0,
                cmd: 0,
                bit: 0,
                phase: 0,
                searching: false,
            }
        }

        fn device_bit(rom: &[u8; 8], bit: u8) -> bool {
            rom[(bit / 8) as usize] & (1 << (bit % 8)) != 0
        }

        fn wired_and(&self, invert: bool) -> bool {
            self.devices
                .iter()
                .zip(&self.active)
                .filter(|(_, active)| **active)
                .all(|(rom, _)| Self::device_bit(rom, self.bit) != invert)
        }
    }

    impl OneWire for SimBus {
        type BusError = Infallible;

        fn reset(&mut self) -> OneWireResult<bool, Self::BusError> {
            self.active.iter_mut().for_each(|a| *a = true);
            self.cmd_bits = 0;
            self.cmd = 0;
            self.searching = false;
            Ok(!self.devices.is_empty())
        }

        fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
            if !self.searching {
                return Ok(true);
            }
            let value = self.wired_and(self.phase == 1);
            self.phase += 1;
            Ok(value)
        }

        fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
            if self.searching {
                for (rom, active) in self.devices.iter().zip(self.active.iter_mut()) {
                    if *active && Self::device_bit(rom, self.bit) != bit {
                        *active = false;
                    }
                }
                self.bit += 1;
                self.phase = 0;
                if self.bit == 64 {
                    self.searching = false;
                }
            } else if self.cmd_bits < 8 {
                if bit {
                    self.cmd |= 1 << self.cmd_bits;
                }
                self.cmd_bits += 1;
                if self.cmd_bits == 8 && self.cmd == ONEWIRE_SEARCH_CMD {
                    self.searching = true;
                    self.bit = 0;
                    self.phase = 0;
                }
            }
            Ok(())
        }
    }

    fn rom(family: u8, serial: [u8; 6]) -> [u8; 8] {
        let mut partial = [0u8; 7];
        partial[0] = family;
        partial[1..].copy_from_slice(&serial);
        *Rom::from_serial(partial).as_bytes()
    }

    #[test]
    fn scan_reports_valid_devices_with_all_renderings() {
        let dev = rom(0x28, [0x00, 0x00, 0x06, 0x1c, 0xa2, 0xf1]);
        let crc = dev[7];
        let mut bus = SimBus::new(vec![dev]);
        let records = scan(&mut bus).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.family, 0x28);
        assert_eq!(record.rom, Rom::new(dev));
        assert_eq!(record.hex, format!("28 00 00 06 1C A2 F1 {crc:02X}"));
        assert_eq!(record.hex_compact, format!("280000061CA2F1{crc:02X}"));
        assert_eq!(record.w1_name, "28-0000061ca2f1");
        assert_eq!(record.hex_reversed, format!("{crc:02X} F1 A2 1C 06 00 00 28"));
    }

    #[test]
    fn scan_excludes_corrupted_codes_but_keeps_valid_ones() {
        let good = rom(0x28, [1, 2, 3, 4, 5, 6]);
        let mut bad = rom(0x10, [6, 5, 4, 3, 2, 1]);
        bad[7] ^= 0x55; // trailing byte no longer the CRC
        let mut bus = SimBus::new(vec![good, bad]);
        let records = scan(&mut bus).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rom, Rom::new(good));
    }

    #[test]
    fn scan_of_an_empty_bus_is_empty() {
        let mut bus = SimBus::new(Vec::new());
        assert!(scan(&mut bus).unwrap().is_empty());
    }

    #[test]
    fn repeated_scans_are_identical() {
        let devices = vec![
            rom(0x28, [1, 2, 3, 4, 5, 6]),
            rom(0x3a, [0, 0, 0, 0, 0, 1]),
            rom(0x28, [1, 2, 3, 4, 5, 7]),
        ];
        let first = scan(&mut SimBus::new(devices.clone())).unwrap();
        let second = scan(&mut SimBus::new(devices)).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }
}
