use crate::{
    ONEWIRE_CONDITIONAL_SEARCH_CMD, ONEWIRE_SEARCH_CMD, OneWire, OneWireError, OneWireResult, Rom,
};

/// A structure for searching devices on a 1-Wire bus.
///
/// Implements the ROM-search algorithm for discovering devices on the bus,
/// maintaining the resumable state of the binary-tree traversal between
/// passes: the ROM produced by the previous pass and the bit position of the
/// most significant branch still left to explore.
pub struct OneWireSearch<'a, T> {
    onewire: &'a mut T,
    cmd: u8,
    last_device: bool,
    last_discrepancy: u8,
    family: u8,
    rom: [u8; 8],
}

#[repr(u8)]
/// Type of search performed using [`OneWireSearch`].
pub enum OneWireSearchKind {
    /// Normal search, enumerating every device
    Normal = ONEWIRE_SEARCH_CMD,
    /// Search only for devices in alarm state
    Alarmed = ONEWIRE_CONDITIONAL_SEARCH_CMD,
}

impl<'a, T> OneWireSearch<'a, T> {
    /// Creates a new [`OneWireSearch`] instance.
    ///
    /// # Arguments
    /// * `onewire` - A mutable reference to a type that implements the [`OneWire`] trait.
    /// * `cmd` - The kind of search to perform.
    pub fn new(onewire: &'a mut T, cmd: OneWireSearchKind) -> Self {
        Self {
            onewire,
            cmd: cmd as _,
            last_device: false,
            last_discrepancy: 0,
            family: 0,
            rom: [0; 8],
        }
    }

    /// Creates a new [`OneWireSearch`] instance restricted to one family code.
    ///
    /// The ROM is seeded with the family code and the discrepancy marker is
    /// forced past the last bit, so the first pass resolves every collision
    /// toward the seeded ROM and the traversal stays inside that family's
    /// subtree of the address space.
    pub fn with_family(onewire: &'a mut T, cmd: OneWireSearchKind, family: u8) -> Self {
        let rom = [family, 0, 0, 0, 0, 0, 0, 0];
        Self {
            onewire,
            cmd: cmd as _,
            last_device: false,
            last_discrepancy: 64,
            family,
            rom,
        }
    }

    /// Resets the search state.
    fn reset(&mut self) {
        self.last_device = false;
        self.last_discrepancy = if self.family != 0 { 64 } else { 0 };
        self.rom = [self.family, 0, 0, 0, 0, 0, 0, 0];
    }
}

impl<T: OneWire> OneWireSearch<'_, T> {
    /// Runs one discovery pass, producing the next ROM code on the bus.
    ///
    /// This method implements the [1-Wire search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html)
    /// and can be called repeatedly to enumerate the bus; once every branch of
    /// the address tree has been visited it returns `None`. For a stable
    /// device population the enumeration is deterministic: repeated full
    /// scans yield the same ROM codes in the same order, in at most one pass
    /// per device.
    ///
    /// The produced ROM is **not** CRC-checked here: codes that fail
    /// [`Rom::is_valid`] are still reported so the caller can log and skip
    /// them rather than lose them silently.
    ///
    /// # Errors
    /// [`OneWireError::NoDevicePresent`] if the reset preceding the pass sees
    /// no presence pulse.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> OneWireResult<Option<Rom>, T::BusError> {
        if self.last_device {
            return Ok(None);
        }
        if !self.onewire.reset()? {
            return Err(OneWireError::NoDevicePresent);
        }
        self.onewire.write_byte(self.cmd)?;
        let mut id_bit_num: u8 = 1;
        let mut last_zero: u8 = 0;
        let mut idx: usize = 0; // Index in the ROM array
        let mut rom_mask: u8 = 1; // Mask for the current bit in the ROM byte
        loop {
            let id_bit = self.onewire.read_bit()?;
            let complement_bit = self.onewire.read_bit()?;
            if id_bit && complement_bit {
                // No device answered this time slot; the pass is void.
                return Ok(None);
            }
            let set = if id_bit != complement_bit {
                // Every responding device agrees on this bit.
                id_bit
            } else {
                // Collision: both bit populations exist. Follow the previous
                // branch below the old discrepancy, take the 1-branch at it,
                // default to the 0-branch past it, remembering the deepest
                // 0-choice as the branch point for the next pass.
                let dir = if id_bit_num < self.last_discrepancy {
                    self.rom[idx] & rom_mask > 0
                } else {
                    id_bit_num == self.last_discrepancy
                };
                if !dir {
                    last_zero = id_bit_num;
                }
                dir
            };
            if set {
                self.rom[idx] |= rom_mask;
            } else {
                self.rom[idx] &= !rom_mask;
            }
            // Devices whose own bit does not match drop out of the pass.
            self.onewire.write_bit(set)?;

            id_bit_num += 1;
            rom_mask <<= 1;
            if rom_mask == 0 {
                idx += 1;
                rom_mask = 1;
            }
            if id_bit_num > 64 {
                self.last_discrepancy = last_zero;
                self.last_device = self.last_discrepancy == 0;
                break;
            }
        }

        if self.rom[0] == 0 {
            return Ok(None);
        }
        if self.family != 0 && self.rom[0] != self.family {
            // Walked out of the seeded family's subtree: no more of them.
            return Ok(None);
        }
        Ok(Some(Rom::new(self.rom)))
    }

    /// Verifies if the device with the given ROM code is present on the bus.
    ///
    /// Runs a single targeted pass with every collision forced toward `rom`;
    /// the pass reproduces `rom` exactly if, and only if, that device is
    /// still responding. The search state is reset afterwards, so calling
    /// [`next`](OneWireSearch::next) after this starts a fresh enumeration.
    pub fn verify(&mut self, rom: Rom) -> OneWireResult<bool, T::BusError> {
        self.last_device = false;
        self.rom = *rom.as_bytes();
        self.last_discrepancy = 64;
        let res = self.next();
        self.reset();
        Ok(res? == Some(rom))
    }
}
