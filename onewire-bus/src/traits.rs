use crate::{ONEWIRE_MATCH_ROM_CMD, ONEWIRE_SKIP_ROM_CMD, OneWireError, OneWireResult, Rom};

/// Trait for 1-Wire bus masters.
///
/// Implementors supply the three bit-level primitives ([`reset`](OneWire::reset),
/// [`read_bit`](OneWire::read_bit) and [`write_bit`](OneWire::write_bit)), each
/// of which is atomic and blocking for the duration of one hardware-timed bus
/// time slot. The byte and block operations are provided on top of them,
/// assembling bytes least-significant bit first as the wire protocol requires;
/// masters with native byte slots may override them.
pub trait OneWire {
    /// The error type returned by the operations of this trait.
    /// This type is used to indicate errors in the underlying hardware or communication.
    type BusError;

    /// Resets the 1-Wire bus.
    ///
    /// # Returns
    /// `Ok(true)` if at least one device answered the reset with a presence
    /// pulse, `Ok(false)` if the bus is empty or faulted.
    ///
    /// # Errors
    /// This method returns an error if the reset operation fails.
    fn reset(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Reads a single bit from the 1-Wire bus.
    ///
    /// # Errors
    /// This method returns an error if the read operation fails.
    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Writes a single bit to the 1-Wire bus.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError>;

    /// Reads a byte from the 1-Wire bus, least-significant bit first.
    ///
    /// # Errors
    /// This method returns an error if the read operation fails.
    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        let mut value = 0;
        for i in 0..8 {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    /// Writes a byte to the 1-Wire bus, least-significant bit first.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    /// Fills `buf` with consecutive bytes read from the bus, in order.
    ///
    /// # Errors
    /// This method returns an error if any read operation fails.
    fn read_block(&mut self, buf: &mut [u8]) -> OneWireResult<(), Self::BusError> {
        for byte in buf.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(())
    }

    /// Writes the bytes of `data` to the bus, in order.
    ///
    /// # Errors
    /// This method returns an error if any write operation fails.
    fn write_block(&mut self, data: &[u8]) -> OneWireResult<(), Self::BusError> {
        for &byte in data {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Addresses devices on the 1-Wire bus.
    ///
    /// Resets the bus, then selects exactly one device with the Match-ROM
    /// command, or every device at once with Skip-ROM when `rom` is [`None`].
    /// The selection holds for all subsequent commands until the next reset.
    ///
    /// # Errors
    /// [`OneWireError::NoDevicePresent`] if the reset reports an empty bus.
    fn address(&mut self, rom: Option<Rom>) -> OneWireResult<(), Self::BusError> {
        if !self.reset()? {
            return Err(OneWireError::NoDevicePresent);
        }
        match rom {
            Some(rom) => {
                self.write_byte(ONEWIRE_MATCH_ROM_CMD)?;
                self.write_block(rom.as_bytes())
            }
            None => self.write_byte(ONEWIRE_SKIP_ROM_CMD),
        }
    }
}
