use std::fmt;

use onewire_bus::Rom;

use crate::ScanRecord;

/// The closed set of shapes an externally supplied device address may take,
/// each normalized to the canonical 8-byte ROM code.
#[derive(Debug, Clone, Copy)]
pub enum AddressInput<'a> {
    /// A raw 8-byte ROM code, used verbatim.
    Bytes([u8; 8]),
    /// Hex text, tolerant of space and hyphen separators: 14 digits name a
    /// bare family + serial and get the computed CRC-8 appended; 16 digits
    /// are a full code taken as-is.
    Text(&'a str),
    /// A record produced by a bus scan.
    Discovery(&'a ScanRecord),
}

/// Failure to normalize an [`AddressInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    /// The text held this many hex digits; only 14 or 16 are addressable.
    BadLength(usize),
    /// A character that is neither a hex digit nor a separator.
    BadDigit(char),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::BadLength(n) => {
                write!(f, "expected 14 or 16 hex digits, found {n}")
            }
            AddressError::BadDigit(c) => write!(f, "invalid hex digit {c:?}"),
        }
    }
}

impl std::error::Error for AddressError {}

impl AddressInput<'_> {
    /// Normalizes the input to a ROM code.
    ///
    /// Normalization does not require the CRC to be valid (a caller may
    /// deliberately address a device whose code it could not validate), but
    /// the 14-digit text form always produces a valid code by construction.
    pub fn normalize(&self) -> Result<Rom, AddressError> {
        match self {
            AddressInput::Bytes(bytes) => Ok(Rom::new(*bytes)),
            AddressInput::Discovery(record) => Ok(record.rom),
            AddressInput::Text(text) => parse_text(text),
        }
    }
}

fn parse_text(text: &str) -> Result<Rom, AddressError> {
    let mut digits = Vec::with_capacity(16);
    for ch in text.chars() {
        match ch {
            ' ' | '-' => continue,
            _ => digits.push(ch.to_digit(16).ok_or(AddressError::BadDigit(ch))? as u8),
        }
    }
    let mut bytes = [0u8; 8];
    for (byte, pair) in bytes.iter_mut().zip(digits.chunks_exact(2)) {
        *byte = pair[0] << 4 | pair[1];
    }
    match digits.len() {
        14 => {
            let mut partial = [0u8; 7];
            partial.copy_from_slice(&bytes[..7]);
            Ok(Rom::from_serial(partial))
        }
        16 => Ok(Rom::new(bytes)),
        n => Err(AddressError::BadLength(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onewire_bus::OneWireCrc;

    #[test]
    fn bare_serial_gets_its_crc() {
        let rom = AddressInput::Text("28-0000061ca2f1").normalize().unwrap();
        assert_eq!(rom.family(), 0x28);
        assert!(rom.is_valid());
        assert_eq!(rom.to_string(), "28-0000061ca2f1");
    }

    #[test]
    fn full_code_is_taken_verbatim() {
        let crc = OneWireCrc::compute(&[0x28, 0x00, 0x00, 0x06, 0x1c, 0xa2, 0xf1]);
        let text = format!("28 00 00 06 1C A2 F1 {crc:02X}");
        let rom = AddressInput::Text(&text).normalize().unwrap();
        assert!(rom.is_valid());
        assert_eq!(rom.crc(), crc);

        // Verbatim means an invalid trailing byte is preserved, not repaired.
        let bad = format!("28 00 00 06 1C A2 F1 {:02X}", crc ^ 0xff);
        assert!(!AddressInput::Text(&bad).normalize().unwrap().is_valid());
    }

    #[test]
    fn raw_bytes_pass_through() {
        let rom = Rom::from_serial([0x3a, 9, 8, 7, 6, 5, 4]);
        assert_eq!(
            AddressInput::Bytes(*rom.as_bytes()).normalize().unwrap(),
            rom
        );
    }

    #[test]
    fn rejects_wrong_lengths_and_junk() {
        assert_eq!(
            AddressInput::Text("28-00").normalize(),
            Err(AddressError::BadLength(4))
        );
        assert_eq!(
            AddressInput::Text("28-0000061cg2f1").normalize(),
            Err(AddressError::BadDigit('g'))
        );
        assert_eq!(
            AddressInput::Text("").normalize(),
            Err(AddressError::BadLength(0))
        );
    }
}
