//! # onewire-devices
//! The device layer above [`onewire_bus`]: the base [`Device`] contract every
//! addressable bus participant exposes, the family-code [`Registry`] that
//! resolves discovered addresses into typed devices, tolerant
//! [`AddressInput`] normalization for externally supplied addresses, and
//! [`scan`] for enumerating a bus into reportable [`ScanRecord`]s.
//!
//! Discovery and checksum validation live in the bus crate; this crate adds
//! the policy around them: CRC-failed ROM codes are logged and excluded from
//! scan results, unknown family codes resolve to a [`GenericDevice`] rather
//! than an error, and malformed address text is a value the caller checks.

mod address;
mod device;
mod registry;
mod scan;

pub use address::{AddressError, AddressInput};
pub use device::{Device, DeviceInfo, GenericDevice, family_description};
pub use registry::{DeviceCtor, DeviceParams, Registry};
pub use scan::{ScanRecord, scan};

/// Upper-case, space-separated hex rendering shared by the device info and
/// scan record forms.
pub(crate) fn hex_spaced<'a>(bytes: impl IntoIterator<Item = &'a u8>) -> String {
    bytes
        .into_iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
