use std::collections::BTreeMap;

use onewire_bus::Rom;

use crate::{AddressError, AddressInput, Device, GenericDevice};

/// Optional knobs forwarded to device constructors.
///
/// Drivers read the fields they understand and ignore the rest.
#[derive(Debug, Clone, Default)]
pub struct DeviceParams {
    /// Requested measurement resolution in bits, for devices that have one.
    pub resolution: Option<u8>,
}

/// Constructor producing a typed device for one family code.
pub type DeviceCtor = fn(Rom, &DeviceParams) -> Box<dyn Device>;

/// Mapping from family code to device constructor.
///
/// An explicit value owned by the process's initialization phase: each driver
/// crate exposes a `register` entry point that installs its constructor here
/// before any scanning starts, and the registry is only read afterwards. The
/// last registration for a family wins.
#[derive(Default)]
pub struct Registry {
    ctors: BTreeMap<u8, DeviceCtor>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `ctor` as the constructor for `family`, replacing any
    /// previous registration.
    pub fn register(&mut self, family: u8, ctor: DeviceCtor) {
        self.ctors.insert(family, ctor);
    }

    /// Whether a constructor is registered for `family`.
    pub fn contains(&self, family: u8) -> bool {
        self.ctors.contains_key(&family)
    }

    /// The registered family codes, ascending.
    pub fn families(&self) -> impl Iterator<Item = u8> + '_ {
        self.ctors.keys().copied()
    }

    /// Resolves a validated ROM code into a typed device, or into a
    /// [`GenericDevice`] when its family has no registered constructor.
    pub fn resolve(&self, rom: Rom, params: &DeviceParams) -> Box<dyn Device> {
        match self.ctors.get(&rom.family()) {
            Some(ctor) => ctor(rom, params),
            None => Box::new(GenericDevice::new(rom)),
        }
    }

    /// Normalizes any accepted address shape and resolves it in one step.
    pub fn define(
        &self,
        input: AddressInput<'_>,
        params: &DeviceParams,
    ) -> Result<Box<dyn Device>, AddressError> {
        Ok(self.resolve(input.normalize()?, params))
    }
}
