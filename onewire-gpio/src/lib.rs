#![no_std]
#![deny(missing_docs)]
//! # onewire-gpio
//! A bit-bang 1-Wire bus master driving a single open-drain GPIO pin.
//!
//! Implements the [`OneWire`] trait from [`onewire_bus`] over any pin pair of
//! [`OutputPin`] + [`InputPin`] and a [`DelayNs`] timer. The pin must be
//! configured open-drain (or open-drain-with-pullup) by the host layer:
//! driving low pulls the bus down, driving high releases it to the pullup,
//! and reads sample the released bus.
//!
//! Timings are the standard-speed slot set; overdrive is not supported.

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use onewire_bus::{OneWire, OneWireResult};

/// Standard-speed 1-Wire timing parameters, in microseconds.
///
/// The defaults are the conventional values for a 3.3 V/5 V bus with a
/// 4.7 kΩ pullup; the fields exist for buses with long cable runs or heavy
/// capacitive loading that need stretched slots.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Reset pulse low time.
    pub reset_low: u32,
    /// Spacing of the presence-detect samples after the reset release.
    pub presence_sample: u32,
    /// High recovery time after the presence-detect window.
    pub reset_recovery: u32,
    /// Full bit time slot.
    pub slot: u32,
    /// Low time opening a write-1 or read slot.
    pub write1_low: u32,
    /// Sample point after the falling edge of a read slot.
    pub sample: u32,
    /// Bus recovery time between slots.
    pub recovery: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            reset_low: 480,
            presence_sample: 30,
            reset_recovery: 360,
            slot: 65,
            write1_low: 4,
            sample: 12,
            recovery: 10,
        }
    }
}

/// A 1-Wire bus master bit-banging one open-drain GPIO pin.
///
/// Every trait operation is blocking for the duration of its hardware-timed
/// slot; the delay provider sets the resolution of that timing.
pub struct OneWireGpio<P, D> {
    pin: P,
    delay: D,
    timings: Timings,
}

impl<P, D> OneWireGpio<P, D> {
    /// Creates a new master over `pin` with the default standard-speed
    /// [`Timings`].
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            pin,
            delay,
            timings: Timings::default(),
        }
    }

    /// Replaces the timing parameters.
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Releases the pin and delay provider.
    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

impl<P: OutputPin + InputPin, D: DelayNs> OneWire for OneWireGpio<P, D> {
    type BusError = P::Error;

    fn reset(&mut self) -> OneWireResult<bool, Self::BusError> {
        let t = self.timings;
        self.pin.set_low()?;
        self.delay.delay_us(t.reset_low);
        self.pin.set_high()?;
        // Sample presence at 1x, 2x and 4x the base offset for robust
        // detection of slow responders.
        self.delay.delay_us(t.presence_sample);
        let mut found = self.pin.is_low()?;
        self.delay.delay_us(t.presence_sample);
        found |= self.pin.is_low()?;
        self.delay.delay_us(t.presence_sample << 1);
        found |= self.pin.is_low()?;
        self.delay.delay_us(t.reset_recovery);
        Ok(found)
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
        let t = self.timings;
        self.pin.set_low()?;
        self.delay.delay_us(t.write1_low);
        self.pin.set_high()?;
        self.delay.delay_us(t.sample - t.write1_low);
        let bit = self.pin.is_high()?;
        self.delay.delay_us(t.slot - t.sample);
        self.delay.delay_us(t.recovery);
        Ok(bit)
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
        let t = self.timings;
        self.pin.set_low()?;
        if bit {
            // Release early; devices sample after the leading edge.
            self.delay.delay_us(t.write1_low);
            self.pin.set_high()?;
            self.delay.delay_us(t.slot - t.write1_low);
        } else {
            // Hold low for the whole slot.
            self.delay.delay_us(t.slot);
            self.pin.set_high()?;
        }
        self.delay.delay_us(t.recovery);
        Ok(())
    }
}
