//! # HAL for 8-bit AVR microcontrollers
//!
//! This crate provides a hardware abstraction layer for the classic 8-bit AVR
//! families (ATmega and ATtiny).  It is split into a generic, chip-independent
//! layer and a thin per-chip wiring layer:
//!
//! - Each peripheral module (`port`, `usart`, `spi`, `i2c`, `adc`, `eeprom`,
//!   `wdt`, `simple_pwm`) defines a low-level `*Ops` trait describing the raw
//!   register primitives of that peripheral kind, and a generic driver built
//!   on top of it which exposes a portable blocking API and implements the
//!   corresponding [`embedded-hal`] traits.
//! - The chip wiring modules (selected via cargo feature, e.g. `atmega328p`
//!   or `attiny85`) implement the `*Ops` traits against the register blocks
//!   from [`avr-device`] and provide the `Pins` struct plus pre-wired type
//!   aliases for each peripheral instance.
//!
//! Exactly one chip feature must be selected.  Application code should only
//! ever talk to the generic drivers and the `embedded-hal` traits, never to
//! the `*Ops` traits directly.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/0.2
//! [`avr-device`]: https://docs.rs/avr-device
#![cfg_attr(not(test), no_std)]

#[cfg(all(
    not(feature = "device-selected"),
    not(feature = "disable-device-selection-error")
))]
compile_error!(
    "This crate requires you to specify your target chip as a feature.

    Please select one of the following

    * atmega328p
    * attiny85
    "
);

/// Reexport of `atmega328p` from `avr-device`
#[cfg(feature = "atmega328p")]
pub use avr_device::atmega328p as pac;
/// Reexport of `attiny85` from `avr-device`
#[cfg(feature = "attiny85")]
pub use avr_device::attiny85 as pac;

/// See [`avr_device::entry`](https://docs.rs/avr-device/latest/avr_device/attr.entry.html).
#[cfg(feature = "rt")]
pub use avr_device::entry;

#[doc(hidden)]
pub use avr_device;
#[doc(hidden)]
pub use embedded_hal as hal;
#[doc(hidden)]
pub use nb;
#[doc(hidden)]
pub use paste;
#[doc(hidden)]
pub use ufmt;
#[doc(hidden)]
pub use void;

pub mod adc;
pub mod clock;
pub mod eeprom;
pub mod i2c;
pub mod port;
pub mod prelude;
pub mod simple_pwm;
pub mod spi;
pub mod usart;
pub mod wdt;

#[cfg(feature = "atmega328p")]
mod atmega328p;
#[cfg(feature = "atmega328p")]
pub use crate::atmega328p::*;

#[cfg(feature = "attiny85")]
mod attiny85;
#[cfg(feature = "attiny85")]
pub use crate::attiny85::*;

/// Marker type for HALs of the ATmega family.
///
/// The `*Ops` traits are implemented against a family marker so that generic
/// code can be bounded on the chip family where register semantics differ.
pub struct Atmega;

/// Marker type for HALs of the ATtiny family.
pub struct Attiny;

mod private {
    /// Super trait used to mark traits with an exhaustive set of
    /// implementations
    pub trait Sealed {}
}

pub(crate) use private::Sealed;
