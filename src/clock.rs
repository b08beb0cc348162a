//! Core clock speed management
//!
//! AVR chips run from a fixed clock source selected by fuse settings, so the
//! core clock speed is known at build time.  Peripheral drivers need this
//! speed to derive timing parameters (baud rates, bit rates, conversion
//! clocks) and track it as a compile-time constant so all divisor math can be
//! done by the compiler.
//!
//! Define one alias for the speed your board actually runs at and build the
//! driver type aliases on top of it:
//!
//! ```ignore
//! type CoreClock = avr8_hal::clock::MHz16;
//! type Usart0 = avr8_hal::Usart0<CoreClock>;
//! ```

/// A clock speed
pub trait Clock {
    /// Frequency of this clock in Hz
    const FREQ: u32;
}

/// 20 MHz Clock
#[derive(ufmt::derive::uDebug, Debug)]
pub struct MHz20;
impl Clock for MHz20 {
    const FREQ: u32 = 20_000_000;
}

/// 16 MHz Clock
#[derive(ufmt::derive::uDebug, Debug)]
pub struct MHz16;
impl Clock for MHz16 {
    const FREQ: u32 = 16_000_000;
}

/// 12 MHz Clock
#[derive(ufmt::derive::uDebug, Debug)]
pub struct MHz12;
impl Clock for MHz12 {
    const FREQ: u32 = 12_000_000;
}

/// 10 MHz Clock
#[derive(ufmt::derive::uDebug, Debug)]
pub struct MHz10;
impl Clock for MHz10 {
    const FREQ: u32 = 10_000_000;
}

/// 8 MHz Clock
#[derive(ufmt::derive::uDebug, Debug)]
pub struct MHz8;
impl Clock for MHz8 {
    const FREQ: u32 = 8_000_000;
}

/// 1 MHz Clock
#[derive(ufmt::derive::uDebug, Debug)]
pub struct MHz1;
impl Clock for MHz1 {
    const FREQ: u32 = 1_000_000;
}
