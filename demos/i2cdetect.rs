//! I2C bus scan example
//!
//! Walks through all valid bus addresses and prints a table of the devices
//! which answered.
#![no_std]
#![no_main]

use avr8_hal::i2c::Direction;
use avr8_hal::prelude::*;
use panic_halt as _;

type CoreClock = avr8_hal::clock::MHz16;

/// Crude cycle-burning delay, good enough for bus settling.
struct BusyDelay;

impl avr8_hal::hal::blocking::delay::DelayMs<u16> for BusyDelay {
    fn delay_ms(&mut self, ms: u16) {
        for _ in 0..(ms as u32 * 1_600) {
            avr8_hal::avr_device::asm::nop();
        }
    }
}

#[avr8_hal::entry]
fn main() -> ! {
    let dp = avr8_hal::Peripherals::take().unwrap();
    let pins = avr8_hal::pins!(dp);

    let mut serial = avr8_hal::Usart0::<CoreClock>::new(
        dp.USART0,
        pins.pd0,
        pins.pd1.into_output(),
        57600.into_baudrate(),
    );

    let mut i2c = avr8_hal::I2c::<CoreClock>::new(
        dp.TWI,
        pins.pc4.into_pull_up_input(),
        pins.pc5.into_pull_up_input(),
        50_000,
    );

    ufmt::uwriteln!(&mut serial, "Write direction test:\r").void_unwrap();
    i2c.i2cdetect(&mut serial, &mut BusyDelay, Direction::Write)
        .void_unwrap();
    ufmt::uwriteln!(&mut serial, "\rRead direction test:\r").void_unwrap();
    i2c.i2cdetect(&mut serial, &mut BusyDelay, Direction::Read)
        .void_unwrap();

    loop {}
}
