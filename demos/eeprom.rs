//! EEPROM boot counter example
//!
//! Increments a counter in the first EEPROM cell on every reset and prints
//! it over the serial link.
#![no_std]
#![no_main]

use avr8_hal::prelude::*;
use panic_halt as _;

type CoreClock = avr8_hal::clock::MHz16;

const BOOT_COUNT_OFFSET: u16 = 0;

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

    let mut eeprom = avr8_hal::Eeprom::new(dp.EEPROM);

    let boot_count = eeprom.read_byte(BOOT_COUNT_OFFSET).wrapping_add(1);
    eeprom.write_byte(BOOT_COUNT_OFFSET, boot_count);

    ufmt::uwriteln!(
        &mut serial,
        "boot #{} (capacity {} bytes)\r",
        boot_count,
        eeprom.capacity()
    )
    .void_unwrap();

    loop {}
}
