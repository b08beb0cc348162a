//! Serial echo example
//!
//! Sends a greeting over USART0 and then echoes back every received byte.
//! Receiver faults are reported instead of being silently dropped.
#![no_std]
#![no_main]

use avr8_hal::prelude::*;
use panic_halt as _;

type CoreClock = avr8_hal::clock::MHz16;

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

    ufmt::uwriteln!(&mut serial, "Hello from avr8-hal!\r").void_unwrap();

    loop {
        match serial.read_byte() {
            Ok(byte) => serial.write_byte(byte),
            Err(err) => {
                ufmt::uwriteln!(&mut serial, "rx error: {:?}\r", err).void_unwrap();
            }
        }
    }
}
