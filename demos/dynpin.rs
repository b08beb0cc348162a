//! Dynamic pin example
//!
//! Shows both levels of type erasure: `downgrade()` keeps the mode in the
//! type, `into_dynamic()` erases it entirely and makes operations fallible.
#![no_std]
#![no_main]

use avr8_hal::port::mode;
use avr8_hal::prelude::*;
use panic_halt as _;

fn busy_wait(count: u32) {
    for _ in 0..count {
        avr8_hal::avr_device::asm::nop();
    }
}

#[avr8_hal::entry]
fn main() -> ! {
    let dp = avr8_hal::Peripherals::take().unwrap();
    let pins = avr8_hal::pins!(dp);

    // Identity erased, mode still typed: infallible operations.
    let mut row: [avr8_hal::Pin<mode::Output>; 3] = [
        pins.pd2.into_output().downgrade(),
        pins.pd3.into_output().downgrade(),
        pins.pd4.into_output().downgrade(),
    ];

    // Mode erased as well: operations are checked at run-time.
    let mut status: avr8_hal::DynPin = pins.pb5.into_output().into_dynamic();

    loop {
        for led in row.iter_mut() {
            led.toggle();
            busy_wait(40_000);
        }
        status.toggle().unwrap();
    }
}
