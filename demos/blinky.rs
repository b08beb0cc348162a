//! Simple blinky example
//!
//! Toggles the LED on PB5 (the on-board LED of most ATmega328P boards).
#![no_std]
#![no_main]

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

    let mut led = pins.pb5.into_output();

    loop {
        led.toggle();
        busy_wait(100_000);
    }
}
