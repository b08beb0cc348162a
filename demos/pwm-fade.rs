//! PWM fade example
//!
//! Fades the LED on PD5 up and down using the timer 0 output-compare unit.
#![no_std]
#![no_main]

use avr8_hal::prelude::*;
use avr8_hal::simple_pwm::Prescaler;
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

    let timer0 = avr8_hal::Timer0Pwm::new(dp.TC0, Prescaler::Prescale64);

    let mut led = pins.pd5.into_output().into_pwm(&timer0);
    led.enable();

    loop {
        for duty in (0..=255).chain((0..=254).rev()) {
            led.set_duty(duty);
            busy_wait(4_000);
        }
    }
}
