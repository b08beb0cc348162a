//! ADC scan example
//!
//! Cycles through all analog pins plus the internal channels and prints the
//! conversion results over the serial link.
#![no_std]
#![no_main]

use avr8_hal::adc::Channel;
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

    let mut adc = avr8_hal::Adc::<CoreClock>::new(dp.ADC, Default::default());

    // The type-erased channels can live in one array even though every pin
    // has its own type.
    let channels: [Channel<avr8_hal::Atmega, avr8_hal::pac::ADC>; 4] = [
        pins.pc0.into_analog_input(&mut adc).into_channel(),
        pins.pc1.into_analog_input(&mut adc).into_channel(),
        pins.pc2.into_analog_input(&mut adc).into_channel(),
        pins.pc3.into_analog_input(&mut adc).into_channel(),
    ];

    loop {
        for (index, channel) in channels.iter().enumerate() {
            let value = adc.read_blocking(channel);
            ufmt::uwrite!(&mut serial, "ADC{}: {} ", index, value).void_unwrap();
        }

        let vbg = adc.read_blocking(&avr8_hal::channel::Vbg);
        let temperature = adc.read_blocking(&avr8_hal::channel::Temperature);
        ufmt::uwriteln!(&mut serial, "Vbg: {} Temp: {}\r", vbg, temperature).void_unwrap();
    }
}
