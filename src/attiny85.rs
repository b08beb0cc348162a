//! Wiring for the ATtiny85.
//!
//! The ATtiny85 has no USART, SPI or TWI hardware, so only the port, ADC,
//! EEPROM, watchdog and PWM drivers are wired up for this chip.

use crate::simple_pwm::Prescaler;

pub use crate::pac::Peripherals;

crate::impl_port! {
    enum Ports {
        PORTB: (crate::pac::PORTB, portb, pinb, ddrb),
    }

    /// All pins of the ATtiny85, in their reset state (floating inputs).
    pub struct Pins {
        pb0: PB0 = (crate::pac::PORTB, PORTB, 0, portb, pinb, ddrb),
        pb1: PB1 = (crate::pac::PORTB, PORTB, 1, portb, pinb, ddrb),
        pb2: PB2 = (crate::pac::PORTB, PORTB, 2, portb, pinb, ddrb),
        pb3: PB3 = (crate::pac::PORTB, PORTB, 3, portb, pinb, ddrb),
        pb4: PB4 = (crate::pac::PORTB, PORTB, 4, portb, pinb, ddrb),
        pb5: PB5 = (crate::pac::PORTB, PORTB, 5, portb, pinb, ddrb),
    }
}

/// Fully type-erased pin of this chip, see
/// [`dynpins`](crate::port::dynpins).
pub type DynPin = crate::port::DynPin<Dynamic>;

/// Convenience macro to instantiate the [`Pins`] struct for this chip.
///
/// # Example
/// ```ignore
/// let dp = avr8_hal::pac::Peripherals::take().unwrap();
/// let pins = avr8_hal::pins!(dp);
/// ```
#[macro_export]
macro_rules! pins {
    ($p:expr) => {
        $crate::Pins::new($p.PORTB)
    };
}

//==================================================================================================
//  ADC
//==================================================================================================

/// Select the voltage reference for the ADC peripheral
///
/// The internal references and the `AREF` pin (`PB0`) can not be used at the
/// same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceVoltage {
    /// Voltage applied to the `AREF` pin.
    Aref,
    /// System reference voltage (default).
    AVcc,
    /// Internal 1.1V reference.
    Internal1_1,
    /// Internal 2.56V reference.
    Internal2_56,
}

impl Default for ReferenceVoltage {
    fn default() -> Self {
        Self::AVcc
    }
}

/// Configuration for the ADC peripheral.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdcSettings {
    pub clock_divider: crate::adc::ClockDivider,
    pub ref_voltage: ReferenceVoltage,
}

/// Additional channels not connected to any port pin.
pub mod channel {
    pub struct Vbg;
    pub struct Gnd;
    pub struct Temperature;
}

fn apply_clock(peripheral: &crate::pac::ADC, settings: AdcSettings) {
    peripheral.adcsra.write(|w| {
        w.aden().set_bit();
        match settings.clock_divider {
            crate::adc::ClockDivider::Factor2 => w.adps().prescaler_2(),
            crate::adc::ClockDivider::Factor4 => w.adps().prescaler_4(),
            crate::adc::ClockDivider::Factor8 => w.adps().prescaler_8(),
            crate::adc::ClockDivider::Factor16 => w.adps().prescaler_16(),
            crate::adc::ClockDivider::Factor32 => w.adps().prescaler_32(),
            crate::adc::ClockDivider::Factor64 => w.adps().prescaler_64(),
            crate::adc::ClockDivider::Factor128 => w.adps().prescaler_128(),
        }
    });
}

crate::impl_adc! {
    hal: crate::Attiny,
    peripheral: crate::pac::ADC,
    settings: AdcSettings,
    apply_settings: |peripheral, settings| {
        apply_clock(peripheral, settings);
        peripheral.admux.write(|w| match settings.ref_voltage {
            ReferenceVoltage::Aref => w.refs().aref(),
            ReferenceVoltage::AVcc => w.refs().vcc(),
            ReferenceVoltage::Internal1_1 => w.refs().internal().refs2().clear_bit(),
            ReferenceVoltage::Internal2_56 => w.refs().internal().refs2().set_bit(),
        });
    },
    channel_id: crate::pac::adc::admux::MUX_A,
    set_channel: |peripheral, id| {
        peripheral.admux.modify(|_, w| w.mux().variant(id));
    },
    pins: {
        PB5: (crate::pac::adc::admux::MUX_A::ADC0, didr0::adc0d),
        PB2: (crate::pac::adc::admux::MUX_A::ADC1, didr0::adc1d),
        PB4: (crate::pac::adc::admux::MUX_A::ADC2, didr0::adc2d),
        PB3: (crate::pac::adc::admux::MUX_A::ADC3, didr0::adc3d),
    },
    channels: {
        channel::Vbg: crate::pac::adc::admux::MUX_A::ADC_VBG,
        channel::Gnd: crate::pac::adc::admux::MUX_A::ADC_GND,
        channel::Temperature: crate::pac::adc::admux::MUX_A::TEMPSENS,
    },
}

pub type Adc<CLOCK> = crate::adc::Adc<crate::Attiny, crate::pac::ADC, CLOCK>;

//==================================================================================================
//  EEPROM
//==================================================================================================

crate::impl_eeprom_attiny! {
    hal: crate::Attiny,
    peripheral: crate::pac::EEPROM,
    capacity: 512,
    addr_width: u16,
    set_address: |peripheral, address| {
        peripheral.eear.write(|w| w.bits(address));
    },
}

pub type Eeprom = crate::eeprom::Eeprom<crate::Attiny, crate::pac::EEPROM>;

//==================================================================================================
//  Watchdog
//==================================================================================================

crate::impl_wdt! {
    hal: crate::Attiny,
    peripheral: crate::pac::WDT,
    mcusr: crate::pac::cpu::MCUSR,
    wdtcsr_name: wdtcr,
    timeout: |to, w| match to {
        crate::wdt::Timeout::Ms16 => w.wdpl().cycles_2k_512k(),
        crate::wdt::Timeout::Ms32 => w.wdpl().cycles_4k_1024k(),
        crate::wdt::Timeout::Ms64 => w.wdpl().cycles_8k(),
        crate::wdt::Timeout::Ms125 => w.wdpl().cycles_16k(),
        crate::wdt::Timeout::Ms250 => w.wdpl().cycles_32k(),
        crate::wdt::Timeout::Ms500 => w.wdpl().cycles_64k(),
        crate::wdt::Timeout::Ms1000 => w.wdpl().cycles_128k(),
        crate::wdt::Timeout::Ms2000 => w.wdpl().cycles_256k(),
        crate::wdt::Timeout::Ms4000 => w.wdph().set_bit().wdpl().cycles_2k_512k(),
        crate::wdt::Timeout::Ms8000 => w.wdph().set_bit().wdpl().cycles_4k_1024k(),
    },
}

pub type Wdt = crate::wdt::Wdt<crate::Attiny, crate::pac::WDT>;

//==================================================================================================
//  PWM
//==================================================================================================

crate::impl_simple_pwm! {
    /// Use `TC0` for PWM (pins `PB0`, `PB1`)
    pub struct Timer0Pwm {
        timer: crate::pac::TC0,
        init: |tim, prescaler| {
            tim.tccr0a.modify(|_r, w| w.wgm0().pwm_fast());
            tim.tccr0b.modify(|_r, w| match prescaler {
                Prescaler::Direct => w.cs0().direct(),
                Prescaler::Prescale8 => w.cs0().prescale_8(),
                Prescaler::Prescale64 => w.cs0().prescale_64(),
                Prescaler::Prescale256 => w.cs0().prescale_256(),
                Prescaler::Prescale1024 => w.cs0().prescale_1024(),
            });
        },
        pins: {
            PB0: {
                ocr: ocr0a,
                into_pwm: |tim| if enable {
                    tim.tccr0a.modify(|_r, w| w.com0a().match_clear());
                } else {
                    tim.tccr0a.modify(|_r, w| w.com0a().disconnected());
                },
            },
            PB1: {
                ocr: ocr0b,
                into_pwm: |tim| if enable {
                    tim.tccr0a.modify(|_r, w| w.com0b().match_clear());
                } else {
                    tim.tccr0a.modify(|_r, w| w.com0b().disconnected());
                },
            },
        },
    }
}

crate::impl_simple_pwm! {
    /// Use `TC1` for PWM (pin `PB4`)
    pub struct Timer1Pwm {
        timer: crate::pac::TC1,
        init: |tim, prescaler| {
            tim.gtccr.modify(|_r, w| w.pwm1b().bit(true));
            tim.tccr1.modify(|_r, w| match prescaler {
                Prescaler::Direct => w.cs1().direct(),
                Prescaler::Prescale8 => w.cs1().prescale_8(),
                Prescaler::Prescale64 => w.cs1().prescale_64(),
                Prescaler::Prescale256 => w.cs1().prescale_256(),
                Prescaler::Prescale1024 => w.cs1().prescale_1024(),
            });
        },
        pins: {
            PB4: {
                ocr: ocr1b,
                into_pwm: |tim| if enable {
                    tim.gtccr.modify(|_r, w| w.com1b().bits(0b10));
                } else {
                    tim.gtccr.modify(|_r, w| w.com1b().disconnected());
                },
            },
        },
    }
}
