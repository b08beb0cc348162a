//! Wiring for the ATmega328P.
//!
//! This module only contains glue: the register addresses, bit positions and
//! capacities of this particular chip are fed into the generic drivers via
//! the `impl_*!` macros, and pre-wired type aliases are exported for each
//! peripheral instance.

use crate::simple_pwm::Prescaler;

pub use crate::pac::Peripherals;

crate::impl_port! {
    enum Ports {
        PORTB: (crate::pac::PORTB, portb, pinb, ddrb),
        PORTC: (crate::pac::PORTC, portc, pinc, ddrc),
        PORTD: (crate::pac::PORTD, portd, pind, ddrd),
    }

    /// All pins of the ATmega328P, in their reset state (floating inputs).
    pub struct Pins {
        pb0: PB0 = (crate::pac::PORTB, PORTB, 0, portb, pinb, ddrb),
        pb1: PB1 = (crate::pac::PORTB, PORTB, 1, portb, pinb, ddrb),
        pb2: PB2 = (crate::pac::PORTB, PORTB, 2, portb, pinb, ddrb),
        pb3: PB3 = (crate::pac::PORTB, PORTB, 3, portb, pinb, ddrb),
        pb4: PB4 = (crate::pac::PORTB, PORTB, 4, portb, pinb, ddrb),
        pb5: PB5 = (crate::pac::PORTB, PORTB, 5, portb, pinb, ddrb),
        pb6: PB6 = (crate::pac::PORTB, PORTB, 6, portb, pinb, ddrb),
        pb7: PB7 = (crate::pac::PORTB, PORTB, 7, portb, pinb, ddrb),
        pc0: PC0 = (crate::pac::PORTC, PORTC, 0, portc, pinc, ddrc),
        pc1: PC1 = (crate::pac::PORTC, PORTC, 1, portc, pinc, ddrc),
        pc2: PC2 = (crate::pac::PORTC, PORTC, 2, portc, pinc, ddrc),
        pc3: PC3 = (crate::pac::PORTC, PORTC, 3, portc, pinc, ddrc),
        pc4: PC4 = (crate::pac::PORTC, PORTC, 4, portc, pinc, ddrc),
        pc5: PC5 = (crate::pac::PORTC, PORTC, 5, portc, pinc, ddrc),
        pc6: PC6 = (crate::pac::PORTC, PORTC, 6, portc, pinc, ddrc),
        pd0: PD0 = (crate::pac::PORTD, PORTD, 0, portd, pind, ddrd),
        pd1: PD1 = (crate::pac::PORTD, PORTD, 1, portd, pind, ddrd),
        pd2: PD2 = (crate::pac::PORTD, PORTD, 2, portd, pind, ddrd),
        pd3: PD3 = (crate::pac::PORTD, PORTD, 3, portd, pind, ddrd),
        pd4: PD4 = (crate::pac::PORTD, PORTD, 4, portd, pind, ddrd),
        pd5: PD5 = (crate::pac::PORTD, PORTD, 5, portd, pind, ddrd),
        pd6: PD6 = (crate::pac::PORTD, PORTD, 6, portd, pind, ddrd),
        pd7: PD7 = (crate::pac::PORTD, PORTD, 7, portd, pind, ddrd),
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
        $crate::Pins::new($p.PORTB, $p.PORTC, $p.PORTD)
    };
}

//==================================================================================================
//  USART
//==================================================================================================

crate::impl_usart! {
    hal: crate::Atmega,
    peripheral: crate::pac::USART0,
    register_suffix: 0,
    rx: PD0,
    tx: PD1,
}

pub type Usart0<CLOCK> = crate::usart::Usart<
    crate::Atmega,
    crate::pac::USART0,
    Pin<mode::Input, PD0>,
    Pin<mode::Output, PD1>,
    CLOCK,
>;

//==================================================================================================
//  SPI
//==================================================================================================

crate::impl_spi! {
    hal: crate::Atmega,
    peripheral: crate::pac::SPI,
    sclk: PB5,
    mosi: PB3,
    miso: PB4,
    cs: PB2,
}

pub type Spi = crate::spi::Spi<crate::Atmega, crate::pac::SPI, PB5, PB3, PB4, PB2>;

//==================================================================================================
//  I2C
//==================================================================================================

crate::impl_twi! {
    hal: crate::Atmega,
    peripheral: crate::pac::TWI,
    sda: PC4,
    scl: PC5,
}

pub type I2c<CLOCK> = crate::i2c::I2c<
    crate::Atmega,
    crate::pac::TWI,
    Pin<mode::Input, PC4>,
    Pin<mode::Input, PC5>,
    CLOCK,
>;

//==================================================================================================
//  ADC
//==================================================================================================

/// Select the voltage reference for the ADC peripheral
///
/// The internal reference and the `AREF` pin can not be used at the same
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceVoltage {
    /// Voltage applied to the `AREF` pin.
    Aref,
    /// System reference voltage, GND capped (default).
    AVcc,
    /// Internal 1.1V reference.
    Internal,
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
///
/// Some channels are internal to the chip: the bandgap reference, ground and
/// the temperature sensor.  They can be read like a pin channel:
///
/// ```ignore
/// let value = adc.read_blocking(&channel::Vbg);
/// ```
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
    hal: crate::Atmega,
    peripheral: crate::pac::ADC,
    settings: AdcSettings,
    apply_settings: |peripheral, settings| {
        apply_clock(peripheral, settings);
        peripheral.admux.write(|w| match settings.ref_voltage {
            ReferenceVoltage::Aref => w.refs().aref(),
            ReferenceVoltage::AVcc => w.refs().avcc(),
            ReferenceVoltage::Internal => w.refs().internal(),
        });
    },
    channel_id: crate::pac::adc::admux::MUX_A,
    set_channel: |peripheral, id| {
        peripheral.admux.modify(|_, w| w.mux().variant(id));
    },
    pins: {
        PC0: (crate::pac::adc::admux::MUX_A::ADC0, didr0::adc0d),
        PC1: (crate::pac::adc::admux::MUX_A::ADC1, didr0::adc1d),
        PC2: (crate::pac::adc::admux::MUX_A::ADC2, didr0::adc2d),
        PC3: (crate::pac::adc::admux::MUX_A::ADC3, didr0::adc3d),
        PC4: (crate::pac::adc::admux::MUX_A::ADC4, didr0::adc4d),
        PC5: (crate::pac::adc::admux::MUX_A::ADC5, didr0::adc5d),
    },
    channels: {
        channel::Vbg: crate::pac::adc::admux::MUX_A::ADC_VBG,
        channel::Gnd: crate::pac::adc::admux::MUX_A::ADC_GND,
        channel::Temperature: crate::pac::adc::admux::MUX_A::TEMPSENS,
    },
}

pub type Adc<CLOCK> = crate::adc::Adc<crate::Atmega, crate::pac::ADC, CLOCK>;

//==================================================================================================
//  EEPROM
//==================================================================================================

crate::impl_eeprom_atmega! {
    hal: crate::Atmega,
    peripheral: crate::pac::EEPROM,
    capacity: 1024,
    addr_width: u16,
    set_address: |peripheral, address| {
        peripheral.eear.write(|w| w.bits(address));
    },
}

pub type Eeprom = crate::eeprom::Eeprom<crate::Atmega, crate::pac::EEPROM>;

//==================================================================================================
//  Watchdog
//==================================================================================================

crate::impl_wdt! {
    hal: crate::Atmega,
    peripheral: crate::pac::WDT,
    mcusr: crate::pac::cpu::MCUSR,
    wdtcsr_name: wdtcsr,
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

pub type Wdt = crate::wdt::Wdt<crate::Atmega, crate::pac::WDT>;

//==================================================================================================
//  PWM
//==================================================================================================

crate::impl_simple_pwm! {
    /// Use `TC0` for PWM (pins `PD5`, `PD6`)
    ///
    /// # Example
    /// ```ignore
    /// let mut timer0 = Timer0Pwm::new(dp.TC0, Prescaler::Prescale64);
    ///
    /// let mut d5 = pins.pd5.into_output().into_pwm(&mut timer0);
    /// d5.set_duty(128);
    /// d5.enable();
    /// ```
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
            PD6: {
                ocr: ocr0a,
                into_pwm: |tim| if enable {
                    tim.tccr0a.modify(|_r, w| w.com0a().match_clear());
                } else {
                    tim.tccr0a.modify(|_r, w| w.com0a().disconnected());
                },
            },
            PD5: {
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
    /// Use `TC1` for PWM (pins `PB1`, `PB2`)
    pub struct Timer1Pwm {
        timer: crate::pac::TC1,
        init: |tim, prescaler| {
            tim.tccr1a.modify(|_r, w| w.wgm1().bits(0b01));
            tim.tccr1b.modify(|_r, w| {
                w.wgm1().bits(0b01);

                match prescaler {
                    Prescaler::Direct => w.cs1().direct(),
                    Prescaler::Prescale8 => w.cs1().prescale_8(),
                    Prescaler::Prescale64 => w.cs1().prescale_64(),
                    Prescaler::Prescale256 => w.cs1().prescale_256(),
                    Prescaler::Prescale1024 => w.cs1().prescale_1024(),
                }
            });
        },
        pins: {
            PB1: {
                ocr: ocr1a,
                into_pwm: |tim| if enable {
                    tim.tccr1a.modify(|_r, w| w.com1a().match_clear());
                } else {
                    tim.tccr1a.modify(|_r, w| w.com1a().disconnected());
                },
            },
            PB2: {
                ocr: ocr1b,
                into_pwm: |tim| if enable {
                    tim.tccr1a.modify(|_r, w| w.com1b().match_clear());
                } else {
                    tim.tccr1a.modify(|_r, w| w.com1b().disconnected());
                },
            },
        },
    }
}

crate::impl_simple_pwm! {
    /// Use `TC2` for PWM (pins `PB3`, `PD3`)
    pub struct Timer2Pwm {
        timer: crate::pac::TC2,
        init: |tim, prescaler| {
            tim.tccr2a.modify(|_r, w| w.wgm2().pwm_fast());
            tim.tccr2b.modify(|_r, w| match prescaler {
                Prescaler::Direct => w.cs2().direct(),
                Prescaler::Prescale8 => w.cs2().prescale_8(),
                Prescaler::Prescale64 => w.cs2().prescale_64(),
                Prescaler::Prescale256 => w.cs2().prescale_256(),
                Prescaler::Prescale1024 => w.cs2().prescale_1024(),
            });
        },
        pins: {
            PB3: {
                ocr: ocr2a,
                into_pwm: |tim| if enable {
                    tim.tccr2a.modify(|_r, w| w.com2a().match_clear());
                } else {
                    tim.tccr2a.modify(|_r, w| w.com2a().disconnected());
                },
            },
            PD3: {
                ocr: ocr2b,
                into_pwm: |tim| if enable {
                    tim.tccr2a.modify(|_r, w| w.com2b().match_clear());
                } else {
                    tim.tccr2a.modify(|_r, w| w.com2b().disconnected());
                },
            },
        },
    }
}
