//! Analog-to-Digital Converter
//!
//! # Example
//!
//! For full source code, please refer to the ADC demo (`demos/adc-scan.rs`).
//!
//! ```ignore
//! let dp = avr8_hal::pac::Peripherals::take().unwrap();
//! let pins = avr8_hal::pins!(dp);
//!
//! let mut adc = avr8_hal::Adc::new(dp.ADC, Default::default());
//!
//! let channels: [avr8_hal::adc::Channel<_, _>; 2] = [
//!     pins.pc0.into_analog_input(&mut adc).into_channel(),
//!     pins.pc1.into_analog_input(&mut adc).into_channel(),
//! ];
//!
//! for ch in channels.iter() {
//!     let value = adc.read_blocking(ch);
//! }
//! ```

use core::marker::PhantomData;

/// Conversion-clock prescaler
///
/// The ADC needs a clock between 50 kHz and 200 kHz for full resolution, so
/// the core clock has to be divided down.  The default of
/// [`Factor128`](ClockDivider::Factor128) keeps the ADC clock in range for
/// all supported core clock speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockDivider {
    Factor2,
    Factor4,
    Factor8,
    Factor16,
    Factor32,
    Factor64,
    Factor128,
}

impl Default for ClockDivider {
    fn default() -> Self {
        Self::Factor128
    }
}

/// Internal trait for the low-level ADC peripheral.
///
/// This trait defines the common interface for all ADC peripheral variants.
/// It is used as an intermediate abstraction ontop of which the [`Adc`] API
/// is built.  **Prefer using the [`Adc`] API instead of this trait.**
pub trait AdcOps<H> {
    /// Channel ID type for this ADC.
    type Channel: PartialEq + Copy;
    /// Settings type for initialization (reference voltage and clock
    /// divider, the details differ per chip family).
    type Settings;

    /// Initialize the ADC peripheral with the specified settings.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_init(&mut self, settings: Self::Settings);

    /// Read the ADC data register.
    ///
    /// This method must only be called after a conversion completed.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_read_adc(&self) -> u16;

    /// Check whether a conversion is currently running.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_is_converting(&self) -> bool;

    /// Start a single conversion on the currently selected channel.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_start_conversion(&mut self);

    /// Select the conversion channel.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_set_channel(&mut self, channel: Self::Channel);

    /// Disable the digital input buffer of the pin belonging to a channel.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_enable_channel(&mut self, channel: Self::Channel);
}

/// Trait marking a type as an ADC channel for a certain ADC.
pub trait AdcChannel<H, ADC: AdcOps<H>> {
    fn channel(&self) -> ADC::Channel;
}

/// A generic ADC channel, obtained by erasing the pin type with
/// [`Pin::into_channel`](crate::port::Pin::into_channel).
///
/// Using `Channel`, heterogeneous analog pins can be stored in the same
/// array, for example to cycle through all of them in a measurement loop.
pub struct Channel<H, ADC: AdcOps<H>> {
    ch: ADC::Channel,
    _h: PhantomData<H>,
}

impl<H, ADC: AdcOps<H>> Channel<H, ADC> {
    pub fn new<PIN: AdcChannel<H, ADC>>(pin: PIN) -> Self {
        Self {
            ch: pin.channel(),
            _h: PhantomData,
        }
    }
}

impl<H, ADC: AdcOps<H>> AdcChannel<H, ADC> for Channel<H, ADC> {
    #[inline]
    fn channel(&self) -> ADC::Channel {
        self.ch
    }
}

/// Analog-to-Digital Converter
///
/// All conversions are single-shot: a conversion is started for one channel
/// and its result is read back once the hardware is done.  The blocking
/// variant busy-waits on the conversion flag, the non-blocking variant
/// returns [`nb::Error::WouldBlock`] while the conversion is still running.
pub struct Adc<H, ADC: AdcOps<H>, CLOCK> {
    p: ADC,
    reading_channel: Option<ADC::Channel>,
    _clock: PhantomData<CLOCK>,
    _h: PhantomData<H>,
}

impl<H, ADC, CLOCK> Adc<H, ADC, CLOCK>
where
    ADC: AdcOps<H>,
    CLOCK: crate::clock::Clock,
{
    pub fn new(p: ADC, settings: ADC::Settings) -> Self {
        let mut adc = Self {
            p,
            reading_channel: None,
            _clock: PhantomData,
            _h: PhantomData,
        };
        adc.p.raw_init(settings);
        adc
    }

    /// Convert the given channel and busy-wait for the result.
    pub fn read_blocking<PIN: AdcChannel<H, ADC>>(&mut self, pin: &PIN) -> u16 {
        // Wait for a conversion a previous non-blocking read may have left
        // running
        while self.p.raw_is_converting() {}
        self.reading_channel = None;

        self.p.raw_set_channel(pin.channel());
        self.p.raw_start_conversion();
        while self.p.raw_is_converting() {}
        self.p.raw_read_adc()
    }

    /// Convert the given channel without busy-waiting.
    ///
    /// The first call selects the channel and starts a conversion.  Further
    /// calls for the same channel return [`nb::Error::WouldBlock`] until the
    /// result is available.  Calls for a *different* channel block until the
    /// running conversion has been collected.
    pub fn read_nonblocking<PIN: AdcChannel<H, ADC>>(
        &mut self,
        pin: &PIN,
    ) -> nb::Result<u16, core::convert::Infallible> {
        match (self.reading_channel, self.p.raw_is_converting()) {
            (Some(channel), false) if channel == pin.channel() => {
                self.reading_channel = None;
                Ok(self.p.raw_read_adc())
            }
            (Some(_), _) => Err(nb::Error::WouldBlock),
            (None, _) => {
                self.reading_channel = Some(pin.channel());
                self.p.raw_set_channel(pin.channel());
                self.p.raw_start_conversion();
                Err(nb::Error::WouldBlock)
            }
        }
    }

    /// Disable the peripheral's hold on the register block and return it.
    pub fn release(self) -> ADC {
        self.p
    }

    pub(crate) fn enable_pin<PIN: AdcChannel<H, ADC>>(&mut self, pin: &PIN) {
        self.p.raw_enable_channel(pin.channel());
    }
}

impl<H, ADC, CLOCK, WORD, PIN> crate::hal::adc::OneShot<Adc<H, ADC, CLOCK>, WORD, PIN>
    for Adc<H, ADC, CLOCK>
where
    WORD: From<u16>,
    PIN: crate::hal::adc::Channel<Adc<H, ADC, CLOCK>, ID = ADC::Channel> + AdcChannel<H, ADC>,
    ADC: AdcOps<H>,
    CLOCK: crate::clock::Clock,
{
    type Error = core::convert::Infallible;

    fn read(&mut self, pin: &mut PIN) -> nb::Result<WORD, Self::Error> {
        self.read_nonblocking(&*pin).map(WORD::from)
    }
}

/// Implement [`AdcOps`](crate::adc::AdcOps) and the channel wiring for the
/// ADC peripheral of one chip.
#[macro_export]
macro_rules! impl_adc {
    (
        hal: $HAL:ty,
        peripheral: $ADC:ty,
        settings: $Settings:ty,
        apply_settings: |$settings_periph_var:ident, $settings:ident| $apply_settings:block,
        channel_id: $Channel:ty,
        set_channel: |$periph_var:ident, $chan:ident| $set_channel:block,
        pins: {
            $($pin:ty: ($pin_channel:expr, $didr:ident::$didr_method:ident),)+
        },
        $(channels: {
            $($ChannelTy:ty: $channel_expr:expr,)*
        },)?
    ) => {
        impl $crate::adc::AdcOps<$HAL> for $ADC {
            type Channel = $Channel;
            type Settings = $Settings;

            #[inline]
            fn raw_init(&mut self, settings: Self::Settings) {
                let $settings_periph_var = &*self;
                let $settings = settings;
                $apply_settings
            }

            #[inline]
            fn raw_read_adc(&self) -> u16 {
                self.adc.read().bits()
            }

            #[inline]
            fn raw_is_converting(&self) -> bool {
                self.adcsra.read().adsc().bit_is_set()
            }

            #[inline]
            fn raw_start_conversion(&mut self) {
                self.adcsra.modify(|_, w| w.adsc().set_bit());
            }

            #[inline]
            fn raw_set_channel(&mut self, channel: Self::Channel) {
                let $periph_var = &*self;
                let $chan = channel;
                $set_channel
            }

            #[inline]
            fn raw_enable_channel(&mut self, channel: Self::Channel) {
                match channel {
                    $(c if c == $pin_channel => {
                        self.$didr.modify(|_, w| w.$didr_method().set_bit());
                    })+
                    _ => (),
                }
            }
        }

        $(
            impl $crate::adc::AdcChannel<$HAL, $ADC>
                for $crate::port::Pin<$crate::port::mode::Analog, $pin>
            {
                #[inline]
                fn channel(&self) -> $Channel {
                    $pin_channel
                }
            }

            impl<CLOCK> $crate::hal::adc::Channel<$crate::adc::Adc<$HAL, $ADC, CLOCK>>
                for $crate::port::Pin<$crate::port::mode::Analog, $pin>
            {
                type ID = $Channel;

                fn channel() -> Self::ID {
                    $pin_channel
                }
            }
        )+

        $($(
            impl $crate::adc::AdcChannel<$HAL, $ADC> for $ChannelTy {
                #[inline]
                fn channel(&self) -> $Channel {
                    $channel_expr
                }
            }

            impl<CLOCK> $crate::hal::adc::Channel<$crate::adc::Adc<$HAL, $ADC, CLOCK>>
                for $ChannelTy
            {
                type ID = $Channel;

                fn channel() -> Self::ID {
                    $channel_expr
                }
            }
        )*)?
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MHz16;
    use core::cell::Cell;
    use embedded_hal::adc::OneShot;

    /// Mock ADC: every started conversion takes two status polls to finish
    /// and then yields `result`.
    struct MockAdc {
        init: bool,
        channel: Option<u8>,
        remaining_polls: Cell<u8>,
        result: u16,
        enabled: Vec<u8>,
    }

    impl Default for MockAdc {
        fn default() -> Self {
            Self {
                init: false,
                channel: None,
                remaining_polls: Cell::new(0),
                result: 0x3FF,
                enabled: Vec::new(),
            }
        }
    }

    impl AdcOps<()> for MockAdc {
        type Channel = u8;
        type Settings = ();

        fn raw_init(&mut self, _settings: ()) {
            self.init = true;
        }

        fn raw_read_adc(&self) -> u16 {
            self.result
        }

        fn raw_is_converting(&self) -> bool {
            let polls = self.remaining_polls.get();
            if polls > 0 {
                self.remaining_polls.set(polls - 1);
                true
            } else {
                false
            }
        }

        fn raw_start_conversion(&mut self) {
            self.remaining_polls.set(2);
        }

        fn raw_set_channel(&mut self, channel: u8) {
            self.channel = Some(channel);
        }

        fn raw_enable_channel(&mut self, channel: u8) {
            self.enabled.push(channel);
        }
    }

    struct MockChannel(u8);

    impl AdcChannel<(), MockAdc> for MockChannel {
        fn channel(&self) -> u8 {
            self.0
        }
    }

    struct FixedPin3;

    impl AdcChannel<(), MockAdc> for FixedPin3 {
        fn channel(&self) -> u8 {
            3
        }
    }

    impl crate::hal::adc::Channel<Adc<(), MockAdc, MHz16>> for FixedPin3 {
        type ID = u8;

        fn channel() -> u8 {
            3
        }
    }

    #[test]
    fn blocking_read_selects_channel_and_waits() {
        let mut adc: Adc<(), MockAdc, MHz16> = Adc::new(MockAdc::default(), ());
        let value = adc.read_blocking(&MockChannel(5));
        assert_eq!(value, 0x3FF);
        let p = adc.release();
        assert!(p.init);
        assert_eq!(p.channel, Some(5));
    }

    #[test]
    fn nonblocking_read_completes_after_conversion() {
        let mut adc: Adc<(), MockAdc, MHz16> = Adc::new(MockAdc::default(), ());
        let pin = MockChannel(2);
        // Starts the conversion
        assert!(adc.read_nonblocking(&pin).is_err());
        // Still converting
        assert!(adc.read_nonblocking(&pin).is_err());
        assert!(adc.read_nonblocking(&pin).is_err());
        // Done
        assert_eq!(adc.read_nonblocking(&pin), Ok(0x3FF));
    }

    #[test]
    fn other_channel_waits_for_running_conversion() {
        let mut adc: Adc<(), MockAdc, MHz16> = Adc::new(MockAdc::default(), ());
        assert!(adc.read_nonblocking(&MockChannel(1)).is_err());
        // A different channel must not steal the conversion
        assert!(adc.read_nonblocking(&MockChannel(2)).is_err());
        assert_eq!(adc.release().channel, Some(1));
    }

    #[test]
    fn one_shot_trait_reads_through() {
        let mut adc: Adc<(), MockAdc, MHz16> = Adc::new(MockAdc::default(), ());
        let mut pin = FixedPin3;
        let value: u16 = nb::block!(adc.read(&mut pin)).unwrap();
        assert_eq!(value, 0x3FF);
        assert_eq!(adc.release().channel, Some(3));
    }

    #[test]
    fn channel_erasure_keeps_the_channel_id() {
        let mut adc: Adc<(), MockAdc, MHz16> = Adc::new(MockAdc::default(), ());
        let erased = Channel::new(MockChannel(7));
        adc.read_blocking(&erased);
        assert_eq!(adc.release().channel, Some(7));
    }
}
