//! SPI Implementation
//!
//! The [`Spi`] driver runs the hardware SPI peripheral in master mode.  It
//! takes ownership of the SCLK/MOSI/MISO/CS pins to guarantee they are in
//! the modes the hardware requires, and implements the blocking
//! `embedded-hal` SPI traits on top of the raw [`SpiOps`] primitives.

use core::marker::PhantomData;

use crate::port;
pub use embedded_hal::spi;

/// Error type emitted by the SPI driver in the event of a critical failure.
/// A full-duplex transfer cannot fail once it is running, so this type has
/// no variants.
#[derive(ufmt::derive::uDebug, Debug, Clone, Copy)]
pub enum SpiError {}

/// Oscillator Clock Frequency division options.  Controls both the `SPR` and
/// `SPI2X` register bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialClockRate {
    OscfOver2,
    OscfOver4,
    OscfOver8,
    OscfOver16,
    OscfOver32,
    OscfOver64,
    OscfOver128,
}

/// Order of data transmission, either MSB first or LSB first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrder {
    MostSignificantFirst,
    LeastSignificantFirst,
}

/// Settings to pass to Spi.
///
/// Easiest way to initialize is with `Settings::default()`.  Otherwise can be
/// instantiated with alternate settings directly.
#[derive(Clone, PartialEq)]
pub struct Settings {
    pub data_order: DataOrder,
    pub clock: SerialClockRate,
    pub mode: spi::Mode,
}

impl core::fmt::Debug for Settings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // `spi::Mode`/`Polarity`/`Phase` from embedded-hal 0.2 do not implement
        // `Debug`, so format the mode fields by hand.
        let polarity = match self.mode.polarity {
            spi::Polarity::IdleHigh => "IdleHigh",
            spi::Polarity::IdleLow => "IdleLow",
        };
        let phase = match self.mode.phase {
            spi::Phase::CaptureOnFirstTransition => "CaptureOnFirstTransition",
            spi::Phase::CaptureOnSecondTransition => "CaptureOnSecondTransition",
        };
        f.debug_struct("Settings")
            .field("data_order", &self.data_order)
            .field("clock", &self.clock)
            .field("polarity", &polarity)
            .field("phase", &phase)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_order: DataOrder::MostSignificantFirst,
            clock: SerialClockRate::OscfOver4,
            mode: spi::Mode {
                polarity: spi::Polarity::IdleLow,
                phase: spi::Phase::CaptureOnSecondTransition,
            },
        }
    }
}

/// Internal trait for low-level SPI peripherals
///
/// This trait defines the common interface for all SPI peripheral variants.
/// It is used as an intermediate abstraction ontop of which the [`Spi`] API
/// is built.  **Prefer using the [`Spi`] API instead of this trait.**
pub trait SpiOps<H, SCLK, MOSI, MISO, CS> {
    /// Configure the peripheral for master mode with the given settings.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_setup(&mut self, settings: &Settings);
    /// Disable the peripheral, releasing the pins for other use.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_release(&mut self);

    /// Check the "transfer complete" interrupt flag.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_check_iflag(&self) -> bool;
    /// Read the data register, which holds the byte clocked in during the
    /// previous transfer.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_read(&self) -> u8;
    /// Write a byte to the data register, which begins transmission
    /// automatically.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_write(&mut self, byte: u8);
}

/// Wrapper for the CS pin
///
/// Due to the SPI hardware requirements, the CS pin must be kept as an
/// output while the bus is active: were it to become a low input, the
/// peripheral would drop out of master mode.  This wrapper hands the pin
/// back to the user for manually selecting the slave device while making
/// sure it cannot be reconfigured in the meantime.
pub struct ChipSelectPin<CSPIN>(port::Pin<port::mode::Output, CSPIN>);

impl<CSPIN: port::PinOps> ChipSelectPin<CSPIN> {
    /// Select the slave device (drive CS low).
    pub fn set_low(&mut self) {
        self.0.set_low();
    }

    /// Deselect the slave device (drive CS high).
    pub fn set_high(&mut self) {
        self.0.set_high();
    }
}

impl<CSPIN: port::PinOps> embedded_hal::digital::v2::OutputPin for ChipSelectPin<CSPIN> {
    type Error = core::convert::Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high();
        Ok(())
    }
}

/// Behavior for a SPI interface.
///
/// Stores the SPI peripheral for register access.  In addition, it takes
/// ownership of the SCLK/MOSI/MISO pins to ensure they are in the correct
/// mode.  Instantiate with the [`Spi::new`] method.
pub struct Spi<H, SPI, SCLKPIN, MOSIPIN, MISOPIN, CSPIN> {
    p: SPI,
    sclk: port::Pin<port::mode::Output, SCLKPIN>,
    mosi: port::Pin<port::mode::Output, MOSIPIN>,
    miso: port::Pin<port::mode::Input<port::mode::PullUp>, MISOPIN>,
    write_in_progress: bool,
    _cs: PhantomData<CSPIN>,
    _h: PhantomData<H>,
}

impl<H, SPI, SCLKPIN, MOSIPIN, MISOPIN, CSPIN> Spi<H, SPI, SCLKPIN, MOSIPIN, MISOPIN, CSPIN>
where
    SPI: SpiOps<H, SCLKPIN, MOSIPIN, MISOPIN, CSPIN>,
    SCLKPIN: port::PinOps,
    MOSIPIN: port::PinOps,
    MISOPIN: port::PinOps,
    CSPIN: port::PinOps,
{
    /// Instantiate an SPI with the registers, SCLK/MOSI/MISO/CS pins and
    /// settings, with the internal pull-up enabled on MISO.
    ///
    /// The pins are not actually used directly, but they are moved into the
    /// struct in order to enforce that they are in the correct mode, and to
    /// prevent them from being used for something else in the meantime.
    pub fn new(
        p: SPI,
        sclk: port::Pin<port::mode::Output, SCLKPIN>,
        mosi: port::Pin<port::mode::Output, MOSIPIN>,
        miso: port::Pin<port::mode::Input<port::mode::PullUp>, MISOPIN>,
        cs: port::Pin<port::mode::Output, CSPIN>,
        settings: Settings,
    ) -> (Self, ChipSelectPin<CSPIN>) {
        let mut spi = Self {
            p,
            sclk,
            mosi,
            miso,
            write_in_progress: false,
            _cs: PhantomData,
            _h: PhantomData,
        };
        spi.p.raw_setup(&settings);
        (spi, ChipSelectPin(cs))
    }

    /// Disable the peripheral and release ownership of the peripheral and
    /// pins.  Instance can no-longer be used after this is invoked.
    pub fn release(
        mut self,
        cs: ChipSelectPin<CSPIN>,
    ) -> (
        SPI,
        port::Pin<port::mode::Output, SCLKPIN>,
        port::Pin<port::mode::Output, MOSIPIN>,
        port::Pin<port::mode::Input<port::mode::PullUp>, MISOPIN>,
        port::Pin<port::mode::Output, CSPIN>,
    ) {
        self.p.raw_release();
        (self.p, self.sclk, self.mosi, self.miso, cs.0)
    }

    fn flush(&mut self) -> nb::Result<(), SpiError> {
        if self.write_in_progress {
            if self.p.raw_check_iflag() {
                self.write_in_progress = false;
            } else {
                return Err(nb::Error::WouldBlock);
            }
        }
        Ok(())
    }

    fn write(&mut self, byte: u8) {
        self.write_in_progress = true;
        self.p.raw_write(byte);
    }
}

/// FullDuplex trait implementation, allowing this struct to be provided to
/// drivers that require it for operation.  Only 8-bit word size is supported
/// for now.
impl<H, SPI, SCLKPIN, MOSIPIN, MISOPIN, CSPIN> spi::FullDuplex<u8>
    for Spi<H, SPI, SCLKPIN, MOSIPIN, MISOPIN, CSPIN>
where
    SPI: SpiOps<H, SCLKPIN, MOSIPIN, MISOPIN, CSPIN>,
    SCLKPIN: port::PinOps,
    MOSIPIN: port::PinOps,
    MISOPIN: port::PinOps,
    CSPIN: port::PinOps,
{
    type Error = SpiError;

    /// Write a byte to the data register, starting a transfer.  Blocks (with
    /// `WouldBlock`) while a previous transfer is still in flight.
    fn send(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.flush()?;
        self.write(byte);
        Ok(())
    }

    /// Read the byte clocked in by the previous [`send`](Self::send) call.
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.flush()?;
        Ok(self.p.raw_read())
    }
}

impl<H, SPI, SCLKPIN, MOSIPIN, MISOPIN, CSPIN> embedded_hal::blocking::spi::transfer::Default<u8>
    for Spi<H, SPI, SCLKPIN, MOSIPIN, MISOPIN, CSPIN>
where
    SPI: SpiOps<H, SCLKPIN, MOSIPIN, MISOPIN, CSPIN>,
    SCLKPIN: port::PinOps,
    MOSIPIN: port::PinOps,
    MISOPIN: port::PinOps,
    CSPIN: port::PinOps,
{
}

impl<H, SPI, SCLKPIN, MOSIPIN, MISOPIN, CSPIN> embedded_hal::blocking::spi::write::Default<u8>
    for Spi<H, SPI, SCLKPIN, MOSIPIN, MISOPIN, CSPIN>
where
    SPI: SpiOps<H, SCLKPIN, MOSIPIN, MISOPIN, CSPIN>,
    SCLKPIN: port::PinOps,
    MOSIPIN: port::PinOps,
    MISOPIN: port::PinOps,
    CSPIN: port::PinOps,
{
}

/// Implement [`SpiOps`](crate::spi::SpiOps) for the `SPI` peripheral of one
/// chip.
#[macro_export]
macro_rules! impl_spi {
    (
        hal: $HAL:ty,
        peripheral: $SPI:ty,
        sclk: $sclkpin:ty,
        mosi: $mosipin:ty,
        miso: $misopin:ty,
        cs: $cspin:ty,
    ) => {
        impl $crate::spi::SpiOps<$HAL, $sclkpin, $mosipin, $misopin, $cspin> for $SPI {
            fn raw_setup(&mut self, settings: &$crate::spi::Settings) {
                use $crate::hal::spi;
                use $crate::spi::{DataOrder, SerialClockRate};

                self.spcr.write(|w| {
                    // Enable SPI in master mode
                    w.spe().set_bit();
                    w.mstr().set_bit();
                    match settings.data_order {
                        DataOrder::MostSignificantFirst => w.dord().clear_bit(),
                        DataOrder::LeastSignificantFirst => w.dord().set_bit(),
                    };
                    match settings.mode.polarity {
                        spi::Polarity::IdleHigh => w.cpol().set_bit(),
                        spi::Polarity::IdleLow => w.cpol().clear_bit(),
                    };
                    match settings.mode.phase {
                        spi::Phase::CaptureOnFirstTransition => w.cpha().clear_bit(),
                        spi::Phase::CaptureOnSecondTransition => w.cpha().set_bit(),
                    };
                    match settings.clock {
                        SerialClockRate::OscfOver2 => w.spr().fosc_4_2(),
                        SerialClockRate::OscfOver4 => w.spr().fosc_4_2(),
                        SerialClockRate::OscfOver8 => w.spr().fosc_16_8(),
                        SerialClockRate::OscfOver16 => w.spr().fosc_16_8(),
                        SerialClockRate::OscfOver32 => w.spr().fosc_64_32(),
                        SerialClockRate::OscfOver64 => w.spr().fosc_64_32(),
                        SerialClockRate::OscfOver128 => w.spr().fosc_128_64(),
                    }
                });
                // The SPI2X bit halves the SPR divider
                self.spsr.write(|w| match settings.clock {
                    SerialClockRate::OscfOver2 => w.spi2x().set_bit(),
                    SerialClockRate::OscfOver4 => w.spi2x().clear_bit(),
                    SerialClockRate::OscfOver8 => w.spi2x().set_bit(),
                    SerialClockRate::OscfOver16 => w.spi2x().clear_bit(),
                    SerialClockRate::OscfOver32 => w.spi2x().set_bit(),
                    SerialClockRate::OscfOver64 => w.spi2x().clear_bit(),
                    SerialClockRate::OscfOver128 => w.spi2x().clear_bit(),
                });
            }

            fn raw_release(&mut self) {
                self.spcr.write(|w| w.spe().clear_bit());
            }

            #[inline]
            fn raw_check_iflag(&self) -> bool {
                self.spsr.read().spif().bit_is_set()
            }

            #[inline]
            fn raw_read(&self) -> u8 {
                self.spdr.read().bits()
            }

            #[inline]
            fn raw_write(&mut self, byte: u8) {
                self.spdr.write(|w| unsafe { w.bits(byte) });
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{Pin, PinOps};
    use embedded_hal::blocking::spi::Transfer;
    use embedded_hal::spi::FullDuplex;

    macro_rules! mock_pin {
        ($Pin:ident) => {
            struct $Pin;

            impl PinOps for $Pin {
                type Dynamic = $Pin;

                fn into_dynamic(self) -> Self {
                    self
                }

                unsafe fn out_set(&mut self) {}
                unsafe fn out_clear(&mut self) {}
                unsafe fn out_toggle(&mut self) {}
                unsafe fn out_get(&self) -> bool {
                    false
                }
                unsafe fn in_get(&self) -> bool {
                    false
                }
                unsafe fn make_output(&mut self) {}
                unsafe fn make_input(&mut self, _pull_up: bool) {}
            }
        };
    }

    mock_pin!(MockSclk);
    mock_pin!(MockMosi);
    mock_pin!(MockMiso);
    mock_pin!(MockCs);

    /// Loopback-style mock: every written byte is read back inverted.
    #[derive(Default)]
    struct MockSpi {
        configured: Option<Settings>,
        shift_register: u8,
        busy: bool,
        released: bool,
    }

    impl SpiOps<(), MockSclk, MockMosi, MockMiso, MockCs> for MockSpi {
        fn raw_setup(&mut self, settings: &Settings) {
            self.configured = Some(settings.clone());
        }

        fn raw_release(&mut self) {
            self.released = true;
        }

        fn raw_check_iflag(&self) -> bool {
            self.busy
        }

        fn raw_read(&self) -> u8 {
            !self.shift_register
        }

        fn raw_write(&mut self, byte: u8) {
            self.shift_register = byte;
            self.busy = true;
        }
    }

    type MockSpiDriver = Spi<(), MockSpi, MockSclk, MockMosi, MockMiso, MockCs>;

    fn mock_spi() -> (MockSpiDriver, ChipSelectPin<MockCs>) {
        Spi::new(
            MockSpi::default(),
            Pin::new(MockSclk).into_output(),
            Pin::new(MockMosi).into_output(),
            Pin::new(MockMiso).into_pull_up_input(),
            Pin::new(MockCs).into_output(),
            Settings::default(),
        )
    }

    #[test]
    fn construction_applies_settings() {
        let (spi, cs) = mock_spi();
        let (p, _, _, _, _) = spi.release(cs);
        assert_eq!(p.configured, Some(Settings::default()));
        assert!(p.released);
    }

    #[test]
    fn send_then_read_returns_the_response() {
        let (mut spi, mut cs) = mock_spi();
        cs.set_low();
        nb::block!(spi.send(0x5A)).unwrap();
        assert_eq!(nb::block!(spi.read()).unwrap(), !0x5A);
        cs.set_high();
    }

    #[test]
    fn blocking_transfer_replaces_every_word() {
        let (mut spi, _cs) = mock_spi();
        let mut words = [0x00, 0x0F, 0xF0];
        spi.transfer(&mut words).unwrap();
        assert_eq!(words, [0xFF, 0xF0, 0x0F]);
    }
}
