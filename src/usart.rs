//! HAL abstractions for USART/Serial
//!
//! Check the documentation of [`Usart`] for details.

use core::cmp::Ordering;
use core::marker;
use void::ResultVoidExt;

use crate::port;

/// Representation of a USART baudrate
///
/// Precalculated parameters for configuring a certain USART baudrate.
#[derive(Debug, Clone, Copy)]
pub struct Baudrate<CLOCK> {
    /// Value of the `UBRR#` register
    pub ubrr: u16,
    /// Value of the `U2X#` bit
    pub u2x: bool,
    /// The baudrate calculation depends on the configured clock rate, thus a
    /// `CLOCK` generic parameter is needed.
    pub _clock: marker::PhantomData<CLOCK>,
}

/// Error from validating a requested baudrate against the hardware divisor,
/// see [`Baudrate::with_tolerance`].
#[derive(ufmt::derive::uDebug, Debug, Clone, Copy, Eq, PartialEq)]
pub enum BaudrateError {
    /// No `UBRR#` divisor exists for the requested rate at this clock speed.
    OutOfRange,
    /// The closest achievable rate deviates more from the requested one than
    /// the given tolerance allows.
    ToleranceExceeded {
        /// The rate the best divisor would actually produce.
        actual: u32,
    },
}

impl<CLOCK: crate::clock::Clock> PartialEq for Baudrate<CLOCK> {
    fn eq(&self, other: &Self) -> bool {
        self.compare_value() == other.compare_value()
    }
}

impl<CLOCK: crate::clock::Clock> Eq for Baudrate<CLOCK> {}

impl<CLOCK: crate::clock::Clock> PartialOrd for Baudrate<CLOCK> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<CLOCK: crate::clock::Clock> Ord for Baudrate<CLOCK> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.compare_value().cmp(&self.compare_value())
    }
}

impl<CLOCK: crate::clock::Clock> From<u32> for Baudrate<CLOCK> {
    fn from(baud: u32) -> Self {
        Baudrate::new(baud)
    }
}

impl<CLOCK: crate::clock::Clock> Baudrate<CLOCK> {
    /// Calculate parameters for a certain baudrate at a certain `CLOCK`
    /// speed.
    pub fn new(baud: u32) -> Baudrate<CLOCK> {
        let (ubrr, u2x) = Self::calc(baud);
        debug_assert!(ubrr <= u16::MAX as u32);

        Baudrate {
            ubrr: ubrr as u16,
            u2x,
            _clock: marker::PhantomData,
        }
    }

    /// Calculate parameters like [`Baudrate::new`], but validate that the
    /// achievable rate stays within a tolerance of the requested one.
    ///
    /// `tolerance` is given in permille of the requested baudrate (`20` means
    /// ±2.0%).  Rates for which no divisor exists at all, or whose best
    /// divisor misses the request by more than the tolerance, are rejected
    /// before any peripheral is configured.
    ///
    /// ```ignore
    /// // 115200 Bd at 16 MHz is off by 2.1% and rejected at ±2.0%:
    /// assert!(Baudrate::<MHz16>::with_tolerance(115200, 20).is_err());
    /// ```
    pub fn with_tolerance(baud: u32, tolerance: u32) -> Result<Baudrate<CLOCK>, BaudrateError> {
        let (ubrr, u2x) = Self::calc(baud);
        if ubrr > u16::MAX as u32 {
            return Err(BaudrateError::OutOfRange);
        }

        let br = Baudrate {
            ubrr: ubrr as u16,
            u2x,
            _clock: marker::PhantomData,
        };
        let actual = br.actual_rate();
        let deviation = if actual > baud {
            actual - baud
        } else {
            baud - actual
        };
        if deviation as u64 * 1000 > baud as u64 * tolerance as u64 {
            return Err(BaudrateError::ToleranceExceeded { actual });
        }
        Ok(br)
    }

    /// Construct a `Baudrate` from given `UBRR#` and `U2X#` values.
    ///
    /// This provides exact control over the resulting clock speed.
    pub fn with_exact(u2x: bool, ubrr: u16) -> Baudrate<CLOCK> {
        Baudrate {
            ubrr,
            u2x,
            _clock: marker::PhantomData,
        }
    }

    /// The rate the selected divisor actually produces, in bits per second.
    pub fn actual_rate(&self) -> u32 {
        let multiplier = if self.u2x { 8 } else { 16 };
        CLOCK::FREQ / (multiplier * (self.ubrr as u32 + 1))
    }

    fn calc(baud: u32) -> (u32, bool) {
        // Try the double-speed divisor first for better resolution, fall
        // back to the normal one when the divisor field would overflow.
        let mut ubrr = (CLOCK::FREQ / 4 / baud - 1) / 2;
        let mut u2x = true;
        if ubrr > 4095 {
            u2x = false;
            ubrr = (CLOCK::FREQ / 8 / baud - 1) / 2;
        }
        (ubrr, u2x)
    }

    fn compare_value(&self) -> u32 {
        if self.u2x {
            8 * (self.ubrr as u32 + 1)
        } else {
            16 * (self.ubrr as u32 + 1)
        }
    }
}

/// Provide a `into_baudrate()` method for integers.
///
/// This extension trait allows conveniently initializing a baudrate by using
///
/// ```ignore
/// let mut serial = Usart0::new(
///     dp.USART0,
///     pins.pd0,
///     pins.pd1.into_output(),
///     57600.into_baudrate(),
/// );
/// ```
///
/// instead of having to call [`Baudrate::new(57600)`](Baudrate::new).
pub trait BaudrateExt {
    /// Calculate baudrate parameters from this number.
    fn into_baudrate<CLOCK: crate::clock::Clock>(self) -> Baudrate<CLOCK>;
}

impl BaudrateExt for u32 {
    fn into_baudrate<CLOCK: crate::clock::Clock>(self) -> Baudrate<CLOCK> {
        Baudrate::new(self)
    }
}

/// Error type for receive operations.
///
/// The receiver hardware flags are read together with each received byte and
/// surface here.  A fault is never retried internally; it applies to the byte
/// the call would have returned, which is discarded to resynchronize the
/// receiver.
#[derive(ufmt::derive::uDebug, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// A received byte was lost because the data register was not read in
    /// time.
    Overrun,
    /// A byte had an invalid stop bit.
    FramingError,
    /// A byte failed the parity check.
    ParityError,
}

/// Events/Interrupts for USART peripherals
#[repr(u8)]
pub enum Event {
    /// A complete byte was received.
    ///
    /// Corresponds to the `USART_RX` or `USART#_RX` interrupt.  Please refer
    /// to the datasheet for your MCU for details.
    RxComplete,

    /// A complete byte was sent.
    ///
    /// Corresponds to the `USART_TX` or `USART#_TX` interrupt.  Please refer
    /// to the datasheet for your MCU for details.
    TxComplete,

    /// All data from the USART data register was transmitted.
    ///
    /// Corresponds to the `USART_UDRE` or `USART#_UDRE` interrupt.  Please
    /// refer to the datasheet for your MCU for details.
    DataRegisterEmpty,
}

/// Internal trait for low-level USART peripherals.
///
/// This trait defines the common interface for all USART peripheral variants.
/// It is used as an intermediate abstraction ontop of which the [`Usart`] API
/// is built.  **Prefer using the [`Usart`] API instead of this trait.**
pub trait UsartOps<H, RX, TX> {
    /// Enable & initialize this USART peripheral to the given baudrate.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_init<CLOCK>(&mut self, baudrate: Baudrate<CLOCK>);
    /// Disable this USART peripheral such that the pins can be used for
    /// other purposes again.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_deinit(&mut self);

    /// Flush all remaining data in the TX buffer.
    ///
    /// This operation must be non-blocking and return
    /// [`nb::Error::WouldBlock`] if not all data was flushed yet.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_flush(&mut self) -> nb::Result<(), void::Void>;
    /// Write a byte to the TX buffer.
    ///
    /// This operation must be non-blocking and return
    /// [`nb::Error::WouldBlock`] until the byte is enqueued.  The operation
    /// should not wait for the byte to have actually been sent.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_write(&mut self, byte: u8) -> nb::Result<(), void::Void>;
    /// Read a byte from the RX buffer.
    ///
    /// This operation must be non-blocking and return
    /// [`nb::Error::WouldBlock`] if no incoming byte is available.  Receiver
    /// status flags belonging to the byte must be reported as an [`Error`].
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_read(&mut self) -> nb::Result<u8, Error>;

    /// Enable/Disable a certain interrupt.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_interrupt(&mut self, event: Event, state: bool);
}

/// USART/Serial driver
///
/// # Example
/// (This example is taken from an ATmega328P board with a 16 MHz clock)
/// ```ignore
/// let dp = avr8_hal::pac::Peripherals::take().unwrap();
/// let pins = avr8_hal::pins!(dp);
/// let mut serial = avr8_hal::Usart0::<avr8_hal::clock::MHz16>::new(
///     dp.USART0,
///     pins.pd0,
///     pins.pd1.into_output(),
///     57600.into_baudrate(),
/// );
///
/// ufmt::uwriteln!(&mut serial, "Hello from AVR!\r").void_unwrap();
///
/// loop {
///     let b = serial.read_byte().unwrap();
///     ufmt::uwriteln!(&mut serial, "Got {}!\r", b).void_unwrap();
/// }
/// ```
pub struct Usart<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> {
    p: USART,
    rx: RX,
    tx: TX,
    _clock: marker::PhantomData<CLOCK>,
    _h: marker::PhantomData<H>,
}

impl<H, USART, RXPIN, TXPIN, CLOCK>
    Usart<
        H,
        USART,
        port::Pin<port::mode::Input, RXPIN>,
        port::Pin<port::mode::Output, TXPIN>,
        CLOCK,
    >
where
    USART: UsartOps<
        H,
        port::Pin<port::mode::Input, RXPIN>,
        port::Pin<port::mode::Output, TXPIN>,
    >,
    RXPIN: port::PinOps,
    TXPIN: port::PinOps,
{
    /// Initialize a USART peripheral on the given pins.
    ///
    /// Note that the RX and TX pins are hardwired for each USART peripheral
    /// and you *must* pass the correct ones.  This is enforced at compile
    /// time.
    pub fn new<IMODE: port::mode::InputMode>(
        p: USART,
        rx: port::Pin<port::mode::Input<IMODE>, RXPIN>,
        tx: port::Pin<port::mode::Output, TXPIN>,
        baudrate: Baudrate<CLOCK>,
    ) -> Self {
        let mut usart = Self {
            p,
            rx: rx.forget_imode(),
            tx,
            _clock: marker::PhantomData,
            _h: marker::PhantomData,
        };
        usart.p.raw_init(baudrate);
        usart
    }
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> Usart<H, USART, RX, TX, CLOCK> {
    /// Deinitialize/disable this peripheral and release the pins.
    pub fn release(mut self) -> (USART, RX, TX) {
        self.p.raw_deinit();
        (self.p, self.rx, self.tx)
    }

    /// Block until all remaining data has been transmitted.
    pub fn flush(&mut self) {
        nb::block!(self.p.raw_flush()).void_unwrap()
    }

    /// Transmit a byte.
    ///
    /// This method will block until the byte has been enqueued for
    /// transmission but **not** until it was entirely sent.
    pub fn write_byte(&mut self, byte: u8) {
        nb::block!(self.p.raw_write(byte)).void_unwrap()
    }

    /// Receive a byte.
    ///
    /// This method will block until a byte could be received.  Receiver
    /// faults (overrun, framing, parity) for the incoming byte are returned
    /// as an [`Error`].
    pub fn read_byte(&mut self) -> Result<u8, Error> {
        nb::block!(self.p.raw_read())
    }

    /// Enable the interrupt for [`Event`].
    pub fn listen(&mut self, event: Event) {
        self.p.raw_interrupt(event, true);
    }

    /// Disable the interrupt for [`Event`].
    pub fn unlisten(&mut self, event: Event) {
        self.p.raw_interrupt(event, false);
    }

    /// Split this USART into a [`UsartReader`] and a [`UsartWriter`].
    ///
    /// This allows concurrently receiving and transmitting data from
    /// different contexts.
    pub fn split(
        self,
    ) -> (
        UsartReader<H, USART, RX, TX, CLOCK>,
        UsartWriter<H, USART, RX, TX, CLOCK>,
    ) {
        (
            UsartReader {
                p: unsafe { core::ptr::read(&self.p) },
                rx: self.rx,
                _tx: marker::PhantomData,
                _clock: marker::PhantomData,
                _h: marker::PhantomData,
            },
            UsartWriter {
                p: self.p,
                tx: self.tx,
                _rx: marker::PhantomData,
                _clock: marker::PhantomData,
                _h: marker::PhantomData,
            },
        )
    }
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> ufmt::uWrite for Usart<H, USART, RX, TX, CLOCK> {
    type Error = void::Void;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        for b in s.as_bytes().iter() {
            self.write_byte(*b);
        }
        Ok(())
    }
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> crate::hal::serial::Write<u8>
    for Usart<H, USART, RX, TX, CLOCK>
{
    type Error = void::Void;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.p.raw_write(byte)
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.p.raw_flush()
    }
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> crate::hal::blocking::serial::write::Default<u8>
    for Usart<H, USART, RX, TX, CLOCK>
{
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> crate::hal::serial::Read<u8>
    for Usart<H, USART, RX, TX, CLOCK>
{
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.p.raw_read()
    }
}

/// Writer half of a [`Usart`] peripheral.
///
/// Created by calling [`Usart::split`].  Splitting a peripheral into reader
/// and writer allows concurrently receiving and transmitting data from
/// different contexts.
///
/// The writer half most notably implements [`embedded_hal::serial::Write`]
/// and [`ufmt::uWrite`] for transmitting data.
pub struct UsartWriter<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> {
    p: USART,
    tx: TX,
    _rx: marker::PhantomData<RX>,
    _clock: marker::PhantomData<CLOCK>,
    _h: marker::PhantomData<H>,
}

/// Reader half of a [`Usart`] peripheral.
///
/// Created by calling [`Usart::split`].  Splitting a peripheral into reader
/// and writer allows concurrently receiving and transmitting data from
/// different contexts.
///
/// The reader half most notably implements [`embedded_hal::serial::Read`]
/// for receiving data.
pub struct UsartReader<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> {
    p: USART,
    rx: RX,
    _tx: marker::PhantomData<TX>,
    _clock: marker::PhantomData<CLOCK>,
    _h: marker::PhantomData<H>,
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> UsartWriter<H, USART, RX, TX, CLOCK> {
    /// Merge this `UsartWriter` with a [`UsartReader`] back into a single
    /// [`Usart`] peripheral.
    pub fn reunite(
        self,
        other: UsartReader<H, USART, RX, TX, CLOCK>,
    ) -> Usart<H, USART, RX, TX, CLOCK> {
        Usart {
            p: self.p,
            rx: other.rx,
            tx: self.tx,
            _clock: marker::PhantomData,
            _h: marker::PhantomData,
        }
    }
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> UsartReader<H, USART, RX, TX, CLOCK> {
    /// Merge this `UsartReader` with a [`UsartWriter`] back into a single
    /// [`Usart`] peripheral.
    pub fn reunite(
        self,
        other: UsartWriter<H, USART, RX, TX, CLOCK>,
    ) -> Usart<H, USART, RX, TX, CLOCK> {
        Usart {
            p: self.p,
            rx: self.rx,
            tx: other.tx,
            _clock: marker::PhantomData,
            _h: marker::PhantomData,
        }
    }
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> ufmt::uWrite
    for UsartWriter<H, USART, RX, TX, CLOCK>
{
    type Error = void::Void;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        for b in s.as_bytes().iter() {
            nb::block!(self.p.raw_write(*b)).void_unwrap()
        }
        Ok(())
    }
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> crate::hal::serial::Write<u8>
    for UsartWriter<H, USART, RX, TX, CLOCK>
{
    type Error = void::Void;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.p.raw_write(byte)
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.p.raw_flush()
    }
}

impl<H, USART: UsartOps<H, RX, TX>, RX, TX, CLOCK> crate::hal::serial::Read<u8>
    for UsartReader<H, USART, RX, TX, CLOCK>
{
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.p.raw_read()
    }
}

/// Implement [`UsartOps`](crate::usart::UsartOps) for a `USART#` peripheral
/// with numbered registers (`UBRR#`, `UCSR#A`, ...).
#[macro_export]
macro_rules! impl_usart {
    (
        hal: $HAL:ty,
        peripheral: $USART:ty,
        register_suffix: $n:expr,
        rx: $rxpin:ty,
        tx: $txpin:ty,
    ) => {
        $crate::paste::paste! {
            impl $crate::usart::UsartOps<
                $HAL,
                $crate::port::Pin<$crate::port::mode::Input, $rxpin>,
                $crate::port::Pin<$crate::port::mode::Output, $txpin>,
            > for $USART {
                fn raw_init<CLOCK>(&mut self, baudrate: $crate::usart::Baudrate<CLOCK>) {
                    self.[<ubrr $n>].write(|w| unsafe { w.bits(baudrate.ubrr) });
                    self.[<ucsr $n a>].write(|w| w.[<u2x $n>]().bit(baudrate.u2x));

                    // Enable receiver and transmitter but leave interrupts
                    // disabled.
                    self.[<ucsr $n b>].write(|w| w
                        .[<txen $n>]().set_bit()
                        .[<rxen $n>]().set_bit()
                    );

                    // Set frame format to 8n1 for now.  At some point, this
                    // should be made configurable.
                    self.[<ucsr $n c>].write(|w| w
                        .[<umsel $n>]().usart_async()
                        .[<ucsz $n>]().chr8()
                        .[<usbs $n>]().stop1()
                        .[<upm $n>]().disabled()
                    );
                }

                fn raw_deinit(&mut self) {
                    // Wait for any ongoing transfer to finish.
                    $crate::nb::block!(self.raw_flush()).ok();
                    self.[<ucsr $n b>].reset();
                }

                fn raw_flush(&mut self) -> $crate::nb::Result<(), $crate::void::Void> {
                    if self.[<ucsr $n a>].read().[<udre $n>]().bit_is_clear() {
                        Err($crate::nb::Error::WouldBlock)
                    } else {
                        Ok(())
                    }
                }

                fn raw_write(&mut self, byte: u8) -> $crate::nb::Result<(), $crate::void::Void> {
                    // Call flush to make sure the data-register is empty
                    self.raw_flush()?;

                    self.[<udr $n>].write(|w| unsafe { w.bits(byte) });
                    Ok(())
                }

                fn raw_read(&mut self) -> $crate::nb::Result<u8, $crate::usart::Error> {
                    let status = self.[<ucsr $n a>].read();
                    if status.[<rxc $n>]().bit_is_clear() {
                        return Err($crate::nb::Error::WouldBlock);
                    }

                    // The receiver flags belong to the frame at the head of
                    // the FIFO, so they must be captured before reading the
                    // data register.
                    let err = if status.[<fe $n>]().bit_is_set() {
                        Some($crate::usart::Error::FramingError)
                    } else if status.[<dor $n>]().bit_is_set() {
                        Some($crate::usart::Error::Overrun)
                    } else if status.[<upe $n>]().bit_is_set() {
                        Some($crate::usart::Error::ParityError)
                    } else {
                        None
                    };

                    let byte = self.[<udr $n>].read().bits();
                    match err {
                        Some(err) => Err($crate::nb::Error::Other(err)),
                        None => Ok(byte),
                    }
                }

                fn raw_interrupt(&mut self, event: $crate::usart::Event, state: bool) {
                    match event {
                        $crate::usart::Event::RxComplete =>
                            self.[<ucsr $n b>].modify(|_, w| w.[<rxcie $n>]().bit(state)),
                        $crate::usart::Event::TxComplete =>
                            self.[<ucsr $n b>].modify(|_, w| w.[<txcie $n>]().bit(state)),
                        $crate::usart::Event::DataRegisterEmpty =>
                            self.[<ucsr $n b>].modify(|_, w| w.[<udrie $n>]().bit(state)),
                    }
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{MHz16, MHz8};
    use crate::port::{mode, Pin, PinOps};

    #[test]
    fn baudrate_divisors_match_datasheet() {
        // Values from the ATmega328P datasheet table for a 16 MHz clock
        let br = Baudrate::<MHz16>::new(9600);
        assert_eq!((br.ubrr, br.u2x), (207, true));

        let br = Baudrate::<MHz16>::new(57600);
        assert_eq!((br.ubrr, br.u2x), (34, true));

        let br = Baudrate::<MHz16>::new(115200);
        assert_eq!((br.ubrr, br.u2x), (16, true));
    }

    #[test]
    fn slow_baudrates_fall_back_to_single_speed() {
        let br = Baudrate::<MHz16>::new(300);
        assert!(!br.u2x);
        // Best-case divisor deviates by far less than 0.1%
        let actual = br.actual_rate();
        assert!((actual as i32 - 300).unsigned_abs() <= 1, "{}", actual);
    }

    #[test]
    fn tolerance_check_accepts_close_rates() {
        // 9600 Bd at 16 MHz is off by only 0.2%
        let br = Baudrate::<MHz16>::with_tolerance(9600, 20).unwrap();
        assert_eq!(br.actual_rate(), 9615);
    }

    #[test]
    fn tolerance_check_rejects_marginal_rates() {
        // 115200 Bd at 16 MHz misses by 2.1%, outside a ±2.0% budget...
        assert_eq!(
            Baudrate::<MHz16>::with_tolerance(115200, 20),
            Err(BaudrateError::ToleranceExceeded { actual: 117647 })
        );
        // ...but acceptable with ±2.5%
        assert!(Baudrate::<MHz16>::with_tolerance(115200, 25).is_ok());
    }

    #[test]
    fn unattainable_rates_are_rejected() {
        assert_eq!(
            Baudrate::<MHz16>::with_tolerance(1, 1000),
            Err(BaudrateError::OutOfRange)
        );
    }

    #[test]
    fn exact_divisors_are_not_recalculated() {
        let br = Baudrate::<MHz8>::with_exact(false, 12);
        assert_eq!((br.ubrr, br.u2x), (12, false));
        assert_eq!(br.actual_rate(), 38461);
    }

    // ---- generic driver tests through a mock UsartOps ----

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

    mock_pin!(MockRx);
    mock_pin!(MockTx);

    type MockRxPin = Pin<mode::Input, MockRx>;
    type MockTxPin = Pin<mode::Output, MockTx>;

    #[derive(Default)]
    struct MockUsart {
        init: Option<(u16, bool)>,
        deinit: bool,
        sent: Vec<u8>,
        incoming: std::collections::VecDeque<nb::Result<u8, Error>>,
    }

    impl UsartOps<(), MockRxPin, MockTxPin> for MockUsart {
        fn raw_init<CLOCK>(&mut self, baudrate: Baudrate<CLOCK>) {
            self.init = Some((baudrate.ubrr, baudrate.u2x));
        }

        fn raw_deinit(&mut self) {
            self.deinit = true;
        }

        fn raw_flush(&mut self) -> nb::Result<(), void::Void> {
            Ok(())
        }

        fn raw_write(&mut self, byte: u8) -> nb::Result<(), void::Void> {
            self.sent.push(byte);
            Ok(())
        }

        fn raw_read(&mut self) -> nb::Result<u8, Error> {
            self.incoming
                .pop_front()
                .unwrap_or(Err(nb::Error::WouldBlock))
        }

        fn raw_interrupt(&mut self, _event: Event, _state: bool) {}
    }

    fn mock_usart(
        incoming: &[nb::Result<u8, Error>],
    ) -> Usart<(), MockUsart, MockRxPin, MockTxPin, MHz16> {
        let p = MockUsart {
            incoming: incoming.iter().cloned().collect(),
            ..Default::default()
        };
        let rx = Pin::new(MockRx).forget_imode();
        let tx = Pin::new(MockTx).into_output();
        Usart::new(p, rx, tx, Baudrate::new(9600))
    }

    #[test]
    fn construction_initializes_the_peripheral() {
        let usart = mock_usart(&[]);
        let (p, _, _) = usart.release();
        assert_eq!(p.init, Some((207, true)));
        assert!(p.deinit);
    }

    #[test]
    fn writes_are_sequential_and_complete() {
        let mut usart = mock_usart(&[]);
        ufmt::uwriteln!(&mut usart, "ok").void_unwrap();
        let (p, _, _) = usart.release();
        assert_eq!(p.sent, b"ok\n");
    }

    #[test]
    fn read_byte_busy_waits_until_data_is_available() {
        let mut usart = mock_usart(&[
            Err(nb::Error::WouldBlock),
            Err(nb::Error::WouldBlock),
            Ok(0xAA),
        ]);
        assert_eq!(usart.read_byte(), Ok(0xAA));
    }

    #[test]
    fn receiver_faults_surface_as_errors() {
        let mut usart = mock_usart(&[
            Err(nb::Error::Other(Error::FramingError)),
            Ok(0x55),
        ]);
        assert_eq!(usart.read_byte(), Err(Error::FramingError));
        // The faulted byte is discarded, the stream continues
        assert_eq!(usart.read_byte(), Ok(0x55));
    }
}
