//! I2C Implementations
//!
//! The [`I2c`] driver runs the two-wire interface in master mode.  Multi-phase
//! transactions (start, address, data, stop) are built from the raw
//! [`I2cOps`] primitives; a NACK or a lost arbitration aborts the transaction
//! and is surfaced as an [`Error`] instead of blocking indefinitely.

use core::marker::PhantomData;

use crate::port;

/// TWI Status Codes
pub mod twi_status {
    // The status codes defined in the datasheet are meant to be used with the
    // masked status value: (TWSR & TW_STATUS_MASK).  In our case, the PAC
    // field accessor already shifts the value, so all status codes need to be
    // shifted to the right as well.

    /// Start condition transmitted
    pub const TW_START: u8 = 0x08 >> 3;

    /// Repeated start condition transmitted
    pub const TW_REP_START: u8 = 0x10 >> 3;

    // Master Transmitter -----------------------------------------------------
    /// SLA+W transmitted, ACK received
    pub const TW_MT_SLA_ACK: u8 = 0x18 >> 3;

    /// SLA+W transmitted, NACK received
    pub const TW_MT_SLA_NACK: u8 = 0x20 >> 3;

    /// Data transmitted, ACK received
    pub const TW_MT_DATA_ACK: u8 = 0x28 >> 3;

    /// Data transmitted, NACK received
    pub const TW_MT_DATA_NACK: u8 = 0x30 >> 3;

    /// Arbitration lost in SLA+W or data
    pub const TW_MT_ARB_LOST: u8 = 0x38 >> 3;

    // Master Receiver --------------------------------------------------------
    /// Arbitration lost in SLA+R or NACK
    pub const TW_MR_ARB_LOST: u8 = 0x38 >> 3;

    /// SLA+R transmitted, ACK received
    pub const TW_MR_SLA_ACK: u8 = 0x40 >> 3;

    /// SLA+R transmitted, NACK received
    pub const TW_MR_SLA_NACK: u8 = 0x48 >> 3;

    /// Data received, ACK returned
    pub const TW_MR_DATA_ACK: u8 = 0x50 >> 3;

    /// Data received, NACK returned
    pub const TW_MR_DATA_NACK: u8 = 0x58 >> 3;

    // Misc -------------------------------------------------------------------
    /// No state information available
    pub const TW_NO_INFO: u8 = 0xF8 >> 3;

    /// Illegal start or stop condition
    pub const TW_BUS_ERROR: u8 = 0x00 >> 3;
}

/// I2C Error
#[derive(ufmt::derive::uDebug, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// Lost arbitration while trying to acquire bus
    ArbitrationLost,
    /// No slave answered for this address or a slave replied NACK
    AddressNack,
    /// Slave replied NACK to sent data
    DataNack,
    /// A bus-error occurred
    BusError,
    /// An unknown error occurred.  The bus might be in an unknown state.
    Unknown,
}

/// I2C Transfer Direction
#[derive(ufmt::derive::uDebug, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    /// Write to a slave (LSB is 0)
    Write,
    /// Read from a slave (LSB is 1)
    Read,
}

/// Internal trait for low-level I2C peripherals
///
/// This trait defines the common interface for all I2C peripheral variants.
/// It is used as an intermediate abstraction ontop of which the [`I2c`] API
/// is built.  **Prefer using the [`I2c`] API instead of this trait.**
pub trait I2cOps<H, SDA, SCL> {
    /// Setup the bus for operation at a certain speed.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_setup<CLOCK: crate::clock::Clock>(&mut self, speed: u32);

    /// Start a bus transaction to a certain `address` in either read or
    /// write mode.
    ///
    /// A NACK at the address phase must release the bus again (stop
    /// condition) before the error is returned, so a failed transaction is
    /// never left open.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_start(&mut self, address: u8, direction: Direction) -> Result<(), Error>;

    /// Send some bytes to the bus.
    ///
    /// This method must only be called after a transaction in write mode was
    /// successfully started.  A NACK for a data byte must release the bus
    /// before the error is returned; after any error, no further bytes are
    /// clocked out.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_write(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// Receive some bytes from the bus, ACKing all but the final byte.
    ///
    /// This method must only be called after a transaction in read mode was
    /// successfully started.  The caller must end the transfer with either a
    /// stop or a repeated start condition.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_read(&mut self, buffer: &mut [u8]) -> Result<(), Error>;

    /// Send a stop condition and release the bus.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_stop(&mut self);
}

/// I2C driver (master mode only)
///
/// # Example
/// ```ignore
/// let dp = avr8_hal::pac::Peripherals::take().unwrap();
/// let pins = avr8_hal::pins!(dp);
///
/// let mut i2c = avr8_hal::I2c::<avr8_hal::clock::MHz16>::new(
///     dp.TWI,
///     pins.pc4.into_pull_up_input(),
///     pins.pc5.into_pull_up_input(),
///     50_000,
/// );
///
/// i2c.write(0x33, &[0xAA, 0xBB]).unwrap();
/// ```
pub struct I2c<H, I2C: I2cOps<H, SDA, SCL>, SDA, SCL, CLOCK> {
    p: I2C,
    sda: SDA,
    scl: SCL,
    _clock: PhantomData<CLOCK>,
    _h: PhantomData<H>,
}

impl<H, I2C, SDAPIN, SCLPIN, CLOCK>
    I2c<
        H,
        I2C,
        port::Pin<port::mode::Input, SDAPIN>,
        port::Pin<port::mode::Input, SCLPIN>,
        CLOCK,
    >
where
    I2C: I2cOps<H, port::Pin<port::mode::Input, SDAPIN>, port::Pin<port::mode::Input, SCLPIN>>,
    SDAPIN: port::PinOps,
    SCLPIN: port::PinOps,
    CLOCK: crate::clock::Clock,
{
    /// Initialize the I2C bus
    ///
    /// `new()` requires the internal pull-ups to be enabled, which complies
    /// with the I2C specification.  If you have external pull-ups connected,
    /// please use [`I2c::with_external_pullup`] instead.
    pub fn new(
        p: I2C,
        sda: port::Pin<port::mode::Input<port::mode::PullUp>, SDAPIN>,
        scl: port::Pin<port::mode::Input<port::mode::PullUp>, SCLPIN>,
        speed: u32,
    ) -> Self {
        let mut i2c = Self {
            p,
            sda: sda.forget_imode(),
            scl: scl.forget_imode(),
            _clock: PhantomData,
            _h: PhantomData,
        };
        i2c.p.raw_setup::<CLOCK>(speed);
        i2c
    }

    /// Initialize the I2C bus, without enabling internal pull-ups
    ///
    /// This function should be used if your hardware design includes pull-up
    /// resistors outside the MCU.  If you do not have these, please use
    /// [`I2c::new`] instead.
    pub fn with_external_pullup(
        p: I2C,
        sda: port::Pin<port::mode::Input<port::mode::Floating>, SDAPIN>,
        scl: port::Pin<port::mode::Input<port::mode::Floating>, SCLPIN>,
        speed: u32,
    ) -> Self {
        let mut i2c = Self {
            p,
            sda: sda.forget_imode(),
            scl: scl.forget_imode(),
            _clock: PhantomData,
            _h: PhantomData,
        };
        i2c.p.raw_setup::<CLOCK>(speed);
        i2c
    }
}

impl<H, I2C: I2cOps<H, SDA, SCL>, SDA, SCL, CLOCK> I2c<H, I2C, SDA, SCL, CLOCK>
where
    CLOCK: crate::clock::Clock,
{
    /// Check whether a slave answers ACK for a given address
    ///
    /// Note that some devices might not respond to both read and write
    /// operations.
    pub fn ping_slave(&mut self, addr: u8, dir: Direction) -> Result<bool, Error> {
        match self.p.raw_start(addr, dir) {
            Err(Error::AddressNack) => Ok(false),
            Err(e) => Err(e),
            Ok(()) => {
                self.p.raw_stop();
                Ok(true)
            }
        }
    }

    /// Output an `i2cdetect`-like summary of connected slaves to a serial
    /// device
    ///
    /// The delay is needed to let slow devices settle between probes.  Note
    /// that output for `Read` and `Write` might differ.
    pub fn i2cdetect<W: ufmt::uWrite, D: crate::hal::blocking::delay::DelayMs<u16>>(
        &mut self,
        w: &mut W,
        delay: &mut D,
        dir: Direction,
    ) -> Result<(), W::Error> {
        i2cdetect(w, |addr| {
            delay.delay_ms(10u16);
            self.ping_slave(addr, dir)
        })
    }

    /// Release the peripheral and the bus pins.
    pub fn release(self) -> (I2C, SDA, SCL) {
        (self.p, self.sda, self.scl)
    }
}

impl<H, I2C: I2cOps<H, SDA, SCL>, SDA, SCL, CLOCK> crate::hal::blocking::i2c::Write
    for I2c<H, I2C, SDA, SCL, CLOCK>
where
    CLOCK: crate::clock::Clock,
{
    type Error = Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.p.raw_start(address, Direction::Write)?;
        self.p.raw_write(bytes)?;
        self.p.raw_stop();
        Ok(())
    }
}

impl<H, I2C: I2cOps<H, SDA, SCL>, SDA, SCL, CLOCK> crate::hal::blocking::i2c::Read
    for I2c<H, I2C, SDA, SCL, CLOCK>
where
    CLOCK: crate::clock::Clock,
{
    type Error = Error;

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.p.raw_start(address, Direction::Read)?;
        self.p.raw_read(buffer)?;
        self.p.raw_stop();
        Ok(())
    }
}

impl<H, I2C: I2cOps<H, SDA, SCL>, SDA, SCL, CLOCK> crate::hal::blocking::i2c::WriteRead
    for I2c<H, I2C, SDA, SCL, CLOCK>
where
    CLOCK: crate::clock::Clock,
{
    type Error = Error;

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.p.raw_start(address, Direction::Write)?;
        self.p.raw_write(bytes)?;
        // Repeated start, no stop in between
        self.p.raw_start(address, Direction::Read)?;
        self.p.raw_read(buffer)?;
        self.p.raw_stop();
        Ok(())
    }
}

#[doc(hidden)]
pub fn i2cdetect<W: ufmt::uWrite, F>(s: &mut W, mut f: F) -> Result<(), W::Error>
where
    // Detection function
    F: FnMut(u8) -> Result<bool, Error>,
{
    s.write_str(
        "\
-    0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f\r\n\
00:      ",
    )?;

    fn u4_to_hex(b: u8) -> char {
        match b {
            x if x < 0xa => (0x30 + x).into(),
            x if x < 0x10 => (0x57 + x).into(),
            _ => '?',
        }
    }

    for addr in 0x02..=0x77 {
        let (ah, al) = (u4_to_hex(addr >> 4), u4_to_hex(addr & 0xf));

        if addr % 0x10 == 0 {
            s.write_str("\r\n")?;
            s.write_char(ah)?;
            s.write_str("0:")?;
        }

        match f(addr) {
            Ok(true) => {
                s.write_char(' ')?;
                s.write_char(ah)?;
                s.write_char(al)?;
            }
            Ok(false) => {
                s.write_str(" --")?;
            }
            Err(e) => {
                s.write_str(" E")?;
                s.write_char(u4_to_hex(e as u8))?;
            }
        }
    }

    s.write_str("\r\n")?;

    Ok(())
}

/// Implement [`I2cOps`](crate::i2c::I2cOps) for the TWI peripheral of one
/// chip.
#[macro_export]
macro_rules! impl_twi {
    (
        hal: $HAL:ty,
        peripheral: $I2C:ty,
        sda: $sdapin:ty,
        scl: $sclpin:ty,
    ) => {
        impl
            $crate::i2c::I2cOps<
                $HAL,
                $crate::port::Pin<$crate::port::mode::Input, $sdapin>,
                $crate::port::Pin<$crate::port::mode::Input, $sclpin>,
            > for $I2C
        {
            fn raw_setup<CLOCK: $crate::clock::Clock>(&mut self, speed: u32) {
                // Calculate TWBR from
                //
                //      SCL frequency = CPU Clock Frequency
                //                     --------------------------------
                //                     16 + 2(TWBR) * (Prescaler Value)
                //
                // Setting the prescaler to 1 makes the math easy.
                let twbr = ((CLOCK::FREQ / speed) - 16) / 2;
                debug_assert!(twbr <= u8::MAX as u32);
                self.twbr.write(|w| unsafe { w.bits(twbr as u8) });
                self.twsr.write(|w| w.twps().prescaler_1());
            }

            fn raw_start(
                &mut self,
                address: u8,
                direction: $crate::i2c::Direction,
            ) -> Result<(), $crate::i2c::Error> {
                // Write start condition
                self.twcr.write(|w| w
                    .twen().set_bit()
                    .twint().set_bit()
                    .twsta().set_bit()
                );
                while self.twcr.read().twint().bit_is_clear() {}

                // Validate status
                match self.twsr.read().tws().bits() {
                    $crate::i2c::twi_status::TW_START
                    | $crate::i2c::twi_status::TW_REP_START => (),
                    $crate::i2c::twi_status::TW_MT_ARB_LOST
                    | $crate::i2c::twi_status::TW_MR_ARB_LOST => {
                        return Err($crate::i2c::Error::ArbitrationLost);
                    }
                    $crate::i2c::twi_status::TW_BUS_ERROR => {
                        return Err($crate::i2c::Error::BusError);
                    }
                    _ => {
                        return Err($crate::i2c::Error::Unknown);
                    }
                }

                // Send the address with the direction bit appended
                let dirbit = if direction == $crate::i2c::Direction::Read {
                    1
                } else {
                    0
                };
                let rawaddr = (address << 1) | dirbit;
                self.twdr.write(|w| unsafe { w.bits(rawaddr) });
                self.twcr.write(|w| w.twen().set_bit().twint().set_bit());
                while self.twcr.read().twint().bit_is_clear() {}

                // Check if the slave responded
                match self.twsr.read().tws().bits() {
                    $crate::i2c::twi_status::TW_MT_SLA_ACK
                    | $crate::i2c::twi_status::TW_MR_SLA_ACK => (),
                    $crate::i2c::twi_status::TW_MT_SLA_NACK
                    | $crate::i2c::twi_status::TW_MR_SLA_NACK => {
                        // Stop the transaction if it did not respond
                        self.raw_stop();
                        return Err($crate::i2c::Error::AddressNack);
                    }
                    $crate::i2c::twi_status::TW_MT_ARB_LOST
                    | $crate::i2c::twi_status::TW_MR_ARB_LOST => {
                        return Err($crate::i2c::Error::ArbitrationLost);
                    }
                    $crate::i2c::twi_status::TW_BUS_ERROR => {
                        return Err($crate::i2c::Error::BusError);
                    }
                    _ => {
                        return Err($crate::i2c::Error::Unknown);
                    }
                }

                Ok(())
            }

            fn raw_write(&mut self, bytes: &[u8]) -> Result<(), $crate::i2c::Error> {
                for byte in bytes {
                    self.twdr.write(|w| unsafe { w.bits(*byte) });
                    self.twcr.write(|w| w.twen().set_bit().twint().set_bit());
                    while self.twcr.read().twint().bit_is_clear() {}

                    match self.twsr.read().tws().bits() {
                        $crate::i2c::twi_status::TW_MT_DATA_ACK => (),
                        $crate::i2c::twi_status::TW_MT_DATA_NACK => {
                            self.raw_stop();
                            return Err($crate::i2c::Error::DataNack);
                        }
                        $crate::i2c::twi_status::TW_MT_ARB_LOST => {
                            return Err($crate::i2c::Error::ArbitrationLost);
                        }
                        $crate::i2c::twi_status::TW_BUS_ERROR => {
                            return Err($crate::i2c::Error::BusError);
                        }
                        _ => {
                            return Err($crate::i2c::Error::Unknown);
                        }
                    }
                }
                Ok(())
            }

            fn raw_read(&mut self, buffer: &mut [u8]) -> Result<(), $crate::i2c::Error> {
                let last = buffer.len() - 1;
                for (i, byte) in buffer.iter_mut().enumerate() {
                    if i != last {
                        // ACK each byte except the final one
                        self.twcr.write(|w| w
                            .twint().set_bit()
                            .twen().set_bit()
                            .twea().set_bit()
                        );
                    } else {
                        // No ACK for the final byte; the caller ends the
                        // transfer with a stop or repeated start condition.
                        self.twcr.write(|w| w.twint().set_bit().twen().set_bit());
                    }
                    while self.twcr.read().twint().bit_is_clear() {}

                    match self.twsr.read().tws().bits() {
                        $crate::i2c::twi_status::TW_MR_DATA_ACK
                        | $crate::i2c::twi_status::TW_MR_DATA_NACK => (),
                        $crate::i2c::twi_status::TW_MR_ARB_LOST => {
                            return Err($crate::i2c::Error::ArbitrationLost);
                        }
                        $crate::i2c::twi_status::TW_BUS_ERROR => {
                            return Err($crate::i2c::Error::BusError);
                        }
                        _ => {
                            return Err($crate::i2c::Error::Unknown);
                        }
                    }

                    *byte = self.twdr.read().bits();
                }
                Ok(())
            }

            fn raw_stop(&mut self) {
                self.twcr.write(|w| w
                    .twen().set_bit()
                    .twint().set_bit()
                    .twsto().set_bit()
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MHz16;
    use crate::port::{Pin, PinOps};
    use embedded_hal::blocking::i2c::{Read, Write, WriteRead};

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

    mock_pin!(MockSda);
    mock_pin!(MockScl);

    type MockSdaPin = Pin<crate::port::mode::Input, MockSda>;
    type MockSclPin = Pin<crate::port::mode::Input, MockScl>;

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum BusOp {
        Setup(u32),
        Start(u8, Direction),
        WriteByte(u8),
        ReadBytes(usize),
        Stop,
    }

    /// Records the exact sequence of bus primitives.  Can be programmed to
    /// NACK the address phase or a data byte.
    #[derive(Default)]
    struct MockTwi {
        log: Vec<BusOp>,
        nack_address: bool,
        nack_data_after: Option<usize>,
    }

    impl I2cOps<(), MockSdaPin, MockSclPin> for MockTwi {
        fn raw_setup<CLOCK: crate::clock::Clock>(&mut self, speed: u32) {
            self.log.push(BusOp::Setup(speed));
        }

        fn raw_start(&mut self, address: u8, direction: Direction) -> Result<(), Error> {
            self.log.push(BusOp::Start(address, direction));
            if self.nack_address {
                // Contract: a NACKed address phase releases the bus
                self.raw_stop();
                return Err(Error::AddressNack);
            }
            Ok(())
        }

        fn raw_write(&mut self, bytes: &[u8]) -> Result<(), Error> {
            for (i, byte) in bytes.iter().enumerate() {
                if self.nack_data_after == Some(i) {
                    self.raw_stop();
                    return Err(Error::DataNack);
                }
                self.log.push(BusOp::WriteByte(*byte));
            }
            Ok(())
        }

        fn raw_read(&mut self, buffer: &mut [u8]) -> Result<(), Error> {
            self.log.push(BusOp::ReadBytes(buffer.len()));
            buffer.fill(0xA5);
            Ok(())
        }

        fn raw_stop(&mut self) {
            self.log.push(BusOp::Stop);
        }
    }

    fn mock_i2c(p: MockTwi) -> I2c<(), MockTwi, MockSdaPin, MockSclPin, MHz16> {
        I2c::new(
            p,
            Pin::new(MockSda).into_pull_up_input(),
            Pin::new(MockScl).into_pull_up_input(),
            100_000,
        )
    }

    #[test]
    fn write_transaction_is_start_data_stop() {
        let mut i2c = mock_i2c(MockTwi::default());
        i2c.write(0x33, &[0x01, 0x02]).unwrap();
        let (p, _, _) = i2c.release();
        assert_eq!(
            p.log,
            [
                BusOp::Setup(100_000),
                BusOp::Start(0x33, Direction::Write),
                BusOp::WriteByte(0x01),
                BusOp::WriteByte(0x02),
                BusOp::Stop,
            ]
        );
    }

    #[test]
    fn address_nack_aborts_before_any_data() {
        let mut i2c = mock_i2c(MockTwi {
            nack_address: true,
            ..Default::default()
        });
        assert_eq!(i2c.write(0x33, &[0x01, 0x02]), Err(Error::AddressNack));
        let (p, _, _) = i2c.release();
        // The bus was released and no data byte was clocked out
        assert_eq!(
            p.log,
            [
                BusOp::Setup(100_000),
                BusOp::Start(0x33, Direction::Write),
                BusOp::Stop,
            ]
        );
    }

    #[test]
    fn data_nack_stops_the_bus_exactly_once() {
        let mut i2c = mock_i2c(MockTwi {
            nack_data_after: Some(1),
            ..Default::default()
        });
        assert_eq!(i2c.write(0x50, &[0xAA, 0xBB, 0xCC]), Err(Error::DataNack));
        let (p, _, _) = i2c.release();
        assert_eq!(
            p.log,
            [
                BusOp::Setup(100_000),
                BusOp::Start(0x50, Direction::Write),
                BusOp::WriteByte(0xAA),
                BusOp::Stop,
            ]
        );
    }

    #[test]
    fn write_read_uses_a_repeated_start() {
        let mut i2c = mock_i2c(MockTwi::default());
        let mut buf = [0u8; 2];
        i2c.write_read(0x68, &[0x75], &mut buf).unwrap();
        assert_eq!(buf, [0xA5, 0xA5]);
        let (p, _, _) = i2c.release();
        assert_eq!(
            p.log,
            [
                BusOp::Setup(100_000),
                BusOp::Start(0x68, Direction::Write),
                BusOp::WriteByte(0x75),
                BusOp::Start(0x68, Direction::Read),
                BusOp::ReadBytes(2),
                BusOp::Stop,
            ]
        );
    }

    #[test]
    fn ping_slave_maps_address_nack_to_false() {
        let mut i2c = mock_i2c(MockTwi {
            nack_address: true,
            ..Default::default()
        });
        assert_eq!(i2c.ping_slave(0x20, Direction::Write), Ok(false));

        let mut i2c = mock_i2c(MockTwi::default());
        assert_eq!(i2c.ping_slave(0x20, Direction::Write), Ok(true));
    }

    #[test]
    fn read_transaction_fills_the_buffer() {
        let mut i2c = mock_i2c(MockTwi::default());
        let mut buf = [0u8; 3];
        i2c.read(0x44, &mut buf).unwrap();
        assert_eq!(buf, [0xA5; 3]);
    }
}
