//! HAL abstraction for the on-chip EEPROM
//!
//! All accesses go through the [`Eeprom`] driver, which enforces the address
//! range at the API boundary and wraps the multi-write programming sequences
//! in critical sections.  The driver also implements the
//! [`embedded-storage`] NorFlash traits so generic storage code can run on
//! top of it.
//!
//! [`embedded-storage`]: https://docs.rs/embedded-storage/0.3

use core::marker;

#[derive(ufmt::derive::uDebug, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBoundsError;

/// Internal trait for low-level EEPROM peripherals.
///
/// This trait defines the common interface for all EEPROM peripheral
/// variants.  **Prefer using the [`Eeprom`] API instead of this trait.**
pub trait EepromOps<H> {
    const CAPACITY: u16;

    /// Read a single byte.  The address is assumed to be in range.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_read_byte(&self, address: u16) -> u8;
    /// Program a single byte, choosing the cheapest erase/write mode for the
    /// actual bit changes.  The address is assumed to be in range.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_write_byte(&mut self, address: u16, data: u8);
    /// Erase a single byte back to `0xFF`.  The address is assumed to be in
    /// range.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_erase_byte(&mut self, address: u16);
}

pub struct Eeprom<H, EEPROM> {
    p: EEPROM,
    _h: marker::PhantomData<H>,
}

impl<H, EEPROM> Eeprom<H, EEPROM>
where
    EEPROM: EepromOps<H>,
{
    pub fn new(p: EEPROM) -> Self {
        Self {
            p,
            _h: marker::PhantomData,
        }
    }

    #[inline]
    pub fn capacity(&self) -> u16 {
        EEPROM::CAPACITY
    }

    #[inline]
    pub fn read_byte(&self, offset: u16) -> u8 {
        debug_assert!(offset < EEPROM::CAPACITY);
        self.p.raw_read_byte(offset)
    }

    #[inline]
    pub fn write_byte(&mut self, offset: u16, data: u8) {
        debug_assert!(offset < EEPROM::CAPACITY);
        avr_device::interrupt::free(|_cs| self.p.raw_write_byte(offset, data));
    }

    #[inline]
    pub fn erase_byte(&mut self, offset: u16) {
        debug_assert!(offset < EEPROM::CAPACITY);
        avr_device::interrupt::free(|_cs| self.p.raw_erase_byte(offset));
    }

    pub fn read(&self, offset: u16, buf: &mut [u8]) -> Result<(), OutOfBoundsError> {
        if buf.len() as u16 + offset > EEPROM::CAPACITY {
            return Err(OutOfBoundsError);
        }
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.p.raw_read_byte(offset + i as u16);
        }
        Ok(())
    }

    pub fn write(&mut self, offset: u16, buf: &[u8]) -> Result<(), OutOfBoundsError> {
        if buf.len() as u16 + offset > EEPROM::CAPACITY {
            return Err(OutOfBoundsError);
        }

        for (i, byte) in buf.iter().enumerate() {
            avr_device::interrupt::free(|_cs| self.p.raw_write_byte(offset + i as u16, *byte));
        }
        Ok(())
    }

    pub fn erase(&mut self, from: u16, to: u16) -> Result<(), OutOfBoundsError> {
        if to > EEPROM::CAPACITY || from > to {
            return Err(OutOfBoundsError);
        }

        for i in from..to {
            avr_device::interrupt::free(|_cs| self.p.raw_erase_byte(i));
        }

        Ok(())
    }

    /// Release the underlying register block.
    pub fn release(self) -> EEPROM {
        self.p
    }
}

impl embedded_storage::nor_flash::NorFlashError for OutOfBoundsError {
    fn kind(&self) -> embedded_storage::nor_flash::NorFlashErrorKind {
        embedded_storage::nor_flash::NorFlashErrorKind::OutOfBounds
    }
}

impl<H, EEPROM> embedded_storage::nor_flash::ErrorType for Eeprom<H, EEPROM>
where
    EEPROM: EepromOps<H>,
{
    type Error = OutOfBoundsError;
}

impl<H, EEPROM> embedded_storage::nor_flash::ReadNorFlash for Eeprom<H, EEPROM>
where
    EEPROM: EepromOps<H>,
{
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        Eeprom::read(self, offset as u16, bytes)
    }

    fn capacity(&self) -> usize {
        Eeprom::capacity(self) as usize
    }
}

impl<H, EEPROM> embedded_storage::nor_flash::NorFlash for Eeprom<H, EEPROM>
where
    EEPROM: EepromOps<H>,
{
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = 1;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        Eeprom::erase(self, from as u16, to as u16)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        Eeprom::write(self, offset as u16, bytes)
    }
}

// The hardware supports rewriting single bytes without a prior page erase
impl<H, EEPROM> embedded_storage::nor_flash::MultiwriteNorFlash for Eeprom<H, EEPROM> where
    EEPROM: EepromOps<H>
{
}

/// Implement [`EepromOps`](crate::eeprom::EepromOps) for the EEPROM
/// peripheral of an ATmega-family chip.
#[macro_export]
macro_rules! impl_eeprom_atmega {
    (
        hal: $HAL:ty,
        peripheral: $EEPROM:ty,
        capacity: $capacity:literal,
        addr_width: $addrwidth:ty,
        set_address: |$periph_var:ident, $address:ident| $set_address:block,
    ) => {
        mod eeprom_helper {
            use super::*;

            pub unsafe fn wait_write_complete(regs: &$EEPROM) {
                // Wait for completion of a previous write.
                while regs.eecr.read().eepe().bit_is_set() {}
            }

            pub unsafe fn set_address(regs: &$EEPROM, address: $addrwidth) {
                wait_write_complete(regs);
                let $periph_var = regs;
                let $address = address;
                $set_address
            }

            pub unsafe fn set_erasewrite_mode(regs: &$EEPROM) {
                regs.eecr.write(|w| {
                    // Set Master Write Enable bit and Erase+Write mode
                    w.eempe().set_bit().eepm().val_0x00()
                })
            }

            pub unsafe fn set_erase_mode(regs: &$EEPROM) {
                regs.eecr.write(|w| {
                    // Set Master Write Enable bit and Erase-only mode
                    w.eempe().set_bit().eepm().val_0x01()
                });
            }

            pub unsafe fn set_write_mode(regs: &$EEPROM) {
                regs.eecr.write(|w| {
                    // Set Master Write Enable bit and Write-only mode
                    w.eempe().set_bit().eepm().val_0x02()
                });
            }
        }

        impl $crate::eeprom::EepromOps<$HAL> for $EEPROM {
            const CAPACITY: u16 = $capacity;

            #[inline]
            fn raw_read_byte(&self, address: u16) -> u8 {
                unsafe {
                    eeprom_helper::set_address(self, address as $addrwidth);
                    self.eecr.write(|w| w.eere().set_bit());
                    self.eedr.read().bits()
                }
            }

            #[inline]
            fn raw_write_byte(&mut self, address: u16, data: u8) {
                unsafe {
                    eeprom_helper::set_address(self, address as $addrwidth);

                    // Start EEPROM read operation
                    self.eecr.write(|w| w.eere().set_bit());
                    let old_value = self.eedr.read().bits();
                    let diff_mask = old_value ^ data;

                    // Check if any bits are changed to '1' in the new value.
                    if (diff_mask & data) != 0 {
                        // Now we know that _some_ bits need to be erased to '1'.

                        // Check if any bits in the new value are '0'.
                        if data != 0xff {
                            // Now we know that some bits need to be programmed to '0' also.
                            self.eedr.write(|w| w.bits(data)); // Set EEPROM data register.
                            eeprom_helper::set_erasewrite_mode(self);
                            self.eecr.write(|w| w.eepe().set_bit()); // Start Erase+Write operation.
                        } else {
                            // Now we know that all bits should be erased.
                            eeprom_helper::set_erase_mode(self);
                            self.eecr.write(|w| w.eepe().set_bit()); // Start Erase-only operation.
                        }
                    } else {
                        // Now we know that _no_ bits need to be erased to '1'.

                        // Check if any bits are changed from '1' in the old value.
                        if diff_mask != 0 {
                            // Now we know that _some_ bits need to the programmed to '0'.
                            self.eedr.write(|w| w.bits(data)); // Set EEPROM data register.
                            eeprom_helper::set_write_mode(self);
                            self.eecr.write(|w| w.eepe().set_bit()); // Start Write-only operation.
                        }
                    }
                }
            }

            #[inline]
            fn raw_erase_byte(&mut self, address: u16) {
                unsafe {
                    eeprom_helper::set_address(self, address as $addrwidth);
                    eeprom_helper::set_erase_mode(self);
                    // Start Erase-only operation.
                    self.eecr.write(|w| w.eepe().set_bit());
                }
            }
        }
    };
}

/// Implement [`EepromOps`](crate::eeprom::EepromOps) for the EEPROM
/// peripheral of an ATtiny-family chip.
///
/// The ATtiny parts use named `EEPM` variants instead of the numeric mode
/// values of the ATmega family.
#[macro_export]
macro_rules! impl_eeprom_attiny {
    (
        hal: $HAL:ty,
        peripheral: $EEPROM:ty,
        capacity: $capacity:literal,
        addr_width: $addrwidth:ty,
        set_address: |$periph_var:ident, $address:ident| $set_address:block,
    ) => {
        mod eeprom_helper {
            use super::*;

            pub unsafe fn wait_write_complete(regs: &$EEPROM) {
                while regs.eecr.read().eepe().bit_is_set() {}
            }

            pub unsafe fn set_address(regs: &$EEPROM, address: $addrwidth) {
                wait_write_complete(regs);
                let $periph_var = regs;
                let $address = address;
                $set_address
            }

            pub unsafe fn set_erasewrite_mode(regs: &$EEPROM) {
                regs.eecr.write(|w| w.eempe().set_bit().eepm().atomic());
            }

            pub unsafe fn set_erase_mode(regs: &$EEPROM) {
                regs.eecr.write(|w| w.eempe().set_bit().eepm().erase());
            }

            pub unsafe fn set_write_mode(regs: &$EEPROM) {
                regs.eecr.write(|w| w.eempe().set_bit().eepm().write());
            }
        }

        impl $crate::eeprom::EepromOps<$HAL> for $EEPROM {
            const CAPACITY: u16 = $capacity;

            #[inline]
            fn raw_read_byte(&self, address: u16) -> u8 {
                unsafe {
                    eeprom_helper::set_address(self, address as $addrwidth);
                    self.eecr.write(|w| w.eere().set_bit());
                    self.eedr.read().bits()
                }
            }

            #[inline]
            fn raw_write_byte(&mut self, address: u16, data: u8) {
                unsafe {
                    eeprom_helper::set_address(self, address as $addrwidth);

                    // Start EEPROM read operation
                    self.eecr.write(|w| w.eere().set_bit());
                    let old_value = self.eedr.read().bits();
                    let diff_mask = old_value ^ data;

                    // Check if any bits are changed to '1' in the new value.
                    if (diff_mask & data) != 0 {
                        // Now we know that _some_ bits need to be erased to '1'.

                        // Check if any bits in the new value are '0'.
                        if data != 0xff {
                            // Now we know that some bits need to be programmed to '0' also.
                            self.eedr.write(|w| w.bits(data)); // Set EEPROM data register.
                            eeprom_helper::set_erasewrite_mode(self);
                            self.eecr.write(|w| w.eepe().set_bit()); // Start Erase+Write operation.
                        } else {
                            // Now we know that all bits should be erased.
                            eeprom_helper::set_erase_mode(self);
                            self.eecr.write(|w| w.eepe().set_bit()); // Start Erase-only operation.
                        }
                    } else {
                        // Now we know that _no_ bits need to be erased to '1'.

                        // Check if any bits are changed from '1' in the old value.
                        if diff_mask != 0 {
                            // Now we know that _some_ bits need to the programmed to '0'.
                            self.eedr.write(|w| w.bits(data)); // Set EEPROM data register.
                            eeprom_helper::set_write_mode(self);
                            self.eecr.write(|w| w.eepe().set_bit()); // Start Write-only operation.
                        }
                    }
                }
            }

            #[inline]
            fn raw_erase_byte(&mut self, address: u16) {
                unsafe {
                    eeprom_helper::set_address(self, address as $addrwidth);
                    eeprom_helper::set_erase_mode(self);
                    // Start Erase-only operation.
                    self.eecr.write(|w| w.eepe().set_bit());
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Array-backed fake with the capacity of an ATtiny-sized part.
    struct MockEeprom {
        cells: [u8; 512],
    }

    impl Default for MockEeprom {
        fn default() -> Self {
            Self { cells: [0xFF; 512] }
        }
    }

    impl EepromOps<()> for MockEeprom {
        const CAPACITY: u16 = 512;

        fn raw_read_byte(&self, address: u16) -> u8 {
            self.cells[address as usize]
        }

        fn raw_write_byte(&mut self, address: u16, data: u8) {
            self.cells[address as usize] = data;
        }

        fn raw_erase_byte(&mut self, address: u16) {
            self.cells[address as usize] = 0xFF;
        }
    }

    #[test]
    fn reads_stay_inside_the_capacity() {
        let mut p = MockEeprom::default();
        p.cells[510] = 0x12;
        p.cells[511] = 0x34;
        let eeprom = Eeprom::new(p);

        let mut buf = [0u8; 2];
        eeprom.read(510, &mut buf).unwrap();
        assert_eq!(buf, [0x12, 0x34]);

        // One byte past the end
        assert_eq!(eeprom.read(511, &mut buf), Err(OutOfBoundsError));
    }

    #[test]
    fn out_of_bounds_writes_are_rejected_up_front() {
        let mut eeprom = Eeprom::new(MockEeprom::default());
        assert_eq!(eeprom.write(511, &[0x01, 0x02]), Err(OutOfBoundsError));
        // Nothing was modified
        assert_eq!(eeprom.read_byte(511), 0xFF);
    }

    #[test]
    fn erase_range_is_validated() {
        let mut eeprom = Eeprom::new(MockEeprom::default());
        assert_eq!(eeprom.erase(100, 513), Err(OutOfBoundsError));
        assert_eq!(eeprom.erase(100, 50), Err(OutOfBoundsError));
    }

    #[test]
    fn capacity_reports_the_part_size() {
        let eeprom = Eeprom::new(MockEeprom::default());
        assert_eq!(eeprom.capacity(), 512);
    }
}
