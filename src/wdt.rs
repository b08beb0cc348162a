//! WDT Implementation
//!
//! The watchdog provides a system reset when its counter reaches the
//! configured time-out value.  After [`Wdt::start`], call [`Wdt::feed`]
//! before the period ends to prevent the reset.
//!
//! # Example
//! ```ignore
//! let dp = avr8_hal::pac::Peripherals::take().unwrap();
//!
//! let mut watchdog = avr8_hal::Wdt::new(dp.WDT, &dp.CPU.mcusr);
//! watchdog.start(avr8_hal::wdt::Timeout::Ms2000);
//!
//! loop {
//!     watchdog.feed();
//! }
//! ```

use core::marker;

/// Approximate length of the time-out period before the watchdog provides a
/// system reset.
#[derive(ufmt::derive::uDebug, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Timeout {
    /// 16 milliseconds
    Ms16,
    /// 32 milliseconds
    Ms32,
    /// 64 milliseconds
    Ms64,
    /// 125 milliseconds
    Ms125,
    /// 250 milliseconds
    Ms250,
    /// 500 milliseconds
    Ms500,
    /// 1 second
    Ms1000,
    /// 2 seconds
    Ms2000,
    /// 4 seconds
    Ms4000,
    /// 8 seconds
    Ms8000,
}

/// Internal trait for low-level watchdog operations.
///
/// **Prefer using the [`Wdt`] API instead of this trait.**
pub trait WdtOps<H> {
    /// The MCU status register which carries the watchdog-reset flag.
    type MCUSR;

    /// Initialize the watchdog timer.
    ///
    /// If a prior reset was caused by the watchdog, the `WDRF` flag must be
    /// cleared here, because it would otherwise override a later attempt to
    /// disable the watchdog.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_init(&mut self, m: &Self::MCUSR);

    /// Start the watchdog timer with the given time-out period.
    ///
    /// The timed two-write enable sequence demanded by the hardware must be
    /// performed inside a critical section.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_start(&mut self, timeout: Timeout);

    /// Reset the watchdog counter.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_feed(&mut self);

    /// Disable the watchdog entirely.
    ///
    /// **Warning**: This is a low-level method and should not be called
    /// directly from user code.
    fn raw_stop(&mut self);
}

/// Watchdog timer
pub struct Wdt<H, WDT: WdtOps<H>> {
    p: WDT,
    _h: marker::PhantomData<H>,
}

impl<H, WDT: WdtOps<H>> Wdt<H, WDT> {
    pub fn new(mut p: WDT, m: &WDT::MCUSR) -> Self {
        p.raw_init(m);
        Self {
            p,
            _h: marker::PhantomData,
        }
    }

    /// Enable the watchdog with the given time-out period.
    pub fn start(&mut self, timeout: Timeout) {
        self.p.raw_start(timeout);
    }

    /// Reset the watchdog counter, pushing the reset out by one full period.
    #[inline]
    pub fn feed(&mut self) {
        self.p.raw_feed();
    }

    /// Disable the watchdog.
    pub fn stop(&mut self) {
        self.p.raw_stop();
    }
}

impl<H, WDT: WdtOps<H>> crate::hal::watchdog::WatchdogEnable for Wdt<H, WDT> {
    type Time = Timeout;

    fn start<T>(&mut self, period: T)
    where
        T: Into<Self::Time>,
    {
        self.start(period.into());
    }
}

impl<H, WDT: WdtOps<H>> crate::hal::watchdog::Watchdog for Wdt<H, WDT> {
    #[inline]
    fn feed(&mut self) {
        self.feed();
    }
}

impl<H, WDT: WdtOps<H>> crate::hal::watchdog::WatchdogDisable for Wdt<H, WDT> {
    fn disable(&mut self) {
        self.stop();
    }
}

/// Implement [`WdtOps`](crate::wdt::WdtOps) for the watchdog peripheral of
/// one chip.
#[macro_export]
macro_rules! impl_wdt {
    (
        hal: $HAL:ty,
        peripheral: $WDT:ty,
        mcusr: $MCUSR:ty,
        wdtcsr_name: $wdtcsr:ident,
        timeout: |$to:ident, $w:ident| $to_match:expr,
    ) => {
        impl $crate::wdt::WdtOps<$HAL> for $WDT {
            type MCUSR = $MCUSR;

            #[inline]
            fn raw_init(&mut self, m: &Self::MCUSR) {
                // The WDRF flag overrides any attempt to clear WDE, so it
                // must go first.
                m.modify(|_, w| w.wdrf().clear_bit());
            }

            #[inline]
            fn raw_start(&mut self, timeout: $crate::wdt::Timeout) {
                // The sequence for changing the time-out configuration is as
                // follows:
                //
                //     1. In the same operation, write a logic one to the
                //        Watchdog change enable bit (WDCE) and WDE.  A logic
                //        one must be written to WDE regardless of the
                //        previous value of the WDE bit.
                //     2. Within the next four clock cycles, write the WDE and
                //        Watchdog prescaler bits (WDP) as desired, but with
                //        the WDCE bit cleared.  This must be done in one
                //        operation.
                $crate::avr_device::interrupt::free(|_| {
                    // Reset the watchdog timer.
                    self.raw_feed();
                    // Enable watchdog configuration mode.
                    self.$wdtcsr.modify(|_, w| w.wdce().set_bit().wde().set_bit());
                    // Enable watchdog and set interval.
                    self.$wdtcsr.write(|w| {
                        let $to = timeout;
                        let $w = w.wde().set_bit().wdce().clear_bit();
                        $to_match
                    });
                })
            }

            #[inline]
            fn raw_feed(&mut self) {
                avr_device::asm::wdr();
            }

            #[inline]
            fn raw_stop(&mut self) {
                // The sequence for clearing WDE is as follows:
                //
                //     1. In the same operation, write a logic one to the
                //        Watchdog change enable bit (WDCE) and WDE.  A logic
                //        one must be written to WDE regardless of the
                //        previous value of the WDE bit.
                //     2. Within the next four clock cycles, clear the WDE and
                //        WDCE bits.  This must be done in one operation.
                $crate::avr_device::interrupt::free(|_| {
                    // Reset the watchdog timer.
                    self.raw_feed();
                    // Enable watchdog configuration mode.
                    self.$wdtcsr.modify(|_, w| w.wdce().set_bit().wde().set_bit());
                    // Disable watchdog.
                    self.$wdtcsr.reset();
                })
            }
        }
    };
}
