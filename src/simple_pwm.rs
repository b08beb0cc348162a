//! PWM Implementation
//!
//! A timer/counter is put into fast-PWM mode by the per-chip timer wrapper
//! (`Timer0Pwm`, ...).  Pins wired to that timer's output-compare units can
//! then be moved into [`mode::PwmOutput`] with
//! [`into_pwm()`](IntoPwmPin::into_pwm) and controlled through their duty
//! cycle.
//!
//! # Example
//! ```ignore
//! let mut timer0 = Timer0Pwm::new(dp.TC0, Prescaler::Prescale64);
//!
//! let mut pd5 = pins.pd5.into_output().into_pwm(&mut timer0);
//! pd5.set_duty(128);
//! pd5.enable();
//! ```

use core::marker::PhantomData;

use crate::port::mode;
use crate::port::Pin;

/// Clock prescaler for PWM
///
/// The prescaler dictates the PWM frequency, together with the IO clock.  The
/// formula is as follows:
///
/// ```text
/// F_pwm = CLK_io / (Prescaler * 256);
/// ```
///
/// | Prescaler | 16 MHz Clock | 8 MHz Clock |
/// | --- | --- | ---|
/// | `Direct` | 62.5 kHz | 31.3 kHz |
/// | `Prescale8` | 7.81 kHz | 3.91 kHz |
/// | `Prescale64` | 977 Hz | 488 Hz |
/// | `Prescale256` | 244 Hz | 122 Hz |
/// | `Prescale1024` | 61.0 Hz | 30.5 Hz |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Prescaler {
    /// No prescaling, the IO clock drives the timer directly.
    Direct,
    /// Divide the IO clock by 8.
    Prescale8,
    /// Divide the IO clock by 64.
    Prescale64,
    /// Divide the IO clock by 256.
    Prescale256,
    /// Divide the IO clock by 1024.
    Prescale1024,
}

/// Internal trait for the low-level PWM mechanics of a pin.
///
/// Implemented by the chip wiring macro for every pin with an output-compare
/// unit.  **Prefer the [`Pin<mode::PwmOutput>`](Pin) API instead of this
/// trait.**
pub trait PwmPinOps<TC> {
    type Duty;

    /// Connect the pin to its output-compare unit.
    fn enable(&mut self);
    /// Disconnect the pin from its output-compare unit, handing it back to
    /// the port logic.
    fn disable(&mut self);
    fn get_duty(&self) -> Self::Duty;
    fn get_max_duty(&self) -> Self::Duty;

    fn set_duty(&mut self, value: u8);
}

pub trait IntoPwmPin<TC, PIN> {
    fn into_pwm(self, timer: &TC) -> Pin<mode::PwmOutput<TC>, PIN>;
}

impl<TC, PIN: PwmPinOps<TC>> IntoPwmPin<TC, PIN> for Pin<mode::Output, PIN> {
    fn into_pwm(self, _timer: &TC) -> Pin<mode::PwmOutput<TC>, PIN> {
        Pin {
            pin: self.pin,
            _mode: PhantomData,
        }
    }
}

impl<TC, PIN: PwmPinOps<TC>> Pin<mode::PwmOutput<TC>, PIN> {
    /// Connect the pin to the timer's output-compare unit.
    ///
    /// While connected, the pin level follows the compare matches of the
    /// timer.  A duty cycle of `0` keeps the output always low, the maximum
    /// duty cycle keeps it always high for a full PWM period.
    pub fn enable(&mut self) {
        self.pin.enable();
    }

    /// Disconnect the pin from the timer.  The pin falls back to its plain
    /// output latch level.
    pub fn disable(&mut self) {
        self.pin.disable();
    }

    pub fn get_duty(&self) -> <PIN as PwmPinOps<TC>>::Duty {
        self.pin.get_duty()
    }

    pub fn get_max_duty(&self) -> <PIN as PwmPinOps<TC>>::Duty {
        self.pin.get_max_duty()
    }

    pub fn set_duty(&mut self, duty: u8) {
        self.pin.set_duty(duty);
    }
}

impl<TC, PIN: PwmPinOps<TC, Duty = u8>> crate::hal::PwmPin for Pin<mode::PwmOutput<TC>, PIN> {
    type Duty = u8;

    fn disable(&mut self) {
        self.disable();
    }

    fn enable(&mut self) {
        self.enable();
    }

    fn get_duty(&self) -> Self::Duty {
        self.get_duty()
    }

    fn get_max_duty(&self) -> Self::Duty {
        self.get_max_duty()
    }

    fn set_duty(&mut self, duty: Self::Duty) {
        self.set_duty(duty);
    }
}

/// Get the duty value corresponding to a percentage between 0.0 and 1.0.
///
/// Values outside that range are clamped to the always-low / always-high
/// boundary duties.  Note that this pulls in floating point code, which is
/// expensive on AVR.
pub fn duty_from_percent(percent: f32) -> u8 {
    if percent >= 1.0 {
        u8::MAX
    } else if percent <= 0.0 {
        0
    } else {
        libm::roundf(percent * u8::MAX as f32) as u8
    }
}

/// Implement types and traits for PWM timers
#[macro_export]
macro_rules! impl_simple_pwm {
    (
        $(#[$timer_pwm_attr:meta])*
        pub struct $TimerPwm:ident {
            timer: $TIMER:ty,
            init: |$init_timer:ident, $prescaler:ident| $init_block:block,
            pins: {$(
                $PXi:ty: {
                    ocr: $ocr:ident,
                    into_pwm: |$pin_timer:ident| if enable
                        $pin_enable_block:block else $pin_disable_block:block,
                },
            )+},
        }
    ) => {
        $(#[$timer_pwm_attr])*
        pub struct $TimerPwm {
            timer: $TIMER,
        }

        impl $TimerPwm {
            pub fn new(timer: $TIMER, prescaler: $crate::simple_pwm::Prescaler) -> $TimerPwm {
                let mut t = $TimerPwm { timer };

                {
                    let $init_timer = &mut t.timer;
                    let $prescaler = prescaler;
                    $init_block
                }

                t
            }

            /// Stop the timer and release the register block.
            pub fn release(self) -> $TIMER {
                self.timer
            }
        }

        $(
            impl $crate::simple_pwm::PwmPinOps<$TimerPwm> for $PXi {
                type Duty = u8;

                fn enable(&mut self) {
                    // The connect/disconnect bits share their register with
                    // other fields, so the read-modify-write must not be
                    // interrupted.
                    $crate::avr_device::interrupt::free(|_| {
                        let $pin_timer = unsafe { &*<$TIMER>::ptr() };
                        $pin_enable_block
                    });
                }

                fn disable(&mut self) {
                    $crate::avr_device::interrupt::free(|_| {
                        let $pin_timer = unsafe { &*<$TIMER>::ptr() };
                        $pin_disable_block
                    });
                }

                fn get_duty(&self) -> Self::Duty {
                    unsafe { (&*<$TIMER>::ptr()) }.$ocr.read().bits() as Self::Duty
                }

                fn get_max_duty(&self) -> Self::Duty {
                    u8::MAX
                }

                fn set_duty(&mut self, duty: Self::Duty) {
                    // The OCR register is exclusively owned by this pin, so a
                    // plain write is race-free.
                    unsafe { (&*<$TIMER>::ptr()).$ocr.write(|w| w.bits(duty.into())) };
                }
            }
        )+
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_percentages_clamp_at_the_boundaries() {
        assert_eq!(duty_from_percent(-0.5), 0);
        assert_eq!(duty_from_percent(0.0), 0);
        assert_eq!(duty_from_percent(1.0), u8::MAX);
        assert_eq!(duty_from_percent(1.5), u8::MAX);
    }

    #[test]
    fn duty_percentages_round_to_the_nearest_step() {
        assert_eq!(duty_from_percent(0.5), 128);
        assert_eq!(duty_from_percent(0.25), 64);
        assert_eq!(duty_from_percent(0.998), 254);
    }
}
