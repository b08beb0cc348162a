//! # Type-level module for port pins
//!
//! This module provides a type-level API for the digital pins.  It uses the
//! type system to track the mode of each pin at compile-time.  Representing
//! pins in this manner incurs no run-time overhead: each [`Pin`] struct is
//! zero-sized, and the mode is a pure type parameter, so the resulting
//! assembly is identical to hand-written register accesses.
//!
//! A pin is represented by the [`Pin`] type, parameterized by a `MODE` type
//! from the [`mode`] module and a `PIN` type identifying the physical pin:
//!
//! ```ignore
//! let dp = avr8_hal::pac::Peripherals::take().unwrap();
//! let pins = avr8_hal::pins!(dp);
//!
//! let led: Pin<mode::Output, PB5> = pins.pb5.into_output();
//! ```
//!
//! It is not possible for users to create new pin instances.  Singleton
//! instances of each pin are made available through the `Pins` struct, which
//! is constructed from the port register blocks and takes ownership of them.
//!
//! Pins are moved between modes using the `into_*` conversion methods.  Each
//! conversion consumes the old handle, so a pin can never be usable in two
//! modes at once.  Only when a pin is in the right mode does it have the
//! mode-relevant methods available (e.g. `set_high()` exists only for output
//! pins); invalid operations are rejected by the compiler.
//!
//! # Embedded HAL traits
//!
//! This module implements the embedded HAL digital traits for each [`Pin`] in
//! the corresponding mode, namely [`InputPin`], [`OutputPin`] and
//! [`ToggleableOutputPin`].

use core::marker::PhantomData;
use embedded_hal::digital::v2::{InputPin, OutputPin, ToggleableOutputPin};

use super::dynpins::DynPinId;

//==================================================================================================
//  Errors and Definitions
//==================================================================================================

/// GPIO error type
#[derive(ufmt::derive::uDebug, Debug, PartialEq, Eq, Clone, Copy)]
pub enum PinError {
    /// The pin did not have the correct identity or mode for the requested
    /// operation.  [`DynPin`](super::DynPin)s are not tracked and verified at
    /// compile-time, so run-time operations on them are fallible.
    InvalidPinType,
}

//==================================================================================================
//  Pin modes
//==================================================================================================

/// Type-level enum of the pin modes.
///
/// The valid options are the types in the [`mode`] module.
pub trait PinMode: crate::Sealed {}

/// GPIO pin modes
pub mod mode {
    use core::marker::PhantomData;

    /// Marker trait for the digital I/O modes ([`Output`], [`OpenDrain`] and
    /// [`Input`]).  Mode conversions are only possible from an I/O mode.
    pub trait Io: crate::Sealed + super::PinMode {}

    /// Pin is configured as a push-pull digital output.
    pub struct Output;
    impl super::PinMode for Output {}
    impl Io for Output {}
    impl crate::Sealed for Output {}

    /// Pin is configured as an open-drain digital output.
    ///
    /// AVR ports have no hardware open-drain driver.  The mode is emulated by
    /// keeping the output latch low and switching the data-direction bit:
    /// driving low enables the output driver, "driving" high releases the
    /// line into a floating state.  An external pull-up is required.
    pub struct OpenDrain;
    impl super::PinMode for OpenDrain {}
    impl Io for OpenDrain {}
    impl crate::Sealed for OpenDrain {}

    pub trait InputMode: crate::Sealed {}

    /// Pin is configured as digital input (floating or pulled-up).
    pub struct Input<IMODE = AnyInput> {
        pub(crate) _imode: PhantomData<IMODE>,
    }
    impl<IMODE: InputMode> super::PinMode for Input<IMODE> {}
    impl<IMODE: InputMode> Io for Input<IMODE> {}
    impl<IMODE: InputMode> crate::Sealed for Input<IMODE> {}

    /// Floating input, used like `Input<Floating>`.
    pub struct Floating;
    impl InputMode for Floating {}
    impl crate::Sealed for Floating {}

    /// Pulled-up input, used like `Input<PullUp>`.
    pub struct PullUp;
    impl InputMode for PullUp {}
    impl crate::Sealed for PullUp {}

    /// Any input (floating or pulled-up), used like `Input<AnyInput>`.
    pub struct AnyInput;
    impl InputMode for AnyInput {}
    impl crate::Sealed for AnyInput {}

    /// Pin is configured as an analog input (for the ADC).
    pub struct Analog;
    impl super::PinMode for Analog {}
    impl crate::Sealed for Analog {}

    /// Pin is configured as the output-compare output of the PWM timer `TC`.
    pub struct PwmOutput<TC> {
        pub(crate) _timer: PhantomData<TC>,
    }
    impl<TC> super::PinMode for PwmOutput<TC> {}
    impl<TC> crate::Sealed for PwmOutput<TC> {}
}

//==================================================================================================
//  PinOps & PinId
//==================================================================================================

/// Raw register primitives for one pin.
///
/// Each method is a thin, branch-free mapping onto a PORT/PIN/DDR register
/// bit operation.  The methods are `unsafe` because they do not know about
/// the configured pin mode; the [`Pin`] typestate wrappers are responsible
/// for only calling primitives which are valid in the current mode.
///
/// **Warning**: This is a low-level trait and should not be used directly
/// from user code.
pub trait PinOps {
    /// Runtime-dispatched representation of this pin, see
    /// [Downgrading](Pin#downgrading).
    type Dynamic;

    fn into_dynamic(self) -> Self::Dynamic;

    unsafe fn out_set(&mut self);
    unsafe fn out_clear(&mut self);
    unsafe fn out_toggle(&mut self);
    unsafe fn out_get(&self) -> bool;

    unsafe fn in_get(&self) -> bool;

    unsafe fn make_output(&mut self);
    unsafe fn make_input(&mut self, pull_up: bool);
}

/// Compile-time identity of a concrete pin.
///
/// Implemented by the chip wiring macro for every concrete pin type.  The
/// identity is what allows a fully type-erased [`DynPin`](super::DynPin) to
/// be converted back into its type-level equivalent.
pub trait PinId: PinOps {
    /// Value-level identity (port and bit number) of this pin.
    const DYN: DynPinId;

    /// Create a new instance of this pin type.
    ///
    /// # Safety
    ///
    /// Each pin type must be a singleton.  For a given pin, there must be at
    /// most one corresponding instance in existence at any given time.
    unsafe fn new() -> Self;
}

//==================================================================================================
//  Pin
//==================================================================================================

/// Representation of an MCU pin, parameterized by a mode and a pin type.
///
/// # Design Rationale
/// We want individual types per pin to model constraints which depend on a
/// specific pin.  For example, some peripherals are internally hard-wired to
/// certain pins of the MCU.
///
/// Additionally, the mode of a pin is part of the type to model enforcement
/// of pins being in a certain mode and preventing misuse like calling
/// `set_high()` on a pin configured as input.
pub struct Pin<MODE, PIN> {
    pub(crate) pin: PIN,
    pub(crate) _mode: PhantomData<MODE>,
}

impl<MODE, PIN> core::fmt::Debug for Pin<MODE, PIN> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Pin")
    }
}

impl<PIN: PinOps> Pin<mode::Input<mode::Floating>, PIN> {
    #[doc(hidden)]
    pub fn new(pin: PIN) -> Self {
        Pin {
            pin,
            _mode: PhantomData,
        }
    }
}

/// # Configuration
/// To change the mode of a pin, use one of the following conversion methods.
/// They consume the original [`Pin`] and return one with the desired mode.
impl<PIN: PinOps, MODE: mode::Io> Pin<MODE, PIN> {
    /// Convert this pin into an output pin, setting the state to low.
    /// See [Digital Output](#digital-output).
    pub fn into_output(mut self) -> Pin<mode::Output, PIN> {
        unsafe { self.pin.out_clear() };
        unsafe { self.pin.make_output() };
        Pin {
            pin: self.pin,
            _mode: PhantomData,
        }
    }

    /// Convert this pin into an output pin, setting the state to high.
    /// See [Digital Output](#digital-output).
    pub fn into_output_high(mut self) -> Pin<mode::Output, PIN> {
        unsafe { self.pin.out_set() };
        unsafe { self.pin.make_output() };
        Pin {
            pin: self.pin,
            _mode: PhantomData,
        }
    }

    /// Convert this pin into an open-drain output pin with the line released.
    /// See [Open-Drain Output](#open-drain-output).
    pub fn into_opendrain(mut self) -> Pin<mode::OpenDrain, PIN> {
        // Keep the output latch low.  With the latch low, the DDR bit alone
        // decides between driving low and floating.
        unsafe { self.pin.out_clear() };
        unsafe { self.pin.make_input(false) };
        Pin {
            pin: self.pin,
            _mode: PhantomData,
        }
    }

    /// Convert this pin into an open-drain output pin driving the line low.
    /// See [Open-Drain Output](#open-drain-output).
    pub fn into_opendrain_low(mut self) -> Pin<mode::OpenDrain, PIN> {
        unsafe { self.pin.out_clear() };
        unsafe { self.pin.make_output() };
        Pin {
            pin: self.pin,
            _mode: PhantomData,
        }
    }

    /// Convert this pin into a floating input pin.  See [Digital
    /// Input](#digital-input).
    ///
    /// *Note*: To read deterministic values from the pin, it must be
    /// externally pulled to a defined level (either VCC or GND).
    pub fn into_floating_input(mut self) -> Pin<mode::Input<mode::Floating>, PIN> {
        unsafe { self.pin.make_input(false) };
        Pin {
            pin: self.pin,
            _mode: PhantomData,
        }
    }

    /// Convert this pin into a pulled-up input pin.  See [Digital
    /// Input](#digital-input).
    ///
    /// With no external circuit pulling the pin low, it will be read high.
    pub fn into_pull_up_input(mut self) -> Pin<mode::Input<mode::PullUp>, PIN> {
        unsafe { self.pin.make_input(true) };
        Pin {
            pin: self.pin,
            _mode: PhantomData,
        }
    }

    /// Convert this pin into an analog input (ADC channel).  See [Analog
    /// Input](#analog-input).
    ///
    /// Some pins can be repurposed as ADC channels.  For those pins, the
    /// `into_analog_input()` method is available.
    pub fn into_analog_input<H, ADC, CLOCK>(
        self,
        adc: &mut crate::adc::Adc<H, ADC, CLOCK>,
    ) -> Pin<mode::Analog, PIN>
    where
        Pin<mode::Analog, PIN>: crate::adc::AdcChannel<H, ADC>,
        ADC: crate::adc::AdcOps<H>,
        CLOCK: crate::clock::Clock,
    {
        let new = Pin {
            pin: self.pin,
            _mode: PhantomData,
        };
        adc.enable_pin(&new);
        new
    }
}

/// # Downgrading
/// For applications where the exact pin is irrelevant, a specific pin can be
/// downgraded to a "dynamic pin" which can represent any pin:
///
/// ```ignore
/// let out1: Pin<mode::Output> = pins.pd0.into_output().downgrade();
/// let out2: Pin<mode::Output> = pins.pd1.into_output().downgrade();
///
/// // Because they now have the same type, you can stuff them into an array:
/// let outs: [Pin<mode::Output>; 2] = [out1, out2];
/// ```
///
/// The mode stays part of the type here.  To erase the mode as well, see
/// [`into_dynamic()`](Pin::into_dynamic) and [`DynPin`](super::DynPin).
impl<PIN: PinOps, MODE: mode::Io> Pin<MODE, PIN> {
    /// "Erase" type-level information about which specific pin is
    /// represented.
    ///
    /// *Note*: The returned "dynamic" pin has runtime overhead compared to a
    /// specific pin.
    pub fn downgrade(self) -> Pin<MODE, PIN::Dynamic> {
        Pin {
            pin: self.pin.into_dynamic(),
            _mode: PhantomData,
        }
    }
}

/// # Input-Mode Downgrading
/// In some cases it is not important whether an input pin is configured as
/// [`mode::PullUp`] or [`mode::Floating`].  For this, you can "forget" the
/// concrete input mode, leaving you with a type that is the same for pull-up
/// or floating inputs.
impl<PIN: PinOps, IMODE> Pin<mode::Input<IMODE>, PIN> {
    /// "Erase" type-level information about whether the pin is currently a
    /// pull-up or a floating input.
    pub fn forget_imode(self) -> Pin<mode::Input, PIN> {
        Pin {
            pin: self.pin,
            _mode: PhantomData,
        }
    }
}

/// # Digital Output
impl<PIN: PinOps> Pin<mode::Output, PIN> {
    /// Set pin high (pull it to supply voltage).
    #[inline]
    pub fn set_high(&mut self) {
        unsafe { self.pin.out_set() }
    }

    /// Set pin low (pull it to GND).
    #[inline]
    pub fn set_low(&mut self) {
        unsafe { self.pin.out_clear() }
    }

    /// Toggle a high pin to low and a low pin to high.
    #[inline]
    pub fn toggle(&mut self) {
        unsafe { self.pin.out_toggle() }
    }

    /// Check whether the pin is set high.
    ///
    /// *Note*: The electrical state of the pin might differ due to external
    /// circuitry.
    #[inline]
    pub fn is_set_high(&self) -> bool {
        unsafe { self.pin.out_get() }
    }

    /// Check whether the pin is set low.
    ///
    /// *Note*: The electrical state of the pin might differ due to external
    /// circuitry.
    #[inline]
    pub fn is_set_low(&self) -> bool {
        !unsafe { self.pin.out_get() }
    }
}

impl<PIN: PinOps> OutputPin for Pin<mode::Output, PIN> {
    type Error = core::convert::Infallible;

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_low();
        Ok(())
    }
}

impl<PIN: PinOps> ToggleableOutputPin for Pin<mode::Output, PIN> {
    type Error = core::convert::Infallible;

    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.toggle();
        Ok(())
    }
}

/// # Open-Drain Output
///
/// In open-drain mode the pin either actively drives the line low or
/// releases it to be pulled high externally.  The actual line level can be
/// read back, which allows detecting another party holding the line low
/// (clock stretching, shared buses, 1-wire style protocols).
impl<PIN: PinOps> Pin<mode::OpenDrain, PIN> {
    /// Release the line, letting the external pull-up raise it.
    #[inline]
    pub fn set_high(&mut self) {
        unsafe { self.pin.make_input(false) }
    }

    /// Actively drive the line low.
    #[inline]
    pub fn set_low(&mut self) {
        unsafe { self.pin.make_output() }
    }

    /// Check whether the line is actually high.
    #[inline]
    pub fn is_high(&self) -> bool {
        unsafe { self.pin.in_get() }
    }

    /// Check whether the line is actually low.
    #[inline]
    pub fn is_low(&self) -> bool {
        !unsafe { self.pin.in_get() }
    }
}

impl<PIN: PinOps> OutputPin for Pin<mode::OpenDrain, PIN> {
    type Error = core::convert::Infallible;

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_low();
        Ok(())
    }
}

impl<PIN: PinOps> InputPin for Pin<mode::OpenDrain, PIN> {
    type Error = core::convert::Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.is_high())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.is_low())
    }
}

/// # Digital Input
impl<PIN: PinOps, IMODE: mode::InputMode> Pin<mode::Input<IMODE>, PIN> {
    /// Check whether the pin is driven high.
    #[inline]
    pub fn is_high(&self) -> bool {
        unsafe { self.pin.in_get() }
    }

    /// Check whether the pin is driven low.
    #[inline]
    pub fn is_low(&self) -> bool {
        !unsafe { self.pin.in_get() }
    }
}

impl<PIN: PinOps, IMODE: mode::InputMode> InputPin for Pin<mode::Input<IMODE>, PIN> {
    type Error = core::convert::Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.is_high())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.is_low())
    }
}

/// # Analog Input
///
/// Pins with an ADC channel can be configured as analog inputs.  For those
/// pins, `analog_read()` performs a blocking conversion:
///
/// ```ignore
/// let mut adc = Adc::new(dp.ADC, Default::default());
/// let a0 = pins.pc0.into_analog_input(&mut adc);
///
/// let voltage = a0.analog_read(&mut adc);
/// // ^- this is equivalent to -v
/// let voltage = adc.read_blocking(&a0);
/// ```
impl<PIN: PinOps> Pin<mode::Analog, PIN> {
    pub fn analog_read<H, ADC, CLOCK>(&self, adc: &mut crate::adc::Adc<H, ADC, CLOCK>) -> u16
    where
        Pin<mode::Analog, PIN>: crate::adc::AdcChannel<H, ADC>,
        ADC: crate::adc::AdcOps<H>,
        CLOCK: crate::clock::Clock,
    {
        adc.read_blocking(self)
    }

    /// Convert this pin into a generic [`Channel`][adc-channel] type.
    ///
    /// The generic channel type can be used to store multiple channels in an
    /// array.
    ///
    /// [adc-channel]: crate::adc::Channel
    pub fn into_channel<H, ADC>(self) -> crate::adc::Channel<H, ADC>
    where
        Pin<mode::Analog, PIN>: crate::adc::AdcChannel<H, ADC>,
        ADC: crate::adc::AdcOps<H>,
    {
        crate::adc::Channel::new(self)
    }
}
