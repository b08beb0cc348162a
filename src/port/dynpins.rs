//! # Type-erased, value-level module for port pins
//!
//! Although the type-level API is generally preferred, it is not suitable in
//! all cases.  Because each pin and mode is represented by a distinct type,
//! it is not possible to store differently-configured pins in a homogeneous
//! data structure, or to pick a pin's mode from run-time configuration data.
//! The value-level API solves this by erasing the type information and
//! tracking both pin identity and mode at run-time.
//!
//! Value-level pins are represented by the [`DynPin`] type, carrying a
//! [`DynPinId`] (port and bit number) and a [`DynPinMode`].  A `DynPin`
//! cannot be created directly; it is obtained from a type-level pin via
//! [`Pin::into_dynamic`]:
//!
//! ```ignore
//! let led = pins.pb5.into_output();
//! let mut led: DynPin = led.into_dynamic();
//! ```
//!
//! Because the mode can no longer be tracked at compile-time, operations
//! become fallible.  Run-time checks are inserted to ensure that users don't
//! try to, for example, set the output level of an input pin; such misuse is
//! reported as [`PinError::InvalidPinType`].
//!
//! A `DynPin` can be converted back to its type-level equivalent with
//! [`TryFrom`](core::convert::TryFrom)/[`TryInto`](core::convert::TryInto).
//! The conversion checks both pin identity and mode at run-time and never
//! touches the hardware, so the configured output level survives the round
//! trip:
//!
//! ```ignore
//! let mut led: DynPin = pins.pb5.into_output().into_dynamic();
//! // ...
//! let led: Pin<mode::Output, PB5> = led.try_into().unwrap();
//! ```
//!
//! # Embedded HAL traits
//!
//! This module implements the embedded HAL digital traits for [`DynPin`].
//! Whereas the type-level API uses `Error = Infallible`, the value-level API
//! returns [`PinError::InvalidPinType`] if the pin is not in the correct mode
//! for the operation.

use core::convert::TryFrom;
use embedded_hal::digital::v2::{InputPin, OutputPin, ToggleableOutputPin};

use super::pins::{mode, Pin, PinError, PinId, PinMode, PinOps};

//==================================================================================================
//  DynPinMode configurations
//==================================================================================================

/// Value-level `enum` for input configurations
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DynInput {
    Floating,
    PullUp,
}

/// Value-level `enum` for output configurations
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DynOutput {
    PushPull,
    OpenDrain,
}

//==================================================================================================
//  DynPinMode
//==================================================================================================

/// Value-level `enum` representing pin modes
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DynPinMode {
    Input(DynInput),
    Output(DynOutput),
}

/// Value-level variant of [`DynPinMode`] for floating input mode
pub const DYN_FLOATING_INPUT: DynPinMode = DynPinMode::Input(DynInput::Floating);
/// Value-level variant of [`DynPinMode`] for pull-up input mode
pub const DYN_PULL_UP_INPUT: DynPinMode = DynPinMode::Input(DynInput::PullUp);
/// Value-level variant of [`DynPinMode`] for push-pull output mode
pub const DYN_PUSH_PULL_OUTPUT: DynPinMode = DynPinMode::Output(DynOutput::PushPull);
/// Value-level variant of [`DynPinMode`] for open-drain output mode
pub const DYN_OPEN_DRAIN_OUTPUT: DynPinMode = DynPinMode::Output(DynOutput::OpenDrain);

/// Type-level pin modes which have a value-level equivalent and can therefore
/// be represented by a [`DynPin`].
///
/// [`mode::Input<AnyInput>`](mode::AnyInput), [`mode::Analog`] and
/// [`mode::PwmOutput`] have no value-level equivalent, so pins in those modes
/// cannot be fully type-erased.
pub trait ErasableMode: PinMode {
    /// Corresponding [`DynPinMode`]
    const DYN: DynPinMode;
}

impl ErasableMode for mode::Output {
    const DYN: DynPinMode = DYN_PUSH_PULL_OUTPUT;
}
impl ErasableMode for mode::OpenDrain {
    const DYN: DynPinMode = DYN_OPEN_DRAIN_OUTPUT;
}
impl ErasableMode for mode::Input<mode::Floating> {
    const DYN: DynPinMode = DYN_FLOATING_INPUT;
}
impl ErasableMode for mode::Input<mode::PullUp> {
    const DYN: DynPinMode = DYN_PULL_UP_INPUT;
}

//==================================================================================================
//  DynPinId
//==================================================================================================

/// Value-level `struct` representing pin identities.
///
/// The `port` field is the index of the pin's port in the chip's port list
/// (the chip wiring macro's `DynamicPort` enum).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DynPinId {
    pub port: u8,
    pub num: u8,
}

//==================================================================================================
//  DynPin
//==================================================================================================

/// A value-level pin, parameterized by the chip's runtime-dispatched pin
/// representation.
///
/// This type acts as a type-erased version of [`Pin`].  Every pin is
/// represented by the same type, and pins are tracked and distinguished at
/// run-time.  The chip wiring module aliases this to a concrete `DynPin`
/// type.
pub struct DynPin<PD> {
    pin: PD,
    id: DynPinId,
    mode: DynPinMode,
}

impl<PD: PinOps> DynPin<PD> {
    pub(crate) fn new(pin: PD, id: DynPinId, mode: DynPinMode) -> Self {
        DynPin { pin, id, mode }
    }

    /// Return a copy of the pin identity
    #[inline]
    pub fn id(&self) -> DynPinId {
        self.id
    }

    /// Return a copy of the pin mode
    #[inline]
    pub fn mode(&self) -> DynPinMode {
        self.mode
    }

    /// Convert the pin to the requested [`DynPinMode`]
    pub fn into_mode(&mut self, mode: DynPinMode) {
        // Only touch the registers if the mode actually changes
        if mode != self.mode {
            match mode {
                DynPinMode::Input(DynInput::Floating) => unsafe {
                    self.pin.make_input(false);
                },
                DynPinMode::Input(DynInput::PullUp) => unsafe {
                    self.pin.make_input(true);
                },
                DynPinMode::Output(DynOutput::PushPull) => unsafe {
                    self.pin.out_clear();
                    self.pin.make_output();
                },
                DynPinMode::Output(DynOutput::OpenDrain) => unsafe {
                    // Latch low, direction decides between drive-low and
                    // released
                    self.pin.out_clear();
                    self.pin.make_input(false);
                },
            }
            self.mode = mode;
        }
    }

    /// Configure the pin to operate as a floating input
    #[inline]
    pub fn into_floating_input(&mut self) {
        self.into_mode(DYN_FLOATING_INPUT);
    }

    /// Configure the pin to operate as a pulled-up input
    #[inline]
    pub fn into_pull_up_input(&mut self) {
        self.into_mode(DYN_PULL_UP_INPUT);
    }

    /// Configure the pin to operate as a push-pull output
    #[inline]
    pub fn into_output(&mut self) {
        self.into_mode(DYN_PUSH_PULL_OUTPUT);
    }

    /// Configure the pin to operate as an open-drain output
    #[inline]
    pub fn into_opendrain(&mut self) {
        self.into_mode(DYN_OPEN_DRAIN_OUTPUT);
    }

    #[inline]
    fn _read(&self) -> Result<bool, PinError> {
        match self.mode {
            // The PIN register reflects the real line level, which is also
            // the interesting one for an open-drain pin
            DynPinMode::Input(_) | DYN_OPEN_DRAIN_OUTPUT => Ok(unsafe { self.pin.in_get() }),
            _ => Err(PinError::InvalidPinType),
        }
    }

    #[inline]
    fn _write(&mut self, bit: bool) -> Result<(), PinError> {
        match self.mode {
            DYN_PUSH_PULL_OUTPUT => {
                if bit {
                    unsafe { self.pin.out_set() };
                } else {
                    unsafe { self.pin.out_clear() };
                }
                Ok(())
            }
            DYN_OPEN_DRAIN_OUTPUT => {
                if bit {
                    unsafe { self.pin.make_input(false) };
                } else {
                    unsafe { self.pin.make_output() };
                }
                Ok(())
            }
            _ => Err(PinError::InvalidPinType),
        }
    }

    #[inline]
    fn _toggle(&mut self) -> Result<(), PinError> {
        match self.mode {
            DYN_PUSH_PULL_OUTPUT => {
                unsafe { self.pin.out_toggle() };
                Ok(())
            }
            _ => Err(PinError::InvalidPinType),
        }
    }

    #[inline]
    fn _is_high(&self) -> Result<bool, PinError> {
        self._read()
    }

    #[inline]
    fn _is_low(&self) -> Result<bool, PinError> {
        self._read().map(|v| !v)
    }

    #[inline]
    fn _set_high(&mut self) -> Result<(), PinError> {
        self._write(true)
    }

    #[inline]
    fn _set_low(&mut self) -> Result<(), PinError> {
        self._write(false)
    }

    /// Check whether the output latch of a push-pull output is set high.
    ///
    /// *Note*: The electrical state of the pin might differ due to external
    /// circuitry.
    #[inline]
    pub fn is_set_high(&self) -> Result<bool, PinError> {
        match self.mode {
            DYN_PUSH_PULL_OUTPUT => Ok(unsafe { self.pin.out_get() }),
            _ => Err(PinError::InvalidPinType),
        }
    }

    /// Check whether the output latch of a push-pull output is set low.
    #[inline]
    pub fn is_set_low(&self) -> Result<bool, PinError> {
        self.is_set_high().map(|v| !v)
    }
}

//==================================================================================================
//  Convert between Pin and DynPin
//==================================================================================================

/// # Type Erasure
/// A pin in one of the digital I/O modes can be fully type-erased, mode
/// included.  Erasure never touches the hardware, it only records identity
/// and mode for the run-time checks.
impl<PIN, MODE> Pin<MODE, PIN>
where
    PIN: PinId,
    MODE: ErasableMode,
{
    /// Erase both the pin identity and the mode, returning a value-level
    /// [`DynPin`].
    pub fn into_dynamic(self) -> DynPin<PIN::Dynamic>
    where
        <PIN as PinOps>::Dynamic: PinOps,
    {
        DynPin::new(self.pin.into_dynamic(), PIN::DYN, MODE::DYN)
    }
}

impl<PIN, MODE> TryFrom<DynPin<PIN::Dynamic>> for Pin<MODE, PIN>
where
    PIN: PinId,
    MODE: ErasableMode,
{
    type Error = PinError;

    /// Try to recreate a type-level [`Pin`] from a value-level [`DynPin`]
    ///
    /// There is no way for the compiler to know if the conversion will be
    /// successful at compile-time.  We must verify the conversion at run-time
    /// or refuse to perform it.
    fn try_from(pin: DynPin<PIN::Dynamic>) -> Result<Self, Self::Error> {
        if pin.id == PIN::DYN && pin.mode == MODE::DYN {
            // The DynPin is consumed, so it is safe to replace it with the
            // corresponding typed singleton
            Ok(Pin {
                pin: unsafe { PIN::new() },
                _mode: core::marker::PhantomData,
            })
        } else {
            Err(PinError::InvalidPinType)
        }
    }
}

//==================================================================================================
//  Embedded HAL traits
//==================================================================================================

impl<PD: PinOps> OutputPin for DynPin<PD> {
    type Error = PinError;

    #[inline]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self._set_high()
    }

    #[inline]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self._set_low()
    }
}

impl<PD: PinOps> InputPin for DynPin<PD> {
    type Error = PinError;

    #[inline]
    fn is_high(&self) -> Result<bool, Self::Error> {
        self._is_high()
    }

    #[inline]
    fn is_low(&self) -> Result<bool, Self::Error> {
        self._is_low()
    }
}

impl<PD: PinOps> ToggleableOutputPin for DynPin<PD> {
    type Error = PinError;

    #[inline]
    fn toggle(&mut self) -> Result<(), Self::Error> {
        self._toggle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::TryInto;
    use core::sync::atomic::{AtomicU8, Ordering};

    const DDR: u8 = 1 << 0;
    const PORT: u8 = 1 << 1;

    /// Fake register backing for one pin, stands in for the real PORT/DDR
    /// bits during host tests.
    static REGS: AtomicU8 = AtomicU8::new(0);

    /// The fake registers are shared state, so tests touching them must not
    /// run concurrently.
    static REGS_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn reg_set(mask: u8, value: bool) {
        if value {
            REGS.fetch_or(mask, Ordering::SeqCst);
        } else {
            REGS.fetch_and(!mask, Ordering::SeqCst);
        }
    }

    fn reg_get(mask: u8) -> bool {
        REGS.load(Ordering::SeqCst) & mask != 0
    }

    macro_rules! mock_pin_ops {
        () => {
            unsafe fn out_set(&mut self) {
                reg_set(PORT, true);
            }
            unsafe fn out_clear(&mut self) {
                reg_set(PORT, false);
            }
            unsafe fn out_toggle(&mut self) {
                reg_set(PORT, !reg_get(PORT));
            }
            unsafe fn out_get(&self) -> bool {
                reg_get(PORT)
            }
            unsafe fn in_get(&self) -> bool {
                reg_get(PORT)
            }
            unsafe fn make_output(&mut self) {
                reg_set(DDR, true);
            }
            unsafe fn make_input(&mut self, pull_up: bool) {
                reg_set(DDR, false);
                reg_set(PORT, pull_up);
            }
        };
    }

    struct MockPb3 {
        _private: (),
    }

    struct MockDynamic;

    impl PinOps for MockPb3 {
        type Dynamic = MockDynamic;

        fn into_dynamic(self) -> MockDynamic {
            MockDynamic
        }

        mock_pin_ops!();
    }

    impl PinOps for MockDynamic {
        type Dynamic = Self;

        fn into_dynamic(self) -> Self {
            self
        }

        mock_pin_ops!();
    }

    impl PinId for MockPb3 {
        const DYN: DynPinId = DynPinId { port: 1, num: 3 };

        unsafe fn new() -> Self {
            MockPb3 { _private: () }
        }
    }

    fn dyn_pin(mode: DynPinMode) -> DynPin<MockDynamic> {
        DynPin::new(MockDynamic, MockPb3::DYN, mode)
    }

    #[test]
    fn input_pin_rejects_output_operations() {
        let _guard = REGS_LOCK.lock().unwrap();
        let mut pin = dyn_pin(DYN_FLOATING_INPUT);
        assert_eq!(pin._set_high(), Err(PinError::InvalidPinType));
        assert_eq!(pin._toggle(), Err(PinError::InvalidPinType));
        assert_eq!(pin.is_set_high(), Err(PinError::InvalidPinType));
        assert!(pin._is_high().is_ok());
    }

    #[test]
    fn output_pin_rejects_input_operations() {
        let _guard = REGS_LOCK.lock().unwrap();
        let mut pin = dyn_pin(DYN_PUSH_PULL_OUTPUT);
        assert_eq!(pin._is_high(), Err(PinError::InvalidPinType));
        assert!(pin._set_high().is_ok());
        assert!(pin._toggle().is_ok());
    }

    #[test]
    fn open_drain_pin_reads_but_does_not_toggle() {
        let _guard = REGS_LOCK.lock().unwrap();
        let mut pin = dyn_pin(DYN_OPEN_DRAIN_OUTPUT);
        assert!(pin._is_high().is_ok());
        assert!(pin._set_low().is_ok());
        assert_eq!(pin._toggle(), Err(PinError::InvalidPinType));
    }

    #[test]
    fn mode_conversion_gates_operations() {
        let _guard = REGS_LOCK.lock().unwrap();
        let mut pin = dyn_pin(DYN_FLOATING_INPUT);
        assert!(pin._set_high().is_err());
        pin.into_output();
        assert_eq!(pin.mode(), DYN_PUSH_PULL_OUTPUT);
        assert!(pin._set_high().is_ok());
        pin.into_pull_up_input();
        assert!(pin._set_high().is_err());
    }

    #[test]
    fn erase_and_restore_preserves_identity_and_level() {
        let _guard = REGS_LOCK.lock().unwrap();
        let typed: Pin<mode::Input<mode::Floating>, MockPb3> =
            Pin::new(unsafe { MockPb3::new() });
        let mut typed = typed.into_output();
        typed.set_high();

        let erased = typed.into_dynamic();
        assert_eq!(erased.id(), DynPinId { port: 1, num: 3 });
        assert_eq!(erased.mode(), DYN_PUSH_PULL_OUTPUT);
        // Erasure must not touch the output latch
        assert_eq!(erased.is_set_high(), Ok(true));

        let restored: Pin<mode::Output, MockPb3> = erased.try_into().unwrap();
        assert!(restored.is_set_high());
    }

    #[test]
    fn restore_with_wrong_mode_fails() {
        let _guard = REGS_LOCK.lock().unwrap();
        let erased = dyn_pin(DYN_PULL_UP_INPUT);
        let restored: Result<Pin<mode::Output, MockPb3>, _> = erased.try_into();
        assert_eq!(restored.unwrap_err(), PinError::InvalidPinType);
    }
}
