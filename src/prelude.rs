//! Prelude
//!
//! Convenience re-exports of all the traits needed for day-to-day HAL usage.
pub use embedded_hal::prelude::*;

// embedded-hal doesn’t have the v2 digital traits in its prelude, so we need
// to export them ourselves
pub use embedded_hal::digital::v2::InputPin as _embedded_hal_gpio_InputPin;
pub use embedded_hal::digital::v2::OutputPin as _embedded_hal_gpio_OutputPin;
pub use embedded_hal::digital::v2::ToggleableOutputPin as _embedded_hal_gpio_ToggleableOutputPin;

pub use ufmt::uWrite as _ufmt_uWrite;
pub use void::ResultVoidErrExt as _void_ResultVoidErrExt;
pub use void::ResultVoidExt as _void_ResultVoidExt;

pub use crate::simple_pwm::IntoPwmPin as _avr8_hal_simple_pwm_IntoPwmPin;
pub use crate::usart::BaudrateExt as _avr8_hal_usart_BaudrateExt;
