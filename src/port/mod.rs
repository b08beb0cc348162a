//! # Digital I/O for the `PORT#` peripherals
//!
//! This module provides two different APIs for handling port pins.  The
//! default, [`pins`], is a type-level API that tracks the mode of each pin at
//! compile-time.  The alternative, [`dynpins`], is a type-erased, value-level
//! API that tracks the mode of a pin at run-time.
//!
//! The type-level API is strongly preferred.  By representing the mode of
//! each pin within the type system, the compiler can detect logic errors at
//! compile-time and the generated code carries no mode information at all.
//!
//! If needed, [`dynpins`] can be used to erase the type-level differences
//! between pins, e.g. when the pin in use is only decided at run-time from
//! configuration data.  Operations on such pins are checked at run-time and
//! become fallible.
//!
//! The raw register work is described by the [`PinOps`] trait.  It is
//! implemented for every concrete pin type by the chip wiring macro
//! ([`impl_port!`](crate::impl_port)) and should never be called from user
//! code directly.

pub mod pins;
pub use pins::*;

pub mod dynpins;
pub use dynpins::*;

/// Implement the pin structure for one chip.
///
/// This macro generates the `Pins` struct, one zero-sized singleton type per
/// physical pin, the [`PinOps`](crate::port::PinOps) implementations mapping
/// those types onto the PORT/PIN/DDR registers, and the runtime-dispatched
/// `Dynamic` pin for downgraded handles.
#[macro_export]
macro_rules! impl_port {
    (
        enum Ports {
            $($PortName:ident: ($Port:ty, $port_port_reg:ident, $port_pin_reg:ident, $port_ddr_reg:ident),)+
        }

        $(#[$pins_attr:meta])*
        pub struct Pins {
            $($pin:ident: $Pin:ident = ($PinPort:ty, $PinPortName:ident, $pin_num:expr,
                                        $pin_port_reg:ident, $pin_pin_reg:ident,
                                        $pin_ddr_reg:ident),)+
        }
    ) => {
        pub use $crate::port::mode;

        /// Type-alias for a pin type which can represent any concrete pin.
        ///
        /// Sometimes it is easier to handle pins if they are all of the same
        /// type.  By default, each pin gets its own distinct type here, but by
        /// [downgrading][crate::port::Pin#downgrading], you can cast them into
        /// this "dynamic" type.  Do note, however, that using this dynamic
        /// type has a runtime cost.
        pub type Pin<MODE, PIN = Dynamic> = $crate::port::Pin<MODE, PIN>;

        $(#[$pins_attr])*
        pub struct Pins {
            $(pub $pin: Pin<
                mode::Input<mode::Floating>,
                $Pin,
            >,)+
        }

        impl Pins {
            pub fn new(
                $(_: $Port,)+
            ) -> Self {
                Self {
                    $($pin: $crate::port::Pin::new(
                        $Pin { _private: (), }
                    ),)+
                }
            }
        }

        #[repr(u8)]
        pub enum DynamicPort {
            $($PortName,)+
        }

        /// Runtime-dispatched representation of any pin of this chip.
        ///
        /// Created by [downgrading][crate::port::Pin#downgrading] a concrete
        /// pin.  Register accesses go through a `match` on the port, so this
        /// type generates more code than the concrete pin types.
        pub struct Dynamic {
            port: DynamicPort,
            num: u8,
        }

        impl Dynamic {
            fn new(port: DynamicPort, num: u8) -> Self {
                Self { port, num }
            }

            #[inline]
            fn mask(&self) -> u8 {
                1 << self.num
            }
        }

        impl $crate::port::PinOps for Dynamic {
            type Dynamic = Self;

            #[inline]
            fn into_dynamic(self) -> Self::Dynamic {
                self
            }

            #[inline]
            unsafe fn out_set(&mut self) {
                match self.port {
                    $(DynamicPort::$PortName => (*<$Port>::ptr()).$port_port_reg.modify(|r, w| {
                        w.bits(r.bits() | self.mask())
                    }),)+
                }
            }

            #[inline]
            unsafe fn out_clear(&mut self) {
                match self.port {
                    $(DynamicPort::$PortName => (*<$Port>::ptr()).$port_port_reg.modify(|r, w| {
                        w.bits(r.bits() & !self.mask())
                    }),)+
                }
            }

            #[inline]
            unsafe fn out_toggle(&mut self) {
                match self.port {
                    // Writing a 1 to the PIN register toggles the output latch
                    $(DynamicPort::$PortName => (*<$Port>::ptr()).$port_pin_reg.modify(|r, w| {
                        w.bits(r.bits() | self.mask())
                    }),)+
                }
            }

            #[inline]
            unsafe fn out_get(&self) -> bool {
                match self.port {
                    $(DynamicPort::$PortName => (*<$Port>::ptr()).$port_port_reg.read().bits()
                        & self.mask() != 0,)+
                }
            }

            #[inline]
            unsafe fn in_get(&self) -> bool {
                match self.port {
                    $(DynamicPort::$PortName => (*<$Port>::ptr()).$port_pin_reg.read().bits()
                        & self.mask() != 0,)+
                }
            }

            #[inline]
            unsafe fn make_output(&mut self) {
                match self.port {
                    $(DynamicPort::$PortName => (*<$Port>::ptr()).$port_ddr_reg.modify(|r, w| {
                        w.bits(r.bits() | self.mask())
                    }),)+
                }
            }

            #[inline]
            unsafe fn make_input(&mut self, pull_up: bool) {
                match self.port {
                    $(DynamicPort::$PortName => (*<$Port>::ptr()).$port_ddr_reg.modify(|r, w| {
                        w.bits(r.bits() & !self.mask())
                    }),)+
                }
                if pull_up {
                    self.out_set()
                } else {
                    self.out_clear()
                }
            }
        }

        $(
            pub struct $Pin {
                _private: ()
            }

            impl $crate::port::PinOps for $Pin {
                type Dynamic = Dynamic;

                #[inline]
                fn into_dynamic(self) -> Self::Dynamic {
                    Dynamic::new(DynamicPort::$PinPortName, $pin_num)
                }

                #[inline]
                unsafe fn out_set(&mut self) {
                    (*<$PinPort>::ptr()).$pin_port_reg.modify(|r, w| {
                        w.bits(r.bits() | (1 << $pin_num))
                    })
                }

                #[inline]
                unsafe fn out_clear(&mut self) {
                    (*<$PinPort>::ptr()).$pin_port_reg.modify(|r, w| {
                        w.bits(r.bits() & !(1 << $pin_num))
                    })
                }

                #[inline]
                unsafe fn out_toggle(&mut self) {
                    (*<$PinPort>::ptr()).$pin_pin_reg.modify(|r, w| {
                        w.bits(r.bits() | (1 << $pin_num))
                    })
                }

                #[inline]
                unsafe fn out_get(&self) -> bool {
                    (*<$PinPort>::ptr()).$pin_port_reg.read().bits() & (1 << $pin_num) != 0
                }

                #[inline]
                unsafe fn in_get(&self) -> bool {
                    (*<$PinPort>::ptr()).$pin_pin_reg.read().bits() & (1 << $pin_num) != 0
                }

                #[inline]
                unsafe fn make_output(&mut self) {
                    (*<$PinPort>::ptr()).$pin_ddr_reg.modify(|r, w| {
                        w.bits(r.bits() | (1 << $pin_num))
                    })
                }

                #[inline]
                unsafe fn make_input(&mut self, pull_up: bool) {
                    (*<$PinPort>::ptr()).$pin_ddr_reg.modify(|r, w| {
                        w.bits(r.bits() & !(1 << $pin_num))
                    });
                    if pull_up {
                        self.out_set()
                    } else {
                        self.out_clear()
                    }
                }
            }

            impl $crate::port::PinId for $Pin {
                const DYN: $crate::port::DynPinId = $crate::port::DynPinId {
                    port: DynamicPort::$PinPortName as u8,
                    num: $pin_num,
                };

                #[inline]
                unsafe fn new() -> Self {
                    Self { _private: () }
                }
            }
        )+
    };
}
