//! Kernel error handling infrastructure.
//!
//! Provides the `define_kernel_error!` macro for consistent error type
//! definitions, and the handful of concrete error enums the ambient
//! (non-core) layers of this kernel raise. The Scheme runtime itself does
//! not use this: its own failure policy is `panic` and negative-integer
//! returns, documented on the runtime's own types.
//!
//! ## Usage
//!
//! ### Simple errors (no inner data)
//! ```ignore
//! define_kernel_error! {
//!     pub enum HalError(0x01) {
//!         DivisorZero = 0x01 => "PIT frequency too high for divisor",
//!     }
//! }
//! ```
//!
//! ### Nested errors (with inner error type)
//! ```ignore
//! define_kernel_error! {
//!     pub enum BootError(0x02) {
//!         Hal(HalError) = 0x01 => "HAL initialization failed",
//!     }
//! }
//! ```

#![no_std]

/// Macro to define a kernel error type with consistent handling.
///
/// Supports both simple variants and nested variants containing inner errors.
#[macro_export]
macro_rules! define_kernel_error {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($subsystem:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(($inner:ty))? = $code:literal => $desc:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $(($inner))?,
            )*
        }

        impl $name {
            /// Subsystem identifier for this error type.
            pub const SUBSYSTEM: u8 = $subsystem;

            /// Get numeric error code for debugging.
            pub const fn code(&self) -> u16 {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? _unused) => {
                            (($subsystem as u16) << 8) | $code
                        }
                    )*
                }
            }

            /// Get error name for logging.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? _unused) => {
                            $desc
                        }
                    )*
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? inner) => {
                            $crate::define_kernel_error!(@display_body self f $desc $(($inner))? inner)
                        }
                    )*
                }
            }
        }

        impl core::error::Error for $name {}
    };

    // Helper to generate patterns
    (@pattern $variant:ident ($inner:ty) $bind:ident) => { Self::$variant($bind) };
    (@pattern $variant:ident $bind:ident) => { Self::$variant };

    // Helper to generate display bodies
    (@display_body $self:ident $f:ident $desc:literal ($inner:ty) $bind:ident) => {
        write!($f, "E{:04X}: {} ({})", $self.code(), $desc, $bind)
    };
    (@display_body $self:ident $f:ident $desc:literal $bind:ident) => {
        write!($f, "E{:04X}: {}", $self.code(), $desc)
    };
}

define_kernel_error! {
    /// Failures raised by the HAL during device bring-up. The runtime core
    /// never sees these; they are surfaced by `kmain` before a single
    /// Scheme runtime is constructed.
    pub enum HalError(0x01) {
        /// Requested PIT frequency does not fit the 16-bit divisor.
        PitDivisorOutOfRange = 0x01 => "PIT frequency out of representable range",
    }
}

define_kernel_error! {
    /// Failures raised by the host harness (`std`-feature binary) reading
    /// program/disk-image files from the local filesystem.
    pub enum HostError(0x02) {
        /// The program or disk-image file could not be read.
        FileRead = 0x01 => "failed to read input file",
        /// A supplied disk image exceeds the configured RAM-disk capacity.
        DiskImageTooLarge = 0x02 => "disk image exceeds ram-disk capacity",
    }
}

#[cfg(test)]
mod tests {

    define_kernel_error! {
        /// Test error type
        pub enum TestError(0xFF) {
            /// First error
            First = 0x01 => "First error",
            /// Second error
            Second = 0x02 => "Second error",
        }
    }

    define_kernel_error! {
        pub enum NestedTestError(0xFE) {
            Inner(TestError) = 0x01 => "Nested error",
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(TestError::First.code(), 0xFF01);
        assert_eq!(TestError::Second.code(), 0xFF02);
        assert_eq!(NestedTestError::Inner(TestError::First).code(), 0xFE01);
    }

    #[test]
    fn test_error_names() {
        assert_eq!(TestError::First.name(), "First error");
        assert_eq!(TestError::Second.name(), "Second error");
        assert_eq!(
            NestedTestError::Inner(TestError::First).name(),
            "Nested error"
        );
    }

    #[test]
    fn test_display_format() {
        extern crate std;
        use std::format;
        assert_eq!(format!("{}", TestError::First), "EFF01: First error");

        let inner = TestError::First;
        assert_eq!(
            format!("{}", NestedTestError::Inner(inner)),
            "EFE01: Nested error (EFF01: First error)"
        );
    }

    #[test]
    fn test_subsystem_constant() {
        assert_eq!(TestError::SUBSYSTEM, 0xFF);
        assert_eq!(NestedTestError::SUBSYSTEM, 0xFE);
    }

    #[test]
    fn test_real_error_codes() {
        assert_eq!(super::HalError::PitDivisorOutOfRange.code(), 0x0101);
        assert_eq!(super::HostError::FileRead.code(), 0x0201);
    }
}
