// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Generates a fieldless kind enum with its keyword mapping: `name()`,
/// case-insensitive `FromStr` and `Display`.
macro_rules! impl_kind_mapping {
    (
        $(#[$attr:meta])*
        enum $ty:ident {
            $(
                $(#[$vattr:meta])*
                $variant:ident => $kw:ident
            ),+ $(,)?
        }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $(#[$attr])*
        pub enum $ty {
            $(
                $(#[$vattr])*
                $variant,
            )+
        }

        impl $ty {
            /// Returns the keyword naming this kind.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(
                        Self::$variant => $kw,
                    )+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($kw) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(())
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.name().fmt(f)
            }
        }
    };
}

/// Generates a parameter value enum that keeps unknown tokens in an `X`
/// variant, so every value survives a round trip.
macro_rules! define_param_enum {
    (
        $(#[$meta:meta])*
        enum $Name:ident {
            $(
                $(#[$vmeta:meta])*
                $Variant:ident => $kw:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $Name {
            $(
                $(#[$vmeta])*
                $Variant,
            )*
            /// Experimental or unrecognized value, kept verbatim
            X(String),
        }

        impl From<&str> for $Name {
            fn from(s: &str) -> Self {
                $(
                    if s.eq_ignore_ascii_case($kw) {
                        return Self::$Variant;
                    }
                )*
                Self::X(s.to_string())
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$Variant => f.write_str($kw),
                    )*
                    Self::X(s) => f.write_str(s),
                }
            }
        }
    };
}
