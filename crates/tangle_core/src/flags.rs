//! Bit-set newtypes persisted as plain integers.

/// Declares a `u32` bit-set newtype with named bits.
///
/// Each bit gets an associated constant and a display name used by
/// [`names`](#method.names). The type serializes as its raw integer.
macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$bit_meta:meta])*
                const $bit:ident = $value:expr, $label:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            $(
                $(#[$bit_meta])*
                pub const $bit: Self = Self($value);
            )*

            const NAMED: &'static [(Self, &'static str)] = &[$((Self::$bit, $label)),*];

            /// No bits set.
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Builds a set from raw bits.
            pub const fn from_bits(bits: u32) -> Self {
                Self(bits)
            }

            /// Returns the raw bits.
            pub const fn bits(self) -> u32 {
                self.0
            }

            /// Returns true when no bit is set.
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Returns true if every bit of `other` is set.
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Returns true if any bit of `other` is set.
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            /// Returns these bits with those of `other` cleared.
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// Sets the bits of `other`.
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            /// Clears the bits of `other`.
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            /// Display names of the named bits that are set.
            pub fn names(self) -> Vec<&'static str> {
                Self::NAMED
                    .iter()
                    .filter(|(flag, _)| self.contains(*flag))
                    .map(|(_, label)| *label)
                    .collect()
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:#x}: {})", stringify!($name), self.0, self.names().join("|"))
            }
        }
    };
}

pub(crate) use flag_set;
