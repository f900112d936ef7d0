//! Small `Copy` bitsets over named single-bit members
//!
//! Each generated type is a `u8` newtype with associated constants, set
//! operations and a `Display` that lists the set members' labels separated by
//! commas.

macro_rules! bitset {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $($(#[$item_meta:meta])* const $item:ident = $bit:expr, $label:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(u8);

        impl $name {
            $($(#[$item_meta])* pub const $item: Self = Self(1 << $bit);)+

            const NAMES: &'static [(Self, &'static str)] = &[$((Self::$item, $label)),+];
            const ALL: u8 = 0 $(| (1 << $bit))+;

            pub const fn empty() -> Self {
                Self(0)
            }

            pub const fn bits(self) -> u8 {
                self.0
            }

            /// Build from raw bits, dropping unknown ones
            pub const fn from_bits_truncate(bits: u8) -> Self {
                Self(bits & Self::ALL)
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl core::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut first = true;
                for &(item, label) in Self::NAMES {
                    if self.contains(item) {
                        if !first {
                            f.write_str(",")?;
                        }
                        f.write_str(label)?;
                        first = false;
                    }
                }
                Ok(())
            }
        }
    };
}
