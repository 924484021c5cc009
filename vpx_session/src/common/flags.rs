//! Bit-set newtypes for engine flags.

/// Declares a `u32` bit-set newtype with named constants, set operators and
/// a `Debug` impl that lists the set names.
macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* const $flag:ident = $value:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u32);

        impl $name {
            $( $(#[$fmeta])* pub const $flag: $name = $name($value); )*

            const NAMED: &'static [(&'static str, $name)] = &[$( (stringify!($flag), $name::$flag) ),*];

            pub const fn empty() -> Self {
                $name(0)
            }

            pub const fn from_bits(bits: u32) -> Self {
                $name(bits)
            }

            pub const fn bits(&self) -> u32 {
                self.0
            }

            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// True when every bit of `other` is set in `self`.
            pub const fn contains(&self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = $name;

            fn bitand(self, rhs: $name) -> $name {
                $name(self.0 & rhs.0)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut names = $name::NAMED
                    .iter()
                    .filter(|(_, flag)| !flag.is_empty() && self.contains(*flag))
                    .map(|(name, _)| *name)
                    .peekable();
                if names.peek().is_none() {
                    return write!(f, "{}({:#x})", stringify!($name), self.0);
                }
                write!(f, "{}(", stringify!($name))?;
                let mut first = true;
                for name in names {
                    if !first {
                        f.write_str(" | ")?;
                    }
                    f.write_str(name)?;
                    first = false;
                }
                f.write_str(")")
            }
        }
    };
}

pub(crate) use flag_set;
