//! Macros making implementing IANA types easier.

/// Creates a standard IANA type wrapping an integer.
///
/// This adds impls for `From`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, and
/// `Hash` as well as wire format parsing and composing.
///
/// For `FromStr` and `Display`, see one of the other macros in this module.
macro_rules! int_enum {
    ( $(#[$attr:meta])* =>
      $ianatype:ident, $inttype:ident;
      $( $(#[$variant_attr:meta])* ( $variant:ident =>
                                        $value:expr, $mnemonic:expr) )* ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $ianatype($inttype);

        impl $ianatype {
            $(
                $(#[$variant_attr])*
                pub const $variant: $ianatype = $ianatype($value);
            )*
        }

        impl $ianatype {
            /// Returns a value from its raw integer value.
            #[must_use]
            pub const fn from_int(value: $inttype) -> Self {
                Self(value)
            }

            /// Returns the raw integer value for a value.
            #[must_use]
            pub const fn to_int(self) -> $inttype {
                self.0
            }

            /// Returns a value from a well-defined mnemonic.
            #[must_use]
            pub fn from_mnemonic(m: &[u8]) -> Option<Self> {
                $(
                    if m.eq_ignore_ascii_case($mnemonic.as_bytes()) {
                        return Some($ianatype::$variant)
                    }
                )*
                None
            }

            /// Returns the mnemonic as a `&str` for this value if there is
            /// one.
            #[must_use]
            pub const fn to_mnemonic_str(self) -> Option<&'static str> {
                match self {
                    $(
                        $ianatype::$variant => {
                            Some($mnemonic)
                        }
                    )*
                    _ => None
                }
            }

            /// The length of the value in wire format.
            pub const COMPOSE_LEN: usize =
                core::mem::size_of::<$inttype>();

            /// Takes a value from the beginning of a parser.
            pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
                parser: &mut octseq::parse::Parser<'_, Octs>
            ) -> Result<Self, $crate::base::wire::ParseError> {
                let mut buf = [0u8; core::mem::size_of::<$inttype>()];
                parser.parse_buf(&mut buf)?;
                Ok(Self::from_int($inttype::from_be_bytes(buf)))
            }

            /// Appends the wire format of the value to a target.
            pub fn compose<Target: octseq::builder::OctetsBuilder + ?Sized>(
                &self,
                target: &mut Target
            ) -> Result<(), Target::AppendError> {
                target.append_slice(&self.to_int().to_be_bytes())
            }
        }

        //--- From

        impl From<$inttype> for $ianatype {
            fn from(value: $inttype) -> Self {
                $ianatype::from_int(value)
            }
        }

        impl From<$ianatype> for $inttype {
            fn from(value: $ianatype) -> Self {
                value.to_int()
            }
        }

        //--- Debug

        impl core::fmt::Debug for $ianatype {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                match self.to_mnemonic_str() {
                    Some(mnemonic) => {
                        write!(
                            f,
                            concat!(stringify!($ianatype), "::{}"),
                            mnemonic
                        )
                    }
                    None => {
                        f.debug_tuple(stringify!($ianatype))
                            .field(&self.0)
                            .finish()
                    }
                }
            }
        }
    }
}

/// Adds impls for `FromStr` and `Display` to the type given as first
/// argument.
///
/// For `FromStr`, recognizes all mnemonics case-insensitively as well as a
/// value prefixed by the given prefix, e.g. `TYPE65534`.
///
/// For `Display`, it will display the mnemonic if there is one or the
/// prefixed decimal value otherwise.
macro_rules! int_enum_str_with_prefix {
    ($ianatype:ident, $str_prefix:expr, $inttype:ident, $error:expr) => {
        impl core::str::FromStr for $ianatype {
            type Err = FromStrError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if let Some(res) = $ianatype::from_mnemonic(s.as_bytes()) {
                    return Ok(res);
                }
                let prefix_len = $str_prefix.len();
                if s.len() > prefix_len
                    && s.is_char_boundary(prefix_len)
                    && s[..prefix_len].eq_ignore_ascii_case($str_prefix)
                {
                    s[prefix_len..]
                        .parse::<$inttype>()
                        .map($ianatype::from_int)
                        .map_err(|_| FromStrError(()))
                } else {
                    Err(FromStrError(()))
                }
            }
        }

        impl core::fmt::Display for $ianatype {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                match self.to_mnemonic_str() {
                    Some(m) => f.write_str(m),
                    None => write!(f, "{}{}", $str_prefix, self.to_int()),
                }
            }
        }

        from_str_error!($error);
    };
}

/// Adds impls for `FromStr` and `Display` recognizing mnemonics only.
///
/// For `Display`, it will display a decimal number for values without
/// mnemonic.
macro_rules! int_enum_str_mnemonics_only {
    ($ianatype:ident, $error:expr) => {
        impl core::str::FromStr for $ianatype {
            type Err = FromStrError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // We assume all mnemonics are always ASCII, so using
                // the bytes representation of `s` is safe.
                $ianatype::from_mnemonic(s.as_bytes())
                    .ok_or(FromStrError(()))
            }
        }

        impl core::fmt::Display for $ianatype {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                match self.to_mnemonic_str() {
                    Some(m) => f.write_str(m),
                    None => write!(f, "{}", self.to_int()),
                }
            }
        }

        from_str_error!($error);
    };
}

macro_rules! from_str_error {
    ($description:expr) => {
        /// An error happened when converting a string into this type.
        #[derive(Clone, Debug, Eq, PartialEq)]
        pub struct FromStrError(());

        impl std::error::Error for FromStrError {}

        impl core::fmt::Display for FromStrError {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                f.write_str($description)
            }
        }
    };
}
