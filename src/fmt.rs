//! Logging shims.
//!
//! With the `defmt` feature these forward to the matching `defmt` macros;
//! without it they only borrow their arguments, so host builds need no
//! global logger.

#![allow(unused_macros)]

macro_rules! trace {
  ($s:literal $(, $x:expr)* $(,)?) => {{
    #[cfg(feature = "defmt")]
    ::defmt::trace!($s $(, $x)*);
    #[cfg(not(feature = "defmt"))]
    let _ = ($( & $x, )*);
  }};
}

macro_rules! debug {
  ($s:literal $(, $x:expr)* $(,)?) => {{
    #[cfg(feature = "defmt")]
    ::defmt::debug!($s $(, $x)*);
    #[cfg(not(feature = "defmt"))]
    let _ = ($( & $x, )*);
  }};
}

macro_rules! info {
  ($s:literal $(, $x:expr)* $(,)?) => {{
    #[cfg(feature = "defmt")]
    ::defmt::info!($s $(, $x)*);
    #[cfg(not(feature = "defmt"))]
    let _ = ($( & $x, )*);
  }};
}

macro_rules! warn {
  ($s:literal $(, $x:expr)* $(,)?) => {{
    #[cfg(feature = "defmt")]
    ::defmt::warn!($s $(, $x)*);
    #[cfg(not(feature = "defmt"))]
    let _ = ($( & $x, )*);
  }};
}
