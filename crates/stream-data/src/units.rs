//! The enumerated physical units a channel's samples may be expressed in.

/// Physical unit code carried per channel in a [`crate::StreamData`].
///
/// Stored and transmitted as a `u32`; [`Unit::Other`] preserves any code not
/// recognized by this build so round-tripping an unknown unit through the
/// wire or file formats never loses information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// No physical unit; raw counts.
    None,
    /// Volts.
    Volt,
    /// Amperes.
    Ampere,
    /// Degrees Celsius.
    Celsius,
    /// Pascals.
    Pascal,
    /// Hertz.
    Hertz,
    /// A unit code this build does not recognize, preserved verbatim.
    Other(u32),
}

impl Unit {
    /// Decodes a unit code read from the wire or a file.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Unit::None,
            1 => Unit::Volt,
            2 => Unit::Ampere,
            3 => Unit::Celsius,
            4 => Unit::Pascal,
            5 => Unit::Hertz,
            other => Unit::Other(other),
        }
    }

    /// Encodes the unit back to its wire/file code.
    pub fn to_code(self) -> u32 {
        match self {
            Unit::None => 0,
            Unit::Volt => 1,
            Unit::Ampere => 2,
            Unit::Celsius => 3,
            Unit::Pascal => 4,
            Unit::Hertz => 5,
            Unit::Other(code) => code,
        }
    }

    /// A short label suitable for the file codec's `to_human` header line,
    /// e.g. `channel 0 (V)`.
    pub fn label(self) -> &'static str {
        match self {
            Unit::None => "none",
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Celsius => "C",
            Unit::Pascal => "Pa",
            Unit::Hertz => "Hz",
            Unit::Other(_) => "?",
        }
    }
}
