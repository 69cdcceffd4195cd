#![forbid(unsafe_code)]

//! Validity condition set.
//!
//! A control's validity is a set of violated conditions drawn from a fixed
//! enumeration mirroring native constraint validation. Absence of a
//! condition means "not violated"; the control is valid exactly when the
//! set is empty.
//!
//! # Invariants
//!
//! 1. A condition is violated exactly when the validator governing it last
//!    evaluated invalid.
//! 2. `ValidityMap::is_valid()` is `true` iff no condition is violated.
//! 3. Each [`ValidityKind`] maps to exactly one flag bit and one stable
//!    snake_case code for i18n lookup.

use bitflags::bitflags;
use std::fmt;

// ---------------------------------------------------------------------------
// ValidityKind
// ---------------------------------------------------------------------------

/// A named validity condition a validator can govern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidityKind {
    /// A required value is absent.
    ValueMissing,
    /// The value does not conform to the expected type (email, url, ...).
    TypeMismatch,
    /// The value does not match the configured pattern.
    PatternMismatch,
    /// The value is longer than allowed.
    TooLong,
    /// The value is shorter than allowed.
    TooShort,
    /// The value is below the allowed minimum.
    RangeUnderflow,
    /// The value is above the allowed maximum.
    RangeOverflow,
    /// The value does not align to the configured step.
    StepMismatch,
    /// The raw input could not be converted to a value at all.
    BadInput,
    /// Author-defined condition. Default for custom validators.
    Custom,
}

impl ValidityKind {
    /// All kinds, in flag-bit order.
    pub const ALL: [Self; 10] = [
        Self::ValueMissing,
        Self::TypeMismatch,
        Self::PatternMismatch,
        Self::TooLong,
        Self::TooShort,
        Self::RangeUnderflow,
        Self::RangeOverflow,
        Self::StepMismatch,
        Self::BadInput,
        Self::Custom,
    ];

    /// The flag bit for this condition.
    #[must_use]
    pub const fn flag(self) -> ValidityFlags {
        match self {
            Self::ValueMissing => ValidityFlags::VALUE_MISSING,
            Self::TypeMismatch => ValidityFlags::TYPE_MISMATCH,
            Self::PatternMismatch => ValidityFlags::PATTERN_MISMATCH,
            Self::TooLong => ValidityFlags::TOO_LONG,
            Self::TooShort => ValidityFlags::TOO_SHORT,
            Self::RangeUnderflow => ValidityFlags::RANGE_UNDERFLOW,
            Self::RangeOverflow => ValidityFlags::RANGE_OVERFLOW,
            Self::StepMismatch => ValidityFlags::STEP_MISMATCH,
            Self::BadInput => ValidityFlags::BAD_INPUT,
            Self::Custom => ValidityFlags::CUSTOM,
        }
    }

    /// Stable snake_case code for programmatic handling and i18n lookup.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ValueMissing => "value_missing",
            Self::TypeMismatch => "type_mismatch",
            Self::PatternMismatch => "pattern_mismatch",
            Self::TooLong => "too_long",
            Self::TooShort => "too_short",
            Self::RangeUnderflow => "range_underflow",
            Self::RangeOverflow => "range_overflow",
            Self::StepMismatch => "step_mismatch",
            Self::BadInput => "bad_input",
            Self::Custom => "custom_error",
        }
    }
}

impl fmt::Display for ValidityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// ValidityFlags
// ---------------------------------------------------------------------------

bitflags! {
    /// Set of violated validity conditions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ValidityFlags: u16 {
        const VALUE_MISSING = 1 << 0;
        const TYPE_MISMATCH = 1 << 1;
        const PATTERN_MISMATCH = 1 << 2;
        const TOO_LONG = 1 << 3;
        const TOO_SHORT = 1 << 4;
        const RANGE_UNDERFLOW = 1 << 5;
        const RANGE_OVERFLOW = 1 << 6;
        const STEP_MISMATCH = 1 << 7;
        const BAD_INPUT = 1 << 8;
        const CUSTOM = 1 << 9;
    }
}

// ---------------------------------------------------------------------------
// ValidityMap
// ---------------------------------------------------------------------------

/// Mapping from validity condition to violated/ok, with kind-based access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidityMap {
    flags: ValidityFlags,
}

#[cfg(feature = "serde")]
impl serde::Serialize for ValidityMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.flags.bits())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ValidityMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u16::deserialize(deserializer)?;
        Ok(Self {
            flags: ValidityFlags::from_bits_truncate(bits),
        })
    }
}

impl ValidityMap {
    /// An empty (fully valid) map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: ValidityFlags::empty(),
        }
    }

    /// Mark a condition violated or cleared.
    pub fn set(&mut self, kind: ValidityKind, violated: bool) {
        self.flags.set(kind.flag(), violated);
    }

    /// Whether the given condition is violated.
    #[must_use]
    pub fn is_violated(&self, kind: ValidityKind) -> bool {
        self.flags.contains(kind.flag())
    }

    /// Whether the control is valid: no condition violated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.flags.is_empty()
    }

    /// Clear every condition.
    pub fn clear(&mut self) {
        self.flags = ValidityFlags::empty();
    }

    /// The raw flag set.
    #[must_use]
    pub const fn flags(&self) -> ValidityFlags {
        self.flags
    }

    /// Violated conditions, in flag-bit order.
    pub fn violated_kinds(&self) -> impl Iterator<Item = ValidityKind> + '_ {
        ValidityKind::ALL
            .into_iter()
            .filter(|kind| self.is_violated(*kind))
    }
}

impl fmt::Display for ValidityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return f.write_str("valid");
        }
        let mut first = true;
        for kind in self.violated_kinds() {
            if !first {
                f.write_str("+")?;
            }
            first = false;
            f.write_str(kind.code())?;
        }
        Ok(())
    }
}
