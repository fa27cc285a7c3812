//! Cart line quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantities start at one; zero means "remove the line".
    #[error("quantity must be at least 1")]
    NotPositive,

    #[error("quantity must be at most {}", u32::MAX)]
    TooLarge,
}

/// A positive cart line quantity.
///
/// A cart line never holds zero units: a request to set zero or a negative
/// number is a removal, so [`Quantity::from_signed`] returns `Ok(None)` for
/// it and callers branch on that.
///
/// ```
/// use online_store_core::{Quantity, QuantityError};
///
/// assert_eq!(Quantity::from_signed(3).unwrap().map(Quantity::get), Some(3));
/// assert_eq!(Quantity::from_signed(0), Ok(None));
/// assert_eq!(Quantity::from_signed(-2), Ok(None));
/// assert_eq!(Quantity::from_signed(1 << 32), Err(QuantityError::TooLarge));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity from an unsigned value.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NotPositive`] for zero.
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(QuantityError::NotPositive)
    }

    /// Interpret a signed request value; `Ok(None)` means the line should go.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::TooLarge`] above `u32::MAX`.
    pub fn from_signed(value: i64) -> Result<Option<Self>, QuantityError> {
        if value <= 0 {
            return Ok(None);
        }
        u32::try_from(value)
            .map_err(|_| QuantityError::TooLarge)
            .map(|value| NonZeroU32::new(value).map(Self))
    }

    /// The numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// One more unit, saturating at `u32::MAX`.
    #[must_use]
    pub const fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
