//! Structured catalog filter: search text, category, sort.
//!
//! The filter is a plain descriptor. The store layer translates it into its
//! own query language; [`ProductFilter::matches`] and
//! [`ProductFilter::compare`] give the same semantics for in-process data.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::product::Product;

/// Column a product listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Price,
    Name,
}

impl SortKey {
    /// Column name in the store.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Price => "price",
            Self::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Error returned for an unknown `key-direction` sort value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sort option: {0}")]
pub struct SortOptionError(pub String);

/// A sort key and direction, written `created_at-desc`, `price-asc`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SortOption {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOption {
    /// Every option the listing page offers, in display order.
    pub const ALL: [Self; 6] = [
        Self::new(SortKey::CreatedAt, SortDirection::Desc),
        Self::new(SortKey::CreatedAt, SortDirection::Asc),
        Self::new(SortKey::Price, SortDirection::Asc),
        Self::new(SortKey::Price, SortDirection::Desc),
        Self::new(SortKey::Name, SortDirection::Asc),
        Self::new(SortKey::Name, SortDirection::Desc),
    ];

    #[must_use]
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Human-readable label for the sort dropdown.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match (self.key, self.direction) {
            (SortKey::CreatedAt, SortDirection::Desc) => "Newest",
            (SortKey::CreatedAt, SortDirection::Asc) => "Oldest",
            (SortKey::Price, SortDirection::Asc) => "Price: low to high",
            (SortKey::Price, SortDirection::Desc) => "Price: high to low",
            (SortKey::Name, SortDirection::Asc) => "Name: A to Z",
            (SortKey::Name, SortDirection::Desc) => "Name: Z to A",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.key.column(), self.direction.as_str())
    }
}

impl FromStr for SortOption {
    type Err = SortOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, direction) = s
            .trim()
            .rsplit_once('-')
            .ok_or_else(|| SortOptionError(s.to_owned()))?;

        let key = match key {
            "created_at" => SortKey::CreatedAt,
            "price" => SortKey::Price,
            "name" => SortKey::Name,
            _ => return Err(SortOptionError(s.to_owned())),
        };
        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(SortOptionError(s.to_owned())),
        };

        Ok(Self::new(key, direction))
    }
}

/// What the shopper asked the catalog for.
///
/// Absent search or category means no constraint. Empty or whitespace-only
/// input is treated as absent, see [`ProductFilter::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl ProductFilter {
    /// Build a filter from raw request input.
    #[must_use]
    pub fn new(search: Option<&str>, category: Option<&str>, sort: SortOption) -> Self {
        Self {
            search: non_blank(search),
            category: non_blank(category),
            sort: sort.key,
            direction: sort.direction,
        }
    }

    #[must_use]
    pub const fn sort_option(&self) -> SortOption {
        SortOption::new(self.sort, self.direction)
    }

    /// Whether anything differs from the default listing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    /// Case-insensitive substring on name or description, exact category.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let search_ok = self.search.as_deref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            product.name.to_lowercase().contains(&needle)
                || product
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        });

        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|category| product.category.as_deref() == Some(category));

        search_ok && category_ok
    }

    /// Ordering of two products under this filter's sort key and direction.
    ///
    /// Ties fall back to ascending id, so the order is total.
    #[must_use]
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let ordering = match self.sort {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Price => a.price.cmp(&b.price),
            SortKey::Name => a.name.cmp(&b.name),
        };

        let ordering = match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
