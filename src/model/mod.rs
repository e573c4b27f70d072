//! Typed rows and their JSON shapes (camelCase).

pub mod catalog;
pub mod collection;
pub mod order;
pub mod review;
pub mod seo;
pub mod slider;
pub mod store;
pub mod user;

pub use catalog::*;
pub use collection::Collection;
pub use order::{Order, OrderStatus};
pub use review::{Review, ReviewStatus};
pub use seo::{ResolvedSeo, SeoEntry};
pub use slider::Slider;
pub use store::{Store, StoreStatus};
pub use user::{Role, User, UserStatus};

/// Largest amount a `NUMERIC(12,2)` column holds.
pub fn max_amount() -> rust_decimal::Decimal {
    rust_decimal::Decimal::new(999_999_999_999, 2)
}

/// A status or role column held a value this build does not know.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: String) -> Self {
        UnknownVariant { kind, value }
    }
}

impl From<UnknownVariant> for crate::error::AppError {
    fn from(e: UnknownVariant) -> Self {
        crate::error::AppError::Validation(e.to_string())
    }
}
