//! Data models for the maintenance server

/// Implements the text form of a string-backed enum: `as_str`, `Display`,
/// `FromStr` and the SQLx conversions used by the PostgreSQL store.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Invalid {}: {}", stringify!($name), other)),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub mod equipment;
pub mod serde_helpers;
pub mod user;
pub mod work_order;

use serde::Serialize;
use utoipa::ToSchema;

pub use equipment::{Equipment, EquipmentKind, EquipmentStatus};
pub use user::{Caller, Role, User};
pub use work_order::{HistoryEntry, Priority, WorkOrder, WorkOrderStatus};

/// One page of a filtered listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Paginated<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Items on the requested page
    pub items: Vec<T>,
    /// Requested page (1-indexed)
    pub page: i64,
    /// Total number of pages
    pub pages: i64,
    /// Total number of matching records
    pub total: i64,
}

/// 1-indexed page position resolved against a fixed page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Pages below 1 (or missing) fall back to the first page
    pub fn new(page: Option<i64>, page_size: i64) -> Self {
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn page_count(&self, total: i64) -> i64 {
        (total + self.page_size - 1) / self.page_size
    }

    pub fn wrap<T>(&self, items: Vec<T>, total: i64) -> Paginated<T>
    where
        T: for<'a> ToSchema<'a>,
    {
        Paginated {
            items,
            page: self.page,
            pages: self.page_count(total),
            total,
        }
    }
}
