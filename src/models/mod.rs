//! Data models for Gearhouse

/// Stores a string-backed enum in a TEXT column through its `as_str` /
/// `FromStr` pair.
macro_rules! impl_text_column {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

pub mod deletion;
pub mod equipment;
pub mod import_report;
pub mod log;
pub mod movement;
pub mod status;
pub mod ticket;
pub mod user;

// Re-export commonly used types
pub use equipment::{Equipment, MatchKey};
pub use log::{LogEntry, LogKind};
pub use status::EquipmentStatus;
pub use user::{Role, User, UserClaims};

/// Today's date on the server's local clock. Overdue checks and log dates
/// both use it.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
