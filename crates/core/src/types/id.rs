//! Newtype IDs for the Stowline entities.
//!
//! Every table keyed by a `SERIAL` column gets its own wrapper so a driver ID
//! can never be passed where a moving partner ID is expected.

/// Define a type-safe `i32` ID wrapper.
///
/// The generated type is `Copy`, serializes transparently as a JSON number,
/// parses from a path segment via `FromStr`, and (with the `postgres`
/// feature) binds directly as an `INT4` column.
///
/// # Example
///
/// ```rust
/// # use stowline_core::define_id;
/// define_id!(TruckId);
/// define_id!(DepotId);
///
/// let truck = TruckId::new(7);
/// assert_eq!(truck.as_i32(), 7);
/// assert_eq!("7".parse::<TruckId>().ok(), Some(truck));
///
/// // Different entity, different type:
/// // let _: DepotId = truck;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw database ID.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw database ID.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::core::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Accounts
define_id!(UserId);
define_id!(AdminId);
define_id!(DriverId);
define_id!(MovingPartnerId);

// Jobs and storage
define_id!(AppointmentId);
define_id!(StorageUnitId);
define_id!(StorageUnitUsageId);
define_id!(StorageUnitCleaningId);
define_id!(VehicleId);

// Bookkeeping
define_id!(AdminLogId);
define_id!(NotificationId);
define_id!(ReviewId);
define_id!(VerificationCodeId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_str_trims_whitespace() {
        assert_eq!(" 42 ".parse::<AppointmentId>().unwrap().as_i32(), 42);
        assert!("abc".parse::<AppointmentId>().is_err());
    }

    #[test]
    fn test_id_serializes_as_number() {
        let json = serde_json::to_string(&StorageUnitId::new(12)).unwrap();
        assert_eq!(json, "12");

        let parsed: DriverId = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, DriverId::new(3));
    }
}
