// crates/types/src/lib.rs
//! Wire types shared by every AgencyDesk crate.
//!
//! Everything here is plain data: enumerated statuses stored as TEXT in
//! SQLite, attachment descriptors, storage buckets and realtime change
//! events. With the `codegen` feature enabled, `cargo test` exports the
//! TypeScript bindings consumed by the dashboard.

use thiserror::Error;

/// Returned when a TEXT column or request field holds a value outside an
/// enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}' (expected one of: {})", .allowed.join(", "))]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub allowed: &'static [&'static str],
}

/// Declares a string-backed enum with `as_str`, `ALL`, `Display` and
/// `FromStr`. The string forms are the values stored in the database.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, ts_rs::TS)]
        #[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every accepted string form, in declaration order.
            pub const ALL: &'static [&'static str] = &[$($text),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err($crate::ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                        allowed: Self::ALL,
                    }),
                }
            }
        }
    };
}

pub(crate) use string_enum;

mod attachment;
mod bucket;
mod realtime;
mod status;

pub use attachment::*;
pub use bucket::*;
pub use realtime::*;
pub use status::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_lists_allowed_values() {
        let err = "owner".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "role");
        assert_eq!(
            err.to_string(),
            "invalid role 'owner' (expected one of: client, admin, staff, influencer)"
        );
    }
}
