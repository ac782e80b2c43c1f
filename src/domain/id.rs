//! Domain GUID types with the NewType pattern
//!
//! Type-safe wrappers for resource GUIDs so an organization GUID can never be
//! bound where an isolation segment GUID is expected.

use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::{Decode, Encode, Sqlite, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Generate a NewType GUID wrapper with all required traits
macro_rules! domain_guid {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random GUID
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wrap a string read back from the database
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Wrap a string slice without validating it
            pub fn from_str_unchecked(s: &str) -> Self {
                Self(s.to_string())
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert to inner string value
            pub fn into_string(self) -> String {
                self.0
            }

            /// Parse and validate a UUID string
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s)?;
                Ok(Self(s.to_string()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Type<Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as Type<Sqlite>>::type_info()
            }
        }

        impl<'q> Encode<'q, Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<IsNull, BoxDynError> {
                <String as Encode<'q, Sqlite>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> Decode<'r, Sqlite> for $name {
            fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <String as Decode<'r, Sqlite>>::decode(value)?;
                Ok(Self(s))
            }
        }
    };
}

domain_guid!(
    /// GUID of an isolation segment
    IsolationSegmentGuid
);

domain_guid!(
    /// GUID of an organization
    OrganizationGuid
);

domain_guid!(
    /// GUID of a label attached to an isolation segment
    LabelGuid
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_guids_are_unique_uuids() {
        let a = IsolationSegmentGuid::new();
        let b = IsolationSegmentGuid::new();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_parse_rejects_non_uuid() {
        assert!(OrganizationGuid::parse("not-a-guid").is_err());
        assert!("933b4c58-120b-499a-b85d-4b6fc9e2903b".parse::<IsolationSegmentGuid>().is_ok());
    }

    #[test]
    fn test_serde_is_transparent() {
        let guid = OrganizationGuid::from_str_unchecked("org-1");
        assert_eq!(serde_json::to_string(&guid).unwrap(), "\"org-1\"");
        let back: OrganizationGuid = serde_json::from_str("\"org-1\"").unwrap();
        assert_eq!(back, guid);
    }
}
