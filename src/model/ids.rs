//! Identifier newtypes used to key catalogs and annotation maps.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Patient identifier, taken from the patient directory name.
    PatientId
);

string_id!(
    /// Body location of a measurement (e.g. "arm", "torso").
    BodyPart
);

string_id!(
    /// Free-text token joining an annotation to a measurement file by substring.
    ExternalId
);

string_id!(
    /// Kind of annotated point (e.g. "lesion", "scar", "skin").
    AnnotationType
);

/// Position of an annotation among those sharing an external id.
///
/// Only meaningful as insertion order: the first annotation for an id is 0,
/// the next 1, and so on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SequenceNumber(pub u32);

impl SequenceNumber {
    /// The sequence number that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&PatientId::new("p1")).unwrap();
        assert_eq!(json, "\"p1\"");

        let body: BodyPart = serde_json::from_str("\"arm\"").unwrap();
        assert_eq!(body.as_str(), "arm");
    }

    #[test]
    fn test_sequence_number_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(SequenceNumber(0), "a");
        map.insert(SequenceNumber(0).next(), "b");

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"0":"a","1":"b"}"#);

        let back: std::collections::BTreeMap<SequenceNumber, String> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back[&SequenceNumber(1)], "b");
    }
}
