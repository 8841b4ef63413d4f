//! Roster domain model.
//!
//! # Responsibility
//! - Define canonical records shared by the reconciler and data sources.
//! - Keep wire naming (camelCase JSON) aligned with the dashboard payloads.
//!
//! # Invariants
//! - Student and course identities are opaque, non-empty strings.
//! - A course `name` is a display attribute; linkage is held by `CourseId`
//!   once a student has entered the roster.

/// Declares an opaque string identity with serde-transparent encoding.
macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns whether the identity is blank after trimming.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

pub(crate) use id_newtype;

pub mod course;
pub mod event;
pub mod student;
