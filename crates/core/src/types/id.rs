//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different platforms. Klaviyo identifies
//! profiles with opaque strings while Shopify uses numeric IDs, so the macro
//! supports both representations.

/// Macro to define a type-safe ID wrapper.
///
/// `define_id!(Name)` wraps an opaque `String`; `define_id!(Name, u64)`
/// wraps a numeric ID. Both forms get:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - `new()` and `Display`
///
/// # Example
///
/// ```rust
/// # use segment_enrich_core::define_id;
/// define_id!(ListId);
/// define_id!(VariantId, u64);
///
/// let list = ListId::new("Xy12Ab");
/// let variant = VariantId::new(42);
/// assert_eq!(list.as_str(), "Xy12Ab");
/// assert_eq!(variant.get(), 42);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
    ($name:ident, u64) => {
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
        pub struct $name(u64);

        impl $name {
            /// Create a new ID from a u64 value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the underlying u64 value.
            #[must_use]
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

// Klaviyo profile IDs are opaque strings (e.g. "01GDDKASAP8TKDDA2GRZDSVP4H").
define_id!(ProfileId);
// Shopify REST customer IDs.
define_id!(CustomerId, u64);
