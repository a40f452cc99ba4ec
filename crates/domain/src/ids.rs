use crate::error::{AllocationError, Result};
use serde::{Deserialize, Serialize};

/// Width of the fixed-size identifier columns in the store.
pub const MAX_ID_LEN: usize = 20;

/// Defines a validated string identifier.
///
/// Rules:
/// - Must be non-empty
/// - Must contain only alphanumeric, underscore, and hyphen
/// - Max length `MAX_ID_LEN` characters
macro_rules! short_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Result<Self> {
                let id = id.into();

                if id.is_empty() {
                    return Err(AllocationError::InvalidId(format!(
                        "{} ID cannot be empty",
                        $label
                    )));
                }

                if id.len() > MAX_ID_LEN {
                    return Err(AllocationError::InvalidId(format!(
                        "{} ID too long: {} chars (max {})",
                        $label,
                        id.len(),
                        MAX_ID_LEN
                    )));
                }

                if !id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                {
                    return Err(AllocationError::InvalidId(format!(
                        "{} ID {id} must contain only alphanumeric, underscore, and hyphen",
                        $label
                    )));
                }

                Ok(Self(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = AllocationError;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

short_id!(
    /// Identifier of a cold-room pallet, owned by the inventory subsystem.
    PalletId,
    "Pallet"
);
short_id!(
    /// Identifier of a loading sheet, generated by [`SheetIdGenerator`].
    SheetId,
    "Sheet"
);
short_id!(CarrierId, "Carrier");

/// Source of fresh loading-sheet identifiers.
///
/// Implementations must keep ids within `MAX_ID_LEN`. Uniqueness is
/// probabilistic: a duplicate is reported by the store as
/// [`AllocationError::IdCollision`] and the caller asks for another id.
#[cfg_attr(test, mockall::automock)]
pub trait SheetIdGenerator: Send + Sync {
    fn next_id(&self) -> Result<SheetId>;
}
