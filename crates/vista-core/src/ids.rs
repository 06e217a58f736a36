//! Typed ID wrappers providing compile-time safety for entity identifiers.
//!
//! Each ID type is a newtype over the stable integer key the record source
//! hands out, preventing accidental misuse (e.g., passing a `TagId` where a
//! `RecordId` is expected).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Generate a newtype ID wrapper over `u64`.
///
/// The macro produces a struct with:
/// - `new(raw)` and `get()` for the inner value
/// - `Debug`, `Clone`, `Copy`, `Default`, `PartialEq`, `Eq`, `Hash`, `Ord`,
///   `Serialize`, `Deserialize`
/// - `Display` and `FromStr` delegating to the inner integer
/// - `From<u64>` and `Into<u64>` conversions
macro_rules! int_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(
                Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
                Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(u64);

            impl $name {
                /// Wrap a raw key.
                #[must_use]
                pub const fn new(raw: u64) -> Self {
                    Self(raw)
                }

                /// Return the raw key.
                #[must_use]
                pub const fn get(&self) -> u64 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = ParseIntError;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    s.trim().parse::<u64>().map(Self)
                }
            }

            impl From<u64> for $name {
                fn from(raw: u64) -> Self {
                    Self(raw)
                }
            }

            impl From<$name> for u64 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )+
    };
}

int_id! {
    /// Stable identifier of a media record, as assigned by the record source.
    RecordId,
    /// Identifier of a tag in the source's tag tree.
    TagId,
    /// Handle returned when registering a prepare hook.
    HookId,
}
