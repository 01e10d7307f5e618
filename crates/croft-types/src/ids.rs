//! Type-safe identifier wrappers around plain integers.
//!
//! Every remotely-owned entity the engine acts on has a strongly-typed ID
//! to prevent accidental mixing of identifiers at compile time. The server
//! assigns all IDs; there is no app-side generation.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around an integer with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Return the inner integer value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a single plot of land.
    PlotId,
    u32
);

define_id!(
    /// Identifier of a seed catalog entry.
    SeedId,
    u32
);

define_id!(
    /// Identifier of a consumable item, e.g. the soil amendment applied
    /// after planting.
    ItemId,
    u32
);

define_id!(
    /// Identifier of another account that left a weed or pest marker.
    OwnerId,
    u64
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plot_id_serializes_transparently() {
        let id = PlotId(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: PlotId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_shows_raw_value() {
        assert_eq!(PlotId(42).to_string(), "42");
        assert_eq!(SeedId(3).to_string(), "3");
    }

    #[test]
    fn ids_default_to_zero() {
        // Entity structs derive Default and embed these ids.
        assert_eq!(PlotId::default(), PlotId(0));
        assert_eq!(SeedId::default(), SeedId(0));
        assert_eq!(ItemId::default(), ItemId(0));
        assert_eq!(OwnerId::default().into_inner(), 0);
    }
}
