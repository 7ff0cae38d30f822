//! Closed enumerations shared by the store, the services and the wire format.
//!
//! Each kind has one canonical wire name. Parsing accepts any ASCII case and
//! rejects everything else, so unknown values are stopped where text enters
//! the system (request bodies, query strings, stored rows).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Returned when a string does not name a variant of a closed kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_enum! {
    /// What a notification is about.
    NotificationType {
        Like => "LIKE",
        Comment => "COMMENT",
        FriendRequest => "FRIEND_REQUEST",
        FriendAccepted => "FRIEND_ACCEPTED",
        PostUpdate => "POST_UPDATE",
    }
}

wire_enum! {
    /// One-way: `New` becomes `Seen`, never the reverse.
    NotificationStatus {
        New => "New",
        Seen => "Seen",
    }
}

wire_enum! {
    /// Rejected and removed friendships are deleted, so there is no terminal status.
    FriendshipStatus {
        Pending => "PENDING",
        Accepted => "ACCEPTED",
    }
}

wire_enum! {
    ReactionType {
        Like => "LIKE",
        Love => "LOVE",
        Haha => "HAHA",
        Wow => "WOW",
        Sad => "SAD",
        Angry => "ANGRY",
    }
}

wire_enum! {
    PostVisibility {
        Public => "PUBLIC",
        Friends => "FRIENDS",
        Private => "PRIVATE",
    }
}

wire_enum! {
    GroupVisibility {
        Public => "PUBLIC",
        Private => "PRIVATE",
        Protected => "PROTECTED",
    }
}

impl Default for PostVisibility {
    fn default() -> Self {
        PostVisibility::Public
    }
}

impl Default for GroupVisibility {
    fn default() -> Self {
        GroupVisibility::Public
    }
}
