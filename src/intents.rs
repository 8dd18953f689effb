//! Event-category intents declared at session establishment.
//!
//! An [`Intents`] value is a bitmask computed once at client construction by
//! OR-ing named flags and/or raw bit values. The gateway uses it to decide
//! which categories of dispatch events the session receives.

use std::ops::{BitOr, BitOrAssign};

/// A named event-category flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Guilds,
    GuildMembers,
    GuildModeration,
    GuildEmojisAndStickers,
    GuildIntegrations,
    GuildWebhooks,
    GuildInvites,
    GuildVoiceStates,
    GuildPresences,
    GuildMessages,
    GuildMessageReactions,
    GuildMessageTyping,
    DirectMessages,
    DirectMessageReactions,
    DirectMessageTyping,
    MessageContent,
}

impl Intent {
    /// The single bit this flag contributes to the mask.
    #[must_use]
    pub const fn bits(self) -> u64 {
        match self {
            Self::Guilds => 1 << 0,
            Self::GuildMembers => 1 << 1,
            Self::GuildModeration => 1 << 2,
            Self::GuildEmojisAndStickers => 1 << 3,
            Self::GuildIntegrations => 1 << 4,
            Self::GuildWebhooks => 1 << 5,
            Self::GuildInvites => 1 << 6,
            Self::GuildVoiceStates => 1 << 7,
            Self::GuildPresences => 1 << 8,
            Self::GuildMessages => 1 << 9,
            Self::GuildMessageReactions => 1 << 10,
            Self::GuildMessageTyping => 1 << 11,
            Self::DirectMessages => 1 << 12,
            Self::DirectMessageReactions => 1 << 13,
            Self::DirectMessageTyping => 1 << 14,
            Self::MessageContent => 1 << 15,
        }
    }
}

/// A bitmask of requested event categories.
///
/// # Examples
///
/// ```
/// use nebula::{Intent, Intents};
///
/// let mask = Intents::from(Intent::Guilds) | Intent::GuildMessages;
/// assert_eq!(mask.bits(), (1 << 0) | (1 << 9));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intents(u64);

impl Intents {
    /// The empty mask.
    #[must_use]
    pub const fn none() -> Self { Self(0) }

    /// A mask from raw bit values.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self { Self(bits) }

    /// The raw bitmask value sent in the identify frame.
    #[must_use]
    pub const fn bits(self) -> u64 { self.0 }

    /// OR-combine every flag in `flags` into one mask.
    pub fn from_flags<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = Intent>,
    {
        flags
            .into_iter()
            .fold(Self::none(), |mask, flag| mask | flag)
    }
}

impl From<Intent> for Intents {
    fn from(flag: Intent) -> Self { Self(flag.bits()) }
}

impl BitOr for Intents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl BitOr<Intent> for Intents {
    type Output = Self;

    fn bitor(self, rhs: Intent) -> Self { Self(self.0 | rhs.bits()) }
}

impl BitOrAssign for Intents {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
}

impl BitOrAssign<Intent> for Intents {
    fn bitor_assign(&mut self, rhs: Intent) { self.0 |= rhs.bits(); }
}
