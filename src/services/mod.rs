//! Collaborators the core talks to: identity, ratings and notification

pub mod identity;
pub mod notify;
pub mod rating;

pub use identity::{IdentityResolver, ResolvedIdentity, TokenAuthority, TokenClaims};
pub use notify::{ChannelNotifier, Event, Notifier, Recipient};
pub use rating::{
    drawn_ratings, expected_score, updated_ratings, MemoryRatingStore, PlayerRating,
    RatingSettings, RatingStore, RecordedGame,
};
