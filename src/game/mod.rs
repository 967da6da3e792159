pub mod error;
pub mod player;
pub mod registry;
pub mod session;

pub use error::{GameError, GameResult};
pub use player::{ConnectionId, Participant, ParticipantId, Player, PlayerSummary};
pub use registry::GameRegistry;
pub use session::{
    lock_session, random_side, DrawOffers, EndReason, GameConfig, GameId, GameSession,
    GameSnapshot, GameSummary, LobbyEntry, Outcome, SessionStatus, SharedSession, SidePreference,
};
