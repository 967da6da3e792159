use super::error::{GameError, GameResult};
use super::player::{ConnectionId, Participant, ParticipantId, Player, PlayerSummary};
use crate::chess::{BoardSnapshot, Cell, Engine, MoveRecord, PieceId, Side, TurnState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(Uuid);

impl GameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GameId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| GameError::Validation(format!("Invalid game id '{}'", s)))
    }
}

/// Side a participant asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidePreference {
    White,
    Black,
    #[default]
    Random,
}

impl SidePreference {
    pub fn side(&self) -> Option<Side> {
        match self {
            SidePreference::White => Some(Side::White),
            SidePreference::Black => Some(Side::Black),
            SidePreference::Random => None,
        }
    }

    /// The preferred side, or a fair coin flip
    pub fn resolve(&self) -> Side {
        self.side().unwrap_or_else(random_side)
    }
}

impl From<Side> for SidePreference {
    fn from(side: Side) -> Self {
        match side {
            Side::White => SidePreference::White,
            Side::Black => SidePreference::Black,
        }
    }
}

pub fn random_side() -> Side {
    if rand::random::<bool>() {
        Side::White
    } else {
        Side::Black
    }
}

/// Options chosen by the creator of a game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Side requested by the creator
    pub side: SidePreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    AwaitingOpponent,
    Active,
    Checkmated,
    Resigned,
    Drawn,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::AwaitingOpponent | SessionStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    Mate,
    Surrender,
    PlayerLeave,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Decisive {
        winner: ParticipantId,
        loser: ParticipantId,
        winning_side: Side,
    },
    Draw,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawOffers {
    pub white: bool,
    pub black: bool,
}

impl DrawOffers {
    pub fn offered_by(&self, side: Side) -> bool {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    fn set(&mut self, side: Side, offered: bool) {
        match side {
            Side::White => self.white = offered,
            Side::Black => self.black = offered,
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Public listing of a game waiting for an opponent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyEntry {
    pub id: GameId,
    pub players: Vec<PlayerSummary>,
    pub config: GameConfig,
}

/// Full state of a game as sent to its participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: GameId,
    pub status: SessionStatus,
    pub started: bool,
    pub players: Vec<PlayerSummary>,
    pub board: BoardSnapshot,
    pub turn: TurnState,
    pub moves: Vec<MoveRecord>,
    pub draw_offers: DrawOffers,
}

/// Record of a finished game, handed to persistence and kept for rematches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: GameId,
    pub config: GameConfig,
    pub players: Vec<PlayerSummary>,
    pub moves: Vec<MoveRecord>,
    pub outcome: Outcome,
    pub reason: EndReason,
    pub created_at: i64,
    pub finished_at: i64,
}

impl GameSummary {
    pub fn side_of(&self, id: &ParticipantId) -> Option<Side> {
        self.players.iter().find(|p| &p.id == id).map(|p| p.side)
    }

    /// Both players are registered users
    pub fn is_rated(&self) -> bool {
        self.players.len() == 2 && self.players.iter().all(|p| p.authorized)
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// One match between two participants.
///
/// Every operation validates before mutating, so an error leaves the
/// session exactly as it was.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: GameId,
    config: GameConfig,
    players: Vec<Player>,
    engine: Engine,
    moves: Vec<MoveRecord>,
    draw_offers: DrawOffers,
    status: SessionStatus,
    started: bool,
    outcome: Option<(Outcome, EndReason)>,
    created_at: i64,
}

pub type SharedSession = Arc<Mutex<GameSession>>;

/// Lock a shared session. A poisoned lock is recovered: sessions only mutate
/// after validation succeeds, so a panicking holder cannot leave them torn.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, GameSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GameSession {
    /// Open a game for `first`, who takes the configured side or a random one
    pub fn create(first: Participant, config: GameConfig) -> Self {
        Self::create_with_side(first, config.side.resolve(), config)
    }

    /// Open a game with the creator's side already decided
    pub fn create_with_side(first: Participant, side: Side, config: GameConfig) -> Self {
        let id = GameId::new();
        info!(game = %id, creator = %first.id, %side, "game created");
        Self {
            id,
            config,
            players: vec![Player {
                side,
                participant: first,
            }],
            engine: Engine::new(),
            moves: Vec::new(),
            draw_offers: DrawOffers::default(),
            status: SessionStatus::AwaitingOpponent,
            started: false,
            outcome: None,
            created_at: now(),
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.players.iter().map(|p| p.id().clone()).collect()
    }

    pub fn player(&self, id: &ParticipantId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    pub fn side_of(&self, id: &ParticipantId) -> Option<Side> {
        self.player(id).map(|p| p.side)
    }

    pub fn opponent_of(&self, id: &ParticipantId) -> Option<&Player> {
        if self.player(id).is_none() {
            return None;
        }
        self.players.iter().find(|p| p.id() != id)
    }

    pub fn turn(&self) -> TurnState {
        self.engine.turn()
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn draw_offers(&self) -> DrawOffers {
        self.draw_offers
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref().map(|(outcome, _)| outcome)
    }

    fn require_participant(&self, id: &ParticipantId) -> GameResult<&Player> {
        self.player(id)
            .ok_or_else(|| GameError::not_found(format!("{} is not playing game {}", id, self.id)))
    }

    fn require_active(&self) -> GameResult<()> {
        if self.status != SessionStatus::Active {
            return Err(GameError::conflict(format!(
                "game {} is not active",
                self.id
            )));
        }
        Ok(())
    }

    /// Seat the second participant on the remaining side
    pub fn add_second_player(&mut self, participant: Participant) -> GameResult<Side> {
        if self.status != SessionStatus::AwaitingOpponent {
            return Err(GameError::conflict(format!(
                "game {} is not awaiting an opponent",
                self.id
            )));
        }
        if self.player(&participant.id).is_some() {
            return Err(GameError::conflict("cannot join your own game"));
        }

        let side = self.players[0].side.opposite();
        info!(game = %self.id, player = %participant.id, %side, "second player joined");
        self.players.push(Player { side, participant });
        self.status = SessionStatus::Active;
        Ok(side)
    }

    /// Open the game for moves
    pub fn start(&mut self) -> GameResult<()> {
        self.require_active()?;
        if self.started {
            return Err(GameError::conflict(format!(
                "game {} already started",
                self.id
            )));
        }
        self.started = true;
        info!(game = %self.id, "game started");
        Ok(())
    }

    pub fn apply_move(
        &mut self,
        actor: &ParticipantId,
        piece: PieceId,
        to: Cell,
    ) -> GameResult<MoveRecord> {
        let side = self.require_participant(actor)?.side;
        self.require_active()?;
        if !self.started {
            return Err(GameError::conflict(format!(
                "game {} has not started",
                self.id
            )));
        }
        if side != self.engine.to_move() {
            return Err(GameError::conflict("not your turn"));
        }

        let record = self.engine.apply(side, piece, to).map_err(|err| {
            debug!(game = %self.id, %side, %piece, %to, error = %err, "move rejected");
            GameError::from(err)
        })?;
        self.moves.push(record);

        if let Some(mate) = record.effect.mate {
            info!(game = %self.id, loser = %mate.side, "checkmate");
            self.finish_decisive(side, SessionStatus::Checkmated, EndReason::Mate);
        }
        Ok(record)
    }

    /// `actor` surrenders; the opponent wins
    pub fn resign(&mut self, actor: &ParticipantId) -> GameResult<&Outcome> {
        let side = self.require_participant(actor)?.side;
        self.require_active()?;
        info!(game = %self.id, player = %actor, "resigned");
        Ok(self.finish_decisive(side.opposite(), SessionStatus::Resigned, EndReason::Surrender))
    }

    /// `actor` abandons the game; the opponent wins
    pub fn leave(&mut self, actor: &ParticipantId) -> GameResult<&Outcome> {
        let side = self.require_participant(actor)?.side;
        self.require_active()?;
        info!(game = %self.id, player = %actor, "left the game");
        Ok(self.finish_decisive(side.opposite(), SessionStatus::Abandoned, EndReason::PlayerLeave))
    }

    pub fn propose_draw(&mut self, side: Side) -> GameResult<()> {
        self.require_active()?;
        if self.draw_offers.offered_by(side) {
            return Err(GameError::conflict(format!(
                "{} already offered a draw",
                side
            )));
        }
        self.draw_offers.set(side, true);
        debug!(game = %self.id, %side, "draw offered");
        Ok(())
    }

    /// `side` accepts the draw its opponent offered
    pub fn accept_draw(&mut self, side: Side) -> GameResult<&Outcome> {
        self.require_active()?;
        if !self.draw_offers.offered_by(side.opposite()) {
            return Err(GameError::conflict("no draw offer to accept"));
        }
        info!(game = %self.id, "drawn by agreement");
        self.status = SessionStatus::Drawn;
        self.draw_offers.clear();
        Ok(&self.outcome.insert((Outcome::Draw, EndReason::Draw)).0)
    }

    pub fn reject_draw(&mut self) {
        self.draw_offers.clear();
    }

    /// Point a player at a new connection after a reconnect
    pub fn rebind_connection(
        &mut self,
        id: &ParticipantId,
        connection: ConnectionId,
    ) -> GameResult<()> {
        self.require_participant(id)?;
        if let Some(player) = self.players.iter_mut().find(|p| p.id() == id) {
            player.participant.connection = connection;
        }
        Ok(())
    }

    fn finish_decisive(
        &mut self,
        winning_side: Side,
        status: SessionStatus,
        reason: EndReason,
    ) -> &Outcome {
        let id_on = |side: Side| {
            self.players
                .iter()
                .find(|p| p.side == side)
                .map(|p| p.id().clone())
                .unwrap_or_else(|| ParticipantId::new(""))
        };
        let outcome = Outcome::Decisive {
            winner: id_on(winning_side),
            loser: id_on(winning_side.opposite()),
            winning_side,
        };
        self.status = status;
        self.draw_offers.clear();
        &self.outcome.insert((outcome, reason)).0
    }

    pub fn lobby_entry(&self) -> LobbyEntry {
        LobbyEntry {
            id: self.id,
            players: self.players.iter().map(PlayerSummary::from).collect(),
            config: self.config,
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id,
            status: self.status,
            started: self.started,
            players: self.players.iter().map(PlayerSummary::from).collect(),
            board: self.engine.snapshot(),
            turn: self.engine.turn(),
            moves: self.moves.clone(),
            draw_offers: self.draw_offers,
        }
    }

    /// Summary of a finished game; `None` while it is still in progress
    pub fn summary(&self) -> Option<GameSummary> {
        let (outcome, reason) = self.outcome.clone()?;
        Some(GameSummary {
            id: self.id,
            config: self.config,
            players: self.players.iter().map(PlayerSummary::from).collect(),
            moves: self.moves.clone(),
            outcome,
            reason,
            created_at: self.created_at,
            finished_at: now(),
        })
    }

    pub fn to_ascii(&self) -> String {
        self.engine.board().to_ascii()
    }
}
