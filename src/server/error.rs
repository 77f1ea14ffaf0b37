//! Error taxonomy of the server layer.
//!
//! Every error that reaches a client carries one of four stable codes. None of
//! them is fatal to a room or to the connection that caused it.

use actix::MailboxError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::game::systems::MoveError;
use crate::game::types::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ProtocolError,
    ValidationError,
    StateError,
    CapacityError,
}

/// A client message that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("unknown message type '{0}'")]
    UnknownType(String),
    #[error("invalid payload for '{kind}': {reason}")]
    BadPayload { kind: String, reason: String },
    #[error("invalid gameId '{0}'")]
    BadGameId(String),
    #[error("'{0}' requires a gameId")]
    MissingGameId(String),
    #[error("no playerId given and none supplied when connecting")]
    MissingIdentity,
    #[error("connection has not joined a game yet")]
    NotBound,
    #[error("connection belongs to player {bound}, not {claimed}")]
    IdentityMismatch { bound: PlayerId, claimed: PlayerId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error("unknown game mode '{0}'")]
    UnknownMode(String),
    #[error("unknown map '{0}'")]
    UnknownMap(String),
    #[error("room {0} not found")]
    NotFound(Uuid),
    #[error("connection is not in room {0}")]
    NotInRoom(Uuid),
    #[error("room has ended")]
    Ended,
    #[error("game has not started")]
    NotActive,
    #[error("game has already started")]
    AlreadyStarted,
    #[error("game is already running")]
    NotWaiting,
    #[error("room is full")]
    Full,
    #[error("player {0} is not in this room")]
    UnknownPlayer(PlayerId),
    #[error("could not set up the game: {0}")]
    Setup(String),
    #[error("room is no longer available")]
    Unavailable,
}

impl RoomError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RoomError::Protocol(_) => ErrorCode::ProtocolError,
            RoomError::Move(MoveError::NotParticipant(_) | MoveError::Eliminated(_) | MoveError::NoMovesLeft(_)) => {
                ErrorCode::StateError
            }
            RoomError::Move(_) | RoomError::UnknownMode(_) | RoomError::UnknownMap(_) => ErrorCode::ValidationError,
            RoomError::Full | RoomError::AlreadyStarted => ErrorCode::CapacityError,
            RoomError::NotFound(_)
            | RoomError::NotInRoom(_)
            | RoomError::Ended
            | RoomError::NotActive
            | RoomError::NotWaiting
            | RoomError::UnknownPlayer(_)
            | RoomError::Setup(_)
            | RoomError::Unavailable => ErrorCode::StateError,
        }
    }
}

impl From<MailboxError> for RoomError {
    fn from(_: MailboxError) -> Self {
        RoomError::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Direction;

    #[test]
    fn codes_follow_the_taxonomy() {
        assert_eq!(RoomError::from(ProtocolError::UnknownType("fly".into())).code(), ErrorCode::ProtocolError);
        assert_eq!(RoomError::from(MoveError::NoTroops).code(), ErrorCode::ValidationError);
        assert_eq!(RoomError::from(MoveError::NoMovesLeft(1)).code(), ErrorCode::StateError);
        assert_eq!(
            RoomError::from(MoveError::DestinationOutOfBounds { direction: Direction::Up }).code(),
            ErrorCode::ValidationError
        );
        assert_eq!(RoomError::from(MoveError::Eliminated(3)).code(), ErrorCode::StateError);
        assert_eq!(RoomError::Ended.code(), ErrorCode::StateError);
        assert_eq!(RoomError::Full.code(), ErrorCode::CapacityError);
        assert_eq!(RoomError::AlreadyStarted.code(), ErrorCode::CapacityError);
    }

    #[test]
    fn code_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&ErrorCode::CapacityError).unwrap(), "\"CAPACITY_ERROR\"");
        assert_eq!(serde_json::to_string(&ErrorCode::StateError).unwrap(), "\"STATE_ERROR\"");
    }

    #[test]
    fn messages_are_human_readable() {
        let err = RoomError::from(ProtocolError::IdentityMismatch { bound: 1, claimed: 2 });
        assert_eq!(err.to_string(), "connection belongs to player 1, not 2");
    }
}
