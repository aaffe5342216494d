//! Client message routing.
//!
//! Every [`ClientMessage`] maps to exactly one reply. Failures become an
//! `ERROR` carrying the request id and the error's status code; notices
//! to other players (joins, leaves, game events) are sent by the room and
//! matchmaking layers themselves.

use gamehall_matchmaking::MatchRequest;
use gamehall_protocol::{ClientMessage, PlayerId, RequestId, ServerMessage};
use gamehall_room::{Economy, Persistence, RoomError, RoomSpec};
use tracing::{debug, warn};

use crate::{GameHall, GamehallError};

pub(crate) async fn dispatch<E, P>(
    hall: &GameHall<E, P>,
    player: PlayerId,
    msg: ClientMessage,
) -> ServerMessage
where
    E: Economy,
    P: Persistence,
{
    let request_id = msg.request_id().clone();
    match route(hall, player, msg).await {
        Ok(reply) => reply,
        Err(e) => error_reply(player, request_id, &e),
    }
}

async fn route<E, P>(
    hall: &GameHall<E, P>,
    player: PlayerId,
    msg: ClientMessage,
) -> Result<ServerMessage, GamehallError>
where
    E: Economy,
    P: Persistence,
{
    let rooms = hall.rooms();
    let reply = match msg {
        ClientMessage::ListRooms {
            request_id,
            game_type,
        } => ServerMessage::RoomList {
            request_id,
            rooms: rooms.list(game_type.as_ref()),
        },

        ClientMessage::CreateRoom {
            request_id,
            name,
            game_type,
            max_players,
            is_private,
            password,
            options,
        } => {
            let mut spec = RoomSpec::new(name, game_type)
                .max_players(max_players)
                .options(options);
            spec.is_private = is_private || password.is_some();
            spec.password = password.clone();

            let created = rooms.create(player, spec)?;
            if let Err(e) = rooms.join(player, created.id, password.as_deref()).await {
                // Don't leave an unjoinable room behind.
                if let Err(close_err) = rooms.close(created.id) {
                    warn!(room_id = %created.id, error = %close_err, "could not close room");
                }
                return Err(e.into());
            }
            let room = rooms.room(created.id).ok_or(RoomError::NotFound(created.id))?;
            ServerMessage::RoomJoined { request_id, room }
        }

        ClientMessage::JoinRoom {
            request_id,
            room_id,
            password,
        } => {
            let room = rooms.join(player, room_id, password.as_deref()).await?;
            ServerMessage::RoomJoined { request_id, room }
        }

        ClientMessage::LeaveRoom { request_id } => {
            rooms.leave(player)?;
            ServerMessage::Ok { request_id }
        }

        ClientMessage::StartGame { request_id } => {
            let room_id = rooms.room_of(player).ok_or(RoomError::NotInRoom(player))?;
            rooms.start(player, room_id).await?;
            ServerMessage::Ok { request_id }
        }

        ClientMessage::SendEvent {
            request_id,
            op_code,
            payload,
        } => {
            rooms.submit_event(player, op_code, payload)?;
            ServerMessage::Ok { request_id }
        }

        ClientMessage::JoinQueue {
            request_id,
            game_type,
            min_players,
            max_players,
        } => {
            let request =
                MatchRequest::new(player, game_type).with_bounds(min_players, max_players);
            hall.matchmaker().enqueue(request).await?;
            ServerMessage::Ok { request_id }
        }

        ClientMessage::LeaveQueue { request_id } => {
            hall.matchmaker().dequeue(player).await?;
            ServerMessage::Ok { request_id }
        }

        ClientMessage::Ping { request_id } => ServerMessage::Pong { request_id },
    };
    Ok(reply)
}

fn error_reply(player: PlayerId, request_id: RequestId, err: &GamehallError) -> ServerMessage {
    let code = err.code();
    if code >= 500 {
        warn!(%player, code, error = %err, "request failed");
    } else {
        debug!(%player, code, error = %err, "request rejected");
    }
    ServerMessage::error(request_id, code, err.to_string())
}
