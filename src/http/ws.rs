use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::app::engagement::EngagementService;
use crate::app::videos::VideoService;
use crate::http::{AppError, AuthUser};
use crate::realtime::events::RoomEvent;
use crate::AppState;

/// Join a video's comment room. Visibility is checked before the upgrade;
/// a request for a missing or private-to-someone-else video never becomes
/// a socket.
pub async fn join_comment_room(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let video = VideoService::new(state.db.clone())
        .get(id, Some(auth.user_id))
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, video_id = %id, "failed to fetch video for room join");
            AppError::internal("failed to join room")
        })?;
    if video.is_none() {
        return Err(AppError::not_found("video not found"));
    }

    Ok(ws.on_upgrade(move |socket| room_session(socket, state, id)))
}

/// One member's lifetime in a room: register, seed with a snapshot, then
/// relay queued events until either side hangs up.
///
/// Registration happens before the snapshot query, so a mutation committed
/// at any point after the join is already queued behind the snapshot: the
/// member sees a coherent tree plus every later change, in commit order,
/// with duplicates left to the client's idempotent merge.
async fn room_session(socket: WebSocket, state: AppState, video_id: Uuid) {
    let (member_id, mut events) = state.rooms.join(video_id);

    let snapshot = match EngagementService::new(state.db.clone())
        .comment_tree(video_id)
        .await
    {
        Ok(comments) => RoomEvent::Snapshot { comments },
        Err(err) => {
            tracing::error!(error = ?err, video_id = %video_id, "failed to build join snapshot");
            state.rooms.leave(video_id, member_id);
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();
    if !send_event(&mut sink, &snapshot).await {
        state.rooms.leave(video_id, member_id);
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => {
                        if !send_event(&mut sink, &event).await {
                            break;
                        }
                    }
                    // Sender side pruned us; nothing more will arrive.
                    None => break,
                }
            }
            inbound = stream.next() => {
                if !still_open(inbound) {
                    break;
                }
            }
        }
    }

    state.rooms.leave(video_id, member_id);
    tracing::debug!(video_id = %video_id, "room session closed");
}

async fn send_event(sink: &mut SplitSink<WebSocket, Message>, event: &RoomEvent) -> bool {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = ?err, "failed to serialize room event");
            return false;
        }
    };
    sink.send(Message::Text(payload)).await.is_ok()
}

/// The channel is server-push only; inbound traffic is just liveness.
/// Anything other than a close (or transport error) keeps the session.
fn still_open(inbound: Option<Result<Message, axum::Error>>) -> bool {
    matches!(
        inbound,
        Some(Ok(Message::Text(_)))
            | Some(Ok(Message::Binary(_)))
            | Some(Ok(Message::Ping(_)))
            | Some(Ok(Message::Pong(_)))
    )
}
