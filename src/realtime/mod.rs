pub mod client;
pub mod events;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::realtime::events::RoomEvent;

/// Identifies one live connection inside a room, so a disconnect removes
/// exactly that member and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId(Uuid);

impl MemberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

struct RoomMember {
    id: MemberId,
    sender: UnboundedSender<RoomEvent>,
}

/// Per-video rooms of live comment viewers.
///
/// Process-local and ephemeral: rooms appear on first join, disappear when
/// the last member leaves, and a restarted process starts with none;
/// clients re-join and are re-seeded by the snapshot path. Broadcasts fan
/// out through per-member unbounded channels, so one slow or dead member
/// never holds up the rest; members whose receiver is gone are pruned on
/// the next broadcast that touches their room.
#[derive(Clone, Default)]
pub struct CommentRooms {
    inner: Arc<RwLock<HashMap<Uuid, Vec<RoomMember>>>>,
}

impl CommentRooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under the video's room. The caller must send
    /// the snapshot *after* joining: anything committed from this point on
    /// is already queued on the returned receiver, so the pair covers every
    /// mutation with no gap.
    pub fn join(&self, video_id: Uuid) -> (MemberId, UnboundedReceiver<RoomEvent>) {
        let (tx, rx) = unbounded_channel();
        let member = RoomMember {
            id: MemberId::new(),
            sender: tx,
        };
        let member_id = member.id;

        let mut rooms = write_lock(&self.inner);
        rooms.entry(video_id).or_default().push(member);
        tracing::debug!(
            video_id = %video_id,
            members = rooms.get(&video_id).map(|m| m.len()).unwrap_or(0),
            "room member joined"
        );

        (member_id, rx)
    }

    pub fn leave(&self, video_id: Uuid, member_id: MemberId) {
        let mut rooms = write_lock(&self.inner);
        if let Some(members) = rooms.get_mut(&video_id) {
            members.retain(|member| member.id != member_id);
            if members.is_empty() {
                rooms.remove(&video_id);
            }
        }
        tracing::debug!(video_id = %video_id, "room member left");
    }

    /// Fan the event out to every member of the video's room. Holding the
    /// write lock across the sends keeps delivery order identical to commit
    /// order for every member; the sends themselves only enqueue and never
    /// block. Members with a closed receiver are dropped here.
    pub fn broadcast(&self, video_id: Uuid, event: &RoomEvent) {
        let mut rooms = write_lock(&self.inner);
        if let Some(members) = rooms.get_mut(&video_id) {
            let before = members.len();
            members.retain(|member| member.sender.send(event.clone()).is_ok());
            if members.len() < before {
                tracing::debug!(
                    video_id = %video_id,
                    pruned = before - members.len(),
                    "pruned dead room members during broadcast"
                );
            }
            if members.is_empty() {
                rooms.remove(&video_id);
            }
        }
    }

    pub fn member_count(&self, video_id: Uuid) -> usize {
        read_lock(&self.inner)
            .get(&video_id)
            .map(|members| members.len())
            .unwrap_or(0)
    }
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}
