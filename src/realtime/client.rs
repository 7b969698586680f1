//! The consumer half of the broadcast contract.
//!
//! The server promises per-connection delivery in commit order plus a
//! snapshot on every (re)join; in exchange the client merges idempotently,
//! reconnects with increasing backoff, and asks for a fresh snapshot
//! whenever an incremental cannot be placed.

use std::time::Duration;

use uuid::Uuid;

use crate::domain::engagement::{Comment, CommentNode};
use crate::realtime::events::RoomEvent;

/// Lifecycle of one client connection. `Disconnected` is terminal and only
/// reached by an explicit stop or an unrecoverable join failure; transport
/// drops route through `Reconnecting` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

/// Increasing reconnect delays, capped at the last step so a long outage
/// settles into a steady retry cadence instead of a thundering herd.
pub const RECONNECT_SCHEDULE: [Duration; 4] = [
    Duration::ZERO,
    Duration::from_secs(2),
    Duration::from_secs(10),
    Duration::from_secs(30),
];

#[derive(Debug, Default)]
pub struct ReconnectBackoff {
    attempt: usize,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = RECONNECT_SCHEDULE[self.attempt.min(RECONNECT_SCHEDULE.len() - 1)];
        self.attempt += 1;
        delay
    }

    /// Call on a successful connect so the next drop retries immediately.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// Already held (a snapshot and an incremental may describe the same
    /// comment); dropped without effect.
    Duplicate,
    /// The event references a parent this cache does not hold. The caller
    /// must re-request a snapshot rather than guess at placement.
    NeedsResync,
}

/// Local mirror of one video's comment tree, fed exclusively by room events.
///
/// Inserts are positioned by `(created_at, id)`, not arrival order, so two
/// clients that received the same events interleaved differently still
/// converge on the same tree.
#[derive(Debug, Default)]
pub struct CommentCache {
    top_level: Vec<CommentNode>,
}

impl CommentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: RoomEvent) -> MergeOutcome {
        match event {
            RoomEvent::Snapshot { comments } => {
                self.top_level = comments;
                MergeOutcome::Applied
            }
            RoomEvent::CommentAdded { comment } => self.merge_comment(comment),
        }
    }

    fn merge_comment(&mut self, comment: Comment) -> MergeOutcome {
        if self.contains(comment.id) {
            return MergeOutcome::Duplicate;
        }

        match comment.parent_id {
            None => {
                // Top-level runs newest-first.
                let at = self
                    .top_level
                    .iter()
                    .position(|node| {
                        (node.comment.created_at, node.comment.id)
                            < (comment.created_at, comment.id)
                    })
                    .unwrap_or(self.top_level.len());
                self.top_level.insert(
                    at,
                    CommentNode {
                        comment,
                        replies: Vec::new(),
                    },
                );
                MergeOutcome::Applied
            }
            Some(parent_id) => {
                let Some(parent) = self
                    .top_level
                    .iter_mut()
                    .find(|node| node.comment.id == parent_id)
                else {
                    return MergeOutcome::NeedsResync;
                };
                // Replies run oldest-first.
                let at = parent
                    .replies
                    .iter()
                    .position(|reply| {
                        (reply.created_at, reply.id) > (comment.created_at, comment.id)
                    })
                    .unwrap_or(parent.replies.len());
                parent.replies.insert(at, comment);
                MergeOutcome::Applied
            }
        }
    }

    pub fn contains(&self, comment_id: Uuid) -> bool {
        self.top_level.iter().any(|node| {
            node.comment.id == comment_id
                || node.replies.iter().any(|reply| reply.id == comment_id)
        })
    }

    pub fn comments(&self) -> &[CommentNode] {
        &self.top_level
    }

    pub fn total(&self) -> usize {
        self.top_level
            .iter()
            .map(|node| 1 + node.replies.len())
            .sum()
    }
}
