use serde::{Deserialize, Serialize};

use crate::domain::engagement::{Comment, CommentNode};

/// Everything a room ever pushes, as a closed union: consumers handle
/// exactly these two shapes and nothing else.
///
/// `Snapshot` is the source of truth, sent on join and after structurally
/// ambiguous mutations (deletes). `CommentAdded` is a latency optimization
/// for plain creations; the embedded comment carries its `parent_id`, which
/// is all a client needs to splice it into a held tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    Snapshot { comments: Vec<CommentNode> },
    CommentAdded { comment: Comment },
}
