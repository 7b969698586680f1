use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub video_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A top-level comment with its replies, as shipped to room members and by
/// the plain comment-list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

impl CommentNode {
    /// Shape a flat, live-only comment list into the broadcast tree:
    /// top-level comments newest-first, replies oldest-first.
    ///
    /// `comments` must be ordered ascending by `(created_at, id)`; a parent
    /// always precedes its replies, so a single pass suffices. Replies whose
    /// parent has been soft-deleted are dropped: the tree has nowhere to hang
    /// them, even though their rows remain addressable.
    pub fn assemble(comments: Vec<Comment>) -> Vec<CommentNode> {
        let mut nodes: Vec<CommentNode> = Vec::new();
        let mut index: std::collections::HashMap<Uuid, usize> = std::collections::HashMap::new();

        for comment in comments {
            match comment.parent_id {
                None => {
                    index.insert(comment.id, nodes.len());
                    nodes.push(CommentNode {
                        comment,
                        replies: Vec::new(),
                    });
                }
                Some(parent_id) => {
                    if let Some(&at) = index.get(&parent_id) {
                        nodes[at].replies.push(comment);
                    }
                }
            }
        }

        nodes.reverse();
        nodes
    }
}
