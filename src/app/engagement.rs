use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::engagement::{Comment, CommentNode};
use crate::infra::db::Db;

pub enum LikeToggle {
    Liked,
    Unliked,
    VideoNotFound,
}

pub enum CommentCreate {
    Created(Comment),
    VideoNotFound,
    ParentNotFound,
}

pub enum CommentDelete {
    Deleted,
    NotFound,
    NotAuthor,
}

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Flip the actor's like on a video. The like row and the denormalized
    /// `like_count` move in one transaction; the decrement saturates at zero
    /// so replayed removals cannot drive the counter negative.
    pub async fn toggle_like(&self, user_id: Uuid, video_id: Uuid) -> Result<LikeToggle> {
        let mut tx = self.db.begin().await?;

        let live: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM videos WHERE id = $1 AND deleted_at IS NULL")
                .bind(video_id)
                .fetch_optional(&mut *tx)
                .await?;
        if live.is_none() {
            return Ok(LikeToggle::VideoNotFound);
        }

        let inserted: Option<Uuid> = sqlx::query_scalar(
            "INSERT INTO likes (video_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING \
             RETURNING id",
        )
        .bind(video_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let toggle = match inserted {
            Some(_) => {
                sqlx::query("UPDATE videos SET like_count = like_count + 1 WHERE id = $1")
                    .bind(video_id)
                    .execute(&mut *tx)
                    .await?;
                LikeToggle::Liked
            }
            None => {
                sqlx::query("DELETE FROM likes WHERE video_id = $1 AND user_id = $2")
                    .bind(video_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    "UPDATE videos SET like_count = GREATEST(like_count - 1, 0) WHERE id = $1",
                )
                .bind(video_id)
                .execute(&mut *tx)
                .await?;
                LikeToggle::Unliked
            }
        };

        tx.commit().await?;
        Ok(toggle)
    }

    /// Insert a comment and bump `comment_count` together. A reply's parent
    /// must be a live top-level comment on the same video, checked inside the
    /// transaction so the invariant holds at creation time.
    pub async fn create_comment(
        &self,
        author_id: Uuid,
        video_id: Uuid,
        body: String,
        parent_id: Option<Uuid>,
    ) -> Result<CommentCreate> {
        let mut tx = self.db.begin().await?;

        let visible: Option<bool> = sqlx::query_scalar(
            "SELECT visibility = 'public' OR owner_id = $2 \
             FROM videos WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(video_id)
        .bind(author_id)
        .fetch_optional(&mut *tx)
        .await?;
        match visible {
            Some(true) => {}
            _ => return Ok(CommentCreate::VideoNotFound),
        }

        if let Some(parent_id) = parent_id {
            let parent = sqlx::query(
                "SELECT video_id, parent_id FROM comments \
                 WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(parent_id)
            .fetch_optional(&mut *tx)
            .await?;

            // Same video, and itself top-level: replies nest one deep.
            let valid = parent.is_some_and(|row| {
                row.get::<Uuid, _>("video_id") == video_id
                    && row.get::<Option<Uuid>, _>("parent_id").is_none()
            });
            if !valid {
                return Ok(CommentCreate::ParentNotFound);
            }
        }

        let row = sqlx::query(
            "INSERT INTO comments (video_id, author_id, parent_id, body) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, video_id, author_id, parent_id, body, created_at",
        )
        .bind(video_id)
        .bind(author_id)
        .bind(parent_id)
        .bind(body)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE videos SET comment_count = comment_count + 1 WHERE id = $1")
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CommentCreate::Created(comment_from_row(&row)))
    }

    /// Author-only soft delete; `comment_count` drops with it, saturating at
    /// zero. Replies are left in place; they just stop being reachable
    /// through the tree while their parent is gone.
    pub async fn delete_comment(
        &self,
        comment_id: Uuid,
        video_id: Uuid,
        actor_id: Uuid,
    ) -> Result<CommentDelete> {
        let mut tx = self.db.begin().await?;

        let author: Option<Uuid> = sqlx::query_scalar(
            "SELECT author_id FROM comments \
             WHERE id = $1 AND video_id = $2 AND deleted_at IS NULL",
        )
        .bind(comment_id)
        .bind(video_id)
        .fetch_optional(&mut *tx)
        .await?;

        match author {
            None => return Ok(CommentDelete::NotFound),
            Some(author_id) if author_id != actor_id => return Ok(CommentDelete::NotAuthor),
            Some(_) => {}
        }

        let result = sqlx::query(
            "UPDATE comments SET deleted_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(CommentDelete::NotFound);
        }

        sqlx::query(
            "UPDATE videos SET comment_count = GREATEST(comment_count - 1, 0) WHERE id = $1",
        )
        .bind(video_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CommentDelete::Deleted)
    }

    /// The full live comment tree for a video: the payload of both the
    /// room snapshot and the plain list endpoint.
    pub async fn comment_tree(&self, video_id: Uuid) -> Result<Vec<CommentNode>> {
        let rows = sqlx::query(
            "SELECT id, video_id, author_id, parent_id, body, created_at \
             FROM comments \
             WHERE video_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(video_id)
        .fetch_all(self.db.pool())
        .await?;

        let comments = rows.iter().map(comment_from_row).collect();
        Ok(CommentNode::assemble(comments))
    }
}

fn comment_from_row(row: &sqlx::postgres::PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        video_id: row.get("video_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        body: row.get("body"),
        created_at: row.get("created_at"),
    }
}
