use anyhow::Result;
use uuid::Uuid;

use crate::app::feed::video_from_row;
use crate::domain::video::{Video, Visibility};
use crate::infra::db::Db;

pub enum VideoMutation {
    Applied(Video),
    NotFound,
    NotOwner,
}

pub enum VideoDelete {
    Deleted,
    NotFound,
    NotOwner,
}

#[derive(Clone)]
pub struct VideoService {
    db: Db,
}

impl VideoService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        owner_id: Uuid,
        title: String,
        description: Option<String>,
        media_key: String,
        visibility: Visibility,
    ) -> Result<Video> {
        let row = sqlx::query(
            "INSERT INTO videos (owner_id, title, description, media_key, visibility) \
             VALUES ($1, $2, $3, $4, $5::video_visibility) \
             RETURNING id, owner_id, title, description, media_key, \
                       visibility::text AS visibility, like_count, comment_count, \
                       view_count, created_at",
        )
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(media_key)
        .bind(visibility.as_db())
        .fetch_one(self.db.pool())
        .await?;

        video_from_row(&row)
    }

    /// Fetch one live video, applying the visibility rule for the viewer.
    pub async fn get(&self, video_id: Uuid, viewer_id: Option<Uuid>) -> Result<Option<Video>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, description, media_key, \
                    visibility::text AS visibility, like_count, comment_count, \
                    view_count, created_at \
             FROM videos \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(video_id)
        .fetch_optional(self.db.pool())
        .await?;

        let video = match row {
            Some(row) => Some(video_from_row(&row)?),
            None => None,
        };

        Ok(video.filter(|video| video.visible_to(viewer_id)))
    }

    /// Owner-only metadata update. Absent fields are left unchanged.
    pub async fn update(
        &self,
        video_id: Uuid,
        actor_id: Uuid,
        title: Option<String>,
        description: Option<String>,
        visibility: Option<Visibility>,
    ) -> Result<VideoMutation> {
        let owner: Option<Uuid> = sqlx::query_scalar(
            "SELECT owner_id FROM videos WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(video_id)
        .fetch_optional(self.db.pool())
        .await?;

        match owner {
            None => return Ok(VideoMutation::NotFound),
            Some(owner_id) if owner_id != actor_id => return Ok(VideoMutation::NotOwner),
            Some(_) => {}
        }

        let row = sqlx::query(
            "UPDATE videos \
             SET title = COALESCE($3, title), \
                 description = COALESCE($4, description), \
                 visibility = COALESCE($5::video_visibility, visibility) \
             WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL \
             RETURNING id, owner_id, title, description, media_key, \
                       visibility::text AS visibility, like_count, comment_count, \
                       view_count, created_at",
        )
        .bind(video_id)
        .bind(actor_id)
        .bind(title)
        .bind(description)
        .bind(visibility.map(|v| v.as_db()))
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => Ok(VideoMutation::Applied(video_from_row(&row)?)),
            // Raced with a concurrent soft-delete between check and update.
            None => Ok(VideoMutation::NotFound),
        }
    }

    /// Owner-only soft delete; the row stays behind for its likes, comments
    /// and counters, but leaves every read path.
    pub async fn soft_delete(&self, video_id: Uuid, actor_id: Uuid) -> Result<VideoDelete> {
        let owner: Option<Uuid> = sqlx::query_scalar(
            "SELECT owner_id FROM videos WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(video_id)
        .fetch_optional(self.db.pool())
        .await?;

        match owner {
            None => return Ok(VideoDelete::NotFound),
            Some(owner_id) if owner_id != actor_id => return Ok(VideoDelete::NotOwner),
            Some(_) => {}
        }

        let result = sqlx::query(
            "UPDATE videos SET deleted_at = now() \
             WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL",
        )
        .bind(video_id)
        .bind(actor_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            Ok(VideoDelete::Deleted)
        } else {
            Ok(VideoDelete::NotFound)
        }
    }

    /// Best-effort view counter bump; callers fire-and-forget this so a
    /// failed increment never fails the read that triggered it.
    pub async fn record_view(&self, video_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE videos SET view_count = view_count + 1 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(video_id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}
