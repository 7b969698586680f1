use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sqlx::Row;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::video::{Video, Visibility};
use crate::infra::db::Db;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Out-of-range page sizes are clamped, never rejected.
pub fn clamp_page_size(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Opaque keyset position: base64 over `<rfc3339>/<uuid>` of the last row
/// emitted. Only this module encodes or decodes it.
pub fn encode_cursor(position: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = position?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(URL_SAFE_NO_PAD.encode(format!("{}/{}", timestamp, id)))
}

/// A cursor that fails to decode degrades to "no cursor" (restart from the
/// newest item) instead of erroring. See DESIGN.md for the trade-off.
pub fn decode_cursor(cursor: Option<&str>) -> Option<(OffsetDateTime, Uuid)> {
    let cursor = cursor?;
    let decoded = match URL_SAFE_NO_PAD.decode(cursor) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::debug!(cursor, "undecodable cursor, restarting from first page");
            return None;
        }
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        tracing::debug!(cursor, "non-utf8 cursor, restarting from first page");
        return None;
    };

    let (timestamp, id) = decoded.split_once('/')?;
    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339).ok()?;
    let id = Uuid::parse_str(id).ok()?;
    Some((timestamp, id))
}

pub struct FeedPage {
    pub items: Vec<Video>,
    pub next_cursor: Option<(OffsetDateTime, Uuid)>,
    pub has_more: bool,
}

#[derive(Clone)]
pub struct FeedService {
    db: Db,
}

impl FeedService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// One page of the global feed in `(created_at DESC, id DESC)` order.
    ///
    /// The id tie-break totally orders rows that share a timestamp, which is
    /// what makes the keyset condition immune to skips and duplicates under
    /// concurrent inserts. Fetches `limit + 1` rows to learn `has_more`, then
    /// drops non-public videos the viewer does not own. The filter runs after
    /// the fetch, so a page may carry fewer than `limit` items.
    pub async fn list_feed(
        &self,
        viewer_id: Option<Uuid>,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<FeedPage> {
        let rows = match cursor {
            Some((created_at, video_id)) => {
                sqlx::query(
                    "SELECT id, owner_id, title, description, media_key, \
                            visibility::text AS visibility, like_count, comment_count, \
                            view_count, created_at \
                     FROM videos \
                     WHERE deleted_at IS NULL \
                       AND (created_at < $1 OR (created_at = $1 AND id < $2)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $3",
                )
                .bind(created_at)
                .bind(video_id)
                .bind(limit + 1)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, owner_id, title, description, media_key, \
                            visibility::text AS visibility, like_count, comment_count, \
                            view_count, created_at \
                     FROM videos \
                     WHERE deleted_at IS NULL \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $1",
                )
                .bind(limit + 1)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut fetched = Vec::with_capacity(rows.len());
        for row in rows {
            fetched.push(video_from_row(&row)?);
        }

        let has_more = fetched.len() > limit as usize;
        if has_more {
            fetched.truncate(limit as usize);
        }
        let last_fetched = fetched.last().map(|video| (video.created_at, video.id));

        let items: Vec<Video> = fetched
            .into_iter()
            .filter(|video| video.visible_to(viewer_id))
            .collect();

        // Resume from the last row emitted; if filtering emptied the page,
        // fall back to the last fetched row so the next request still
        // advances past everything already considered.
        let next_cursor = if has_more {
            items
                .last()
                .map(|video| (video.created_at, video.id))
                .or(last_fetched)
        } else {
            None
        };

        Ok(FeedPage {
            items,
            next_cursor,
            has_more,
        })
    }
}

pub(crate) fn video_from_row(row: &sqlx::postgres::PgRow) -> Result<Video> {
    let visibility: String = row.get("visibility");
    let visibility = Visibility::from_db(&visibility)
        .ok_or_else(|| anyhow::anyhow!("unknown video visibility: {}", visibility))?;

    Ok(Video {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        description: row.get("description"),
        media_key: row.get("media_key"),
        visibility,
        like_count: row.get("like_count"),
        comment_count: row.get("comment_count"),
        view_count: row.get("view_count"),
        created_at: row.get("created_at"),
    })
}
