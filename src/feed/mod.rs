//! Feed assembly. Friends' work leads; the wider pool only backfills
//! when friends supply fewer than the target.

use std::collections::HashSet;

use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;

use crate::db::models::UserProfile;
use crate::error::AppError;

/// Friend items at or above this count suppress the backfill query.
pub const FRIEND_FEED_TARGET: usize = 50;

#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub project_id: String,
    pub owner_id: String,
    pub title: String,
    pub main_url: String,
    pub created_at: String,
    pub author_name: String,
    pub author_avatar: String,
    pub from_friend: bool,
    pub liked: bool,
    pub collected: bool,
}

impl FeedEntry {
    /// Human age of the entry for the card footer.
    pub fn age_label(&self) -> String {
        age_label_at(&self.created_at, Utc::now().naive_utc())
    }
}

/// "today", "yesterday", a day count, or the date for older items.
/// Unparseable timestamps come back as written.
fn age_label_at(created_at: &str, now: NaiveDateTime) -> String {
    let Ok(then) = NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S") else {
        return created_at.to_string();
    };
    let days = (now.date() - then.date()).num_days();
    match days {
        i64::MIN..=0 => "today".to_string(),
        1 => "yesterday".to_string(),
        2..=30 => format!("{} days ago", days),
        _ => then.date().format("%Y-%m-%d").to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Feed {
    pub entries: Vec<FeedEntry>,
    pub included_others: bool,
}

struct FeedRow {
    id: String,
    owner_id: String,
    title: String,
    main_url: String,
    created_at: String,
    author_name: String,
    author_avatar: String,
}

const FEED_COLUMNS: &str = "p.id, p.owner_id, p.title, p.main_url, p.created_at, u.name, u.avatar_url
         FROM projects p JOIN users u ON u.id = p.owner_id";

fn map_feed_row(row: &rusqlite::Row<'_>) -> Result<FeedRow, rusqlite::Error> {
    Ok(FeedRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        main_url: row.get(3)?,
        created_at: row.get(4)?,
        author_name: row.get(5)?,
        author_avatar: row.get(6)?,
    })
}

/// Assemble the feed for a viewer. Anonymous viewers see the whole
/// pool, newest first.
pub fn compose_feed(conn: &Connection, viewer: Option<&UserProfile>) -> Result<Feed, AppError> {
    match viewer {
        Some(profile) => compose_for_viewer(conn, profile),
        None => compose_anonymous(conn),
    }
}

fn compose_anonymous(conn: &Connection) -> Result<Feed, AppError> {
    let sql = format!(
        "SELECT {} ORDER BY p.created_at DESC, p.id",
        FEED_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map([], map_feed_row)?
        .filter_map(|r| r.ok())
        .map(|row| entry_from(row, None, false))
        .collect();

    Ok(Feed {
        entries,
        included_others: true,
    })
}

fn compose_for_viewer(conn: &Connection, viewer: &UserProfile) -> Result<Feed, AppError> {
    let mut entries: Vec<FeedEntry> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    if !viewer.friend_list.is_empty() {
        let vars: Vec<String> = (1..=viewer.friend_list.len())
            .map(|i| format!("?{}", i))
            .collect();
        let sql = format!(
            "SELECT {} WHERE p.owner_id IN ({}) ORDER BY p.created_at DESC, p.id",
            FEED_COLUMNS,
            vars.join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(viewer.friend_list.iter().map(|s| s.as_str())),
                map_feed_row,
            )?
            .filter_map(|r| r.ok());

        for row in rows {
            if seen.insert(row.id.clone()) {
                entries.push(entry_from(row, Some(viewer), true));
            }
        }
    }

    if entries.len() >= FRIEND_FEED_TARGET {
        return Ok(Feed {
            entries,
            included_others: false,
        });
    }

    // Backfill from everyone who is neither a friend nor the viewer.
    let mut excluded: Vec<String> = viewer.friend_list.clone();
    excluded.push(viewer.uid.clone());

    let vars: Vec<String> = (1..=excluded.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT {} WHERE p.owner_id NOT IN ({}) ORDER BY p.created_at DESC, p.id LIMIT ?{}",
        FEED_COLUMNS,
        vars.join(", "),
        excluded.len() + 1
    );

    let remainder = (FRIEND_FEED_TARGET - entries.len()) as i64;
    let mut params: Vec<rusqlite::types::Value> = excluded
        .into_iter()
        .map(rusqlite::types::Value::from)
        .collect();
    params.push(rusqlite::types::Value::from(remainder));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), map_feed_row)?
        .filter_map(|r| r.ok());

    for row in rows {
        if seen.insert(row.id.clone()) {
            entries.push(entry_from(row, Some(viewer), false));
        }
    }

    Ok(Feed {
        entries,
        included_others: true,
    })
}

fn entry_from(row: FeedRow, viewer: Option<&UserProfile>, from_friend: bool) -> FeedEntry {
    let liked = viewer.map(|v| v.is_favorite(&row.id)).unwrap_or(false);
    let collected = viewer.map(|v| v.is_collected(&row.id)).unwrap_or(false);
    FeedEntry {
        project_id: row.id,
        owner_id: row.owner_id,
        title: row.title,
        main_url: row.main_url,
        created_at: row.created_at,
        author_name: row.author_name,
        author_avatar: row.author_avatar,
        from_friend,
        liked,
        collected,
    }
}
