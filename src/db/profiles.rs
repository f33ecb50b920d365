use rusqlite::{params, Connection};

use crate::db::models::{User, UserProfile};
use crate::error::AppError;

/// Insert a new user row. The three membership lists start empty by
/// construction (no junction rows exist yet).
pub fn insert_user(
    conn: &Connection,
    id: &str,
    email: &str,
    password_hash: Option<&str>,
    name: &str,
    avatar_url: &str,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO users (id, email, password_hash, name, avatar_url) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, email, password_hash, name, avatar_url],
    )?;
    Ok(())
}

pub fn find_user(conn: &Connection, id: &str) -> Result<Option<User>, AppError> {
    let user: Result<User, rusqlite::Error> = conn.query_row(
        "SELECT id, email, password_hash, name, avatar_url, introduction, created_at
         FROM users WHERE id = ?1",
        params![id],
        map_user_row,
    );

    match user {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, AppError> {
    let user: Result<User, rusqlite::Error> = conn.query_row(
        "SELECT id, email, password_hash, name, avatar_url, introduction, created_at
         FROM users WHERE email = ?1",
        params![email],
        map_user_row,
    );

    match user {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn map_user_row(row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        avatar_url: row.get(4)?,
        introduction: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Assemble the full profile document: the users row joined with the
/// friend, favorite, and collection lists in insertion order.
pub fn load_profile(conn: &Connection, uid: &str) -> Result<Option<UserProfile>, AppError> {
    let user = match find_user(conn, uid)? {
        Some(u) => u,
        None => return Ok(None),
    };

    let friend_list = list_ids(
        conn,
        "SELECT friend_id FROM friends WHERE user_id = ?1 ORDER BY created_at, friend_id",
        uid,
    )?;
    let favorite_list = list_ids(
        conn,
        "SELECT project_id FROM favorites WHERE user_id = ?1 ORDER BY created_at, project_id",
        uid,
    )?;
    let collection = list_ids(
        conn,
        "SELECT project_id FROM collections WHERE user_id = ?1 ORDER BY created_at, project_id",
        uid,
    )?;

    Ok(Some(UserProfile {
        uid: user.id,
        name: user.name,
        email: user.email,
        avatar_url: user.avatar_url,
        introduction: user.introduction,
        friend_list,
        favorite_list,
        collection,
    }))
}

fn list_ids(conn: &Connection, sql: &str, uid: &str) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params![uid], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(ids)
}

pub fn update_profile(
    conn: &Connection,
    uid: &str,
    name: &str,
    introduction: &str,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE users SET name = ?2, introduction = ?3 WHERE id = ?1",
        params![uid, name, introduction],
    )?;
    Ok(())
}

/// Set-union add. Returns whether the row was newly inserted.
pub fn add_favorite(conn: &Connection, uid: &str, project_id: &str) -> Result<bool, AppError> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO favorites (user_id, project_id) VALUES (?1, ?2)",
        params![uid, project_id],
    )?;
    Ok(changed > 0)
}

/// Set removal. Returns whether a row was actually removed.
pub fn remove_favorite(conn: &Connection, uid: &str, project_id: &str) -> Result<bool, AppError> {
    let changed = conn.execute(
        "DELETE FROM favorites WHERE user_id = ?1 AND project_id = ?2",
        params![uid, project_id],
    )?;
    Ok(changed > 0)
}

pub fn add_collection(conn: &Connection, uid: &str, project_id: &str) -> Result<bool, AppError> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO collections (user_id, project_id) VALUES (?1, ?2)",
        params![uid, project_id],
    )?;
    Ok(changed > 0)
}

pub fn remove_collection(
    conn: &Connection,
    uid: &str,
    project_id: &str,
) -> Result<bool, AppError> {
    let changed = conn.execute(
        "DELETE FROM collections WHERE user_id = ?1 AND project_id = ?2",
        params![uid, project_id],
    )?;
    Ok(changed > 0)
}

pub fn add_friend(conn: &Connection, uid: &str, friend_id: &str) -> Result<bool, AppError> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)",
        params![uid, friend_id],
    )?;
    Ok(changed > 0)
}

pub fn remove_friend(conn: &Connection, uid: &str, friend_id: &str) -> Result<bool, AppError> {
    let changed = conn.execute(
        "DELETE FROM friends WHERE user_id = ?1 AND friend_id = ?2",
        params![uid, friend_id],
    )?;
    Ok(changed > 0)
}

/// Users for an id list, returned in list order. Unknown ids are
/// skipped.
pub fn users_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<User>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let vars: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT id, email, password_hash, name, avatar_url, introduction, created_at
         FROM users WHERE id IN ({})",
        vars.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut by_id: std::collections::HashMap<String, User> = stmt
        .query_map(
            rusqlite::params_from_iter(ids.iter().map(|s| s.as_str())),
            map_user_row,
        )?
        .filter_map(|r| r.ok())
        .map(|u| (u.id.clone(), u))
        .collect();

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

pub fn user_count(conn: &Connection) -> Result<i64, AppError> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}
