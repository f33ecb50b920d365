use rusqlite::{params, Connection};

use crate::db::models::{Page, Project};
use crate::error::AppError;

pub fn insert_project(
    conn: &Connection,
    id: &str,
    owner_id: &str,
    title: &str,
    main_url: &str,
    pages: &[Page],
) -> Result<(), AppError> {
    let pages_json = serde_json::to_string(pages)?;
    conn.execute(
        "INSERT INTO projects (id, owner_id, title, main_url, pages_json) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, owner_id, title, main_url, pages_json],
    )?;
    Ok(())
}

pub fn find_project(conn: &Connection, id: &str) -> Result<Option<Project>, AppError> {
    let project: Result<Project, rusqlite::Error> = conn.query_row(
        "SELECT id, owner_id, title, main_url, pages_json, created_at
         FROM projects WHERE id = ?1",
        params![id],
        map_project_row,
    );

    match project {
        Ok(p) => Ok(Some(p)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn project_exists(conn: &Connection, id: &str) -> Result<bool, AppError> {
    let exists = conn.query_row(
        "SELECT COUNT(*) > 0 FROM projects WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// A user's own projects, newest first.
pub fn projects_by_owner(conn: &Connection, owner_id: &str) -> Result<Vec<Project>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, title, main_url, pages_json, created_at
         FROM projects WHERE owner_id = ?1
         ORDER BY created_at DESC, id",
    )?;

    let projects = stmt
        .query_map(params![owner_id], map_project_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(projects)
}

fn map_project_row(row: &rusqlite::Row<'_>) -> Result<Project, rusqlite::Error> {
    Ok(Project {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        main_url: row.get(3)?,
        pages_json: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Projects for an id list, returned in list order. Unknown ids are
/// skipped.
pub fn projects_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<Project>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let vars: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT id, owner_id, title, main_url, pages_json, created_at
         FROM projects WHERE id IN ({})",
        vars.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut by_id: std::collections::HashMap<String, Project> = stmt
        .query_map(
            rusqlite::params_from_iter(ids.iter().map(|s| s.as_str())),
            map_project_row,
        )?
        .filter_map(|r| r.ok())
        .map(|p| (p.id.clone(), p))
        .collect();

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// Decode the stored page sequence. Order is preserved as written.
pub fn parse_pages(pages_json: &str) -> Result<Vec<Page>, AppError> {
    Ok(serde_json::from_str(pages_json)?)
}

pub fn project_count(conn: &Connection) -> Result<i64, AppError> {
    let count = conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
    Ok(count)
}
