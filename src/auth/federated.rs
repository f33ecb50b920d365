//! Sign-in through external OAuth2 providers. Covers the three legs
//! of the authorization-code flow plus mapping provider identities to
//! local accounts.

use rusqlite::params;
use serde_json::Value;
use url::Url;

use crate::config::ProviderConfig;
use crate::db::models::User;
use crate::db::profiles;
use crate::error::AppError;
use crate::state::DbPool;

/// Identity asserted by a provider after a completed code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct FederatedIdentity {
    pub subject: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Build the provider's authorization URL for the browser redirect.
pub fn authorize_url(
    provider: &ProviderConfig,
    redirect_uri: &str,
    state: &str,
) -> Result<String, AppError> {
    let mut url = Url::parse(&provider.auth_url)
        .map_err(|e| AppError::Internal(format!("Bad provider auth_url: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("client_id", &provider.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", &provider.scopes.join(" "))
        .append_pair("state", state)
        .append_pair("response_type", "code");
    Ok(url.to_string())
}

/// Exchange an authorization code for an access token.
pub async fn exchange_code(
    http: &reqwest::Client,
    provider: &ProviderConfig,
    redirect_uri: &str,
    code: &str,
) -> Result<String, AppError> {
    let resp = http
        .post(&provider.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &provider.client_id),
            ("client_secret", &provider.client_secret),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(AppError::Internal(format!(
            "Token exchange returned {}: {}",
            status, body
        )));
    }

    let token_json: Value = resp.json().await?;
    token_json["access_token"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::Internal("Token response had no access_token".to_string()))
}

/// Fetch the user document from the provider's userinfo endpoint.
pub async fn fetch_userinfo(
    http: &reqwest::Client,
    provider: &ProviderConfig,
    access_token: &str,
) -> Result<Value, AppError> {
    let resp = http
        .get(&provider.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(AppError::Internal(format!(
            "Userinfo returned {}: {}",
            status, body
        )));
    }

    Ok(resp.json().await?)
}

/// Map a userinfo document to the fields we store. Field names differ
/// per provider.
pub fn extract_identity(provider_key: &str, userinfo: &Value) -> Result<FederatedIdentity, AppError> {
    let subject = match provider_key {
        "google" => userinfo["sub"].as_str(),
        "facebook" => userinfo["id"].as_str(),
        _ => userinfo["id"].as_str().or_else(|| userinfo["sub"].as_str()),
    }
    .map(|s| s.to_string())
    .ok_or_else(|| {
        AppError::Internal(format!("Provider {} returned no subject id", provider_key))
    })?;

    let name = userinfo["name"].as_str().unwrap_or("Unknown").to_string();
    let email = userinfo["email"].as_str().map(|s| s.to_string());
    let avatar_url = match provider_key {
        "facebook" => userinfo["picture"]["data"]["url"].as_str(),
        _ => userinfo["picture"].as_str(),
    }
    .map(|s| s.to_string());

    Ok(FederatedIdentity {
        subject,
        name,
        email,
        avatar_url,
    })
}

/// Find the account linked to this identity, or provision one.
/// A returning identity refreshes the display fields; an identity
/// whose email already has a password account gets linked to it.
pub fn find_or_create_user(
    pool: &DbPool,
    provider_key: &str,
    identity: &FederatedIdentity,
) -> Result<User, AppError> {
    let conn = pool.get()?;

    let linked: Option<String> = match conn.query_row(
        "SELECT user_id FROM federated_accounts WHERE provider = ?1 AND subject = ?2",
        params![provider_key, identity.subject],
        |row| row.get(0),
    ) {
        Ok(uid) => Some(uid),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };

    if let Some(uid) = linked {
        conn.execute(
            "UPDATE users SET name = ?2, avatar_url = COALESCE(?3, avatar_url) WHERE id = ?1",
            params![uid, identity.name, identity.avatar_url],
        )?;
        return profiles::find_user(&conn, &uid)?.ok_or(AppError::NotFound);
    }

    if let Some(email) = identity.email.as_deref() {
        if let Some(user) = profiles::find_user_by_email(&conn, email)? {
            link_account(&conn, provider_key, &identity.subject, &user.id)?;
            return Ok(user);
        }
    }

    let uid = uuid::Uuid::now_v7().to_string();
    let email = identity.email.clone().unwrap_or_else(|| {
        format!(
            "{}.{}@users.noreply.vitrina.dev",
            provider_key, identity.subject
        )
    });
    let avatar = identity.avatar_url.clone().unwrap_or_default();

    profiles::insert_user(&conn, &uid, &email, None, &identity.name, &avatar)?;
    link_account(&conn, provider_key, &identity.subject, &uid)?;
    profiles::find_user(&conn, &uid)?
        .ok_or_else(|| AppError::Internal("User vanished after insert".to_string()))
}

fn link_account(
    conn: &rusqlite::Connection,
    provider: &str,
    subject: &str,
    user_id: &str,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT OR IGNORE INTO federated_accounts (id, user_id, provider, subject) VALUES (?1, ?2, ?3, ?4)",
        params![uuid::Uuid::now_v7().to_string(), user_id, provider, subject],
    )?;
    Ok(())
}
