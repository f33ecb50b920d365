use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: String,
    pub avatar_url: String,
    pub introduction: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub main_url: String,
    pub pages_json: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedAccount {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub subject: String,
    pub created_at: String,
}

/// One section of a project page. The `type` tag selects the layout;
/// each variant carries only the data its layout binds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Page {
    Text { content: Vec<String> },
    Gallery { urls: Vec<String> },
    Split { content: Vec<String>, urls: Vec<String> },
    Location { lat: f64, lng: f64 },
}

/// A user document as the rest of the app sees it: the users row
/// joined with the three set-valued lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub introduction: String,
    pub friend_list: Vec<String>,
    pub favorite_list: Vec<String>,
    pub collection: Vec<String>,
}

impl UserProfile {
    pub fn is_favorite(&self, project_id: &str) -> bool {
        self.favorite_list.iter().any(|id| id == project_id)
    }

    pub fn is_collected(&self, project_id: &str) -> bool {
        self.collection.iter().any(|id| id == project_id)
    }

    pub fn is_friend(&self, uid: &str) -> bool {
        self.friend_list.iter().any(|id| id == uid)
    }
}
