//! In-process message catalog. Notices are stored and flashed by key,
//! then resolved against the viewer's language at render time.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    Zh,
}

impl Lang {
    /// Pick a language from an Accept-Language header value. Anything
    /// that is not a Chinese tag falls back to English.
    pub fn from_accept_language(header: &str) -> Self {
        for part in header.split(',') {
            let tag = part.split(';').next().unwrap_or("").trim();
            if tag.len() >= 2 {
                match &tag[..2].to_ascii_lowercase()[..] {
                    "zh" => return Lang::Zh,
                    "en" => return Lang::En,
                    _ => continue,
                }
            }
        }
        Lang::En
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    LoginSuccessfully,
    LoginFailed,
    SignUpSuccessfully,
    SignUpFailed,
    LogoutSuccessfully,
    PleaseLogin,
    ProfileUpdated,
    FriendAdded,
    FriendRemoved,
    ProjectCreated,
    ActionFailed,
}

pub const ALL_KEYS: &[MessageKey] = &[
    MessageKey::LoginSuccessfully,
    MessageKey::LoginFailed,
    MessageKey::SignUpSuccessfully,
    MessageKey::SignUpFailed,
    MessageKey::LogoutSuccessfully,
    MessageKey::PleaseLogin,
    MessageKey::ProfileUpdated,
    MessageKey::FriendAdded,
    MessageKey::FriendRemoved,
    MessageKey::ProjectCreated,
    MessageKey::ActionFailed,
];

impl MessageKey {
    /// Stable identifier used in the flash cookie.
    pub fn as_key(&self) -> &'static str {
        match self {
            MessageKey::LoginSuccessfully => "login_successfully",
            MessageKey::LoginFailed => "login_failed",
            MessageKey::SignUpSuccessfully => "sign_up_successfully",
            MessageKey::SignUpFailed => "sign_up_failed",
            MessageKey::LogoutSuccessfully => "logout_successfully",
            MessageKey::PleaseLogin => "please_login",
            MessageKey::ProfileUpdated => "profile_updated",
            MessageKey::FriendAdded => "friend_added",
            MessageKey::FriendRemoved => "friend_removed",
            MessageKey::ProjectCreated => "project_created",
            MessageKey::ActionFailed => "action_failed",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ALL_KEYS.iter().copied().find(|k| k.as_key() == key)
    }
}

/// Resolve a message key for a language. Total over both enums.
pub fn translate(lang: Lang, key: MessageKey) -> &'static str {
    match lang {
        Lang::En => match key {
            MessageKey::LoginSuccessfully => "Logged in successfully",
            MessageKey::LoginFailed => "Login failed",
            MessageKey::SignUpSuccessfully => "Signed up successfully",
            MessageKey::SignUpFailed => "Sign up failed",
            MessageKey::LogoutSuccessfully => "Logged out successfully",
            MessageKey::PleaseLogin => "Please log in first",
            MessageKey::ProfileUpdated => "Profile updated",
            MessageKey::FriendAdded => "Friend added",
            MessageKey::FriendRemoved => "Friend removed",
            MessageKey::ProjectCreated => "Project published",
            MessageKey::ActionFailed => "Something went wrong, please try again",
        },
        Lang::Zh => match key {
            MessageKey::LoginSuccessfully => "登入成功",
            MessageKey::LoginFailed => "登入失敗",
            MessageKey::SignUpSuccessfully => "註冊成功",
            MessageKey::SignUpFailed => "註冊失敗",
            MessageKey::LogoutSuccessfully => "登出成功",
            MessageKey::PleaseLogin => "請先登入",
            MessageKey::ProfileUpdated => "個人資料已更新",
            MessageKey::FriendAdded => "已加入好友",
            MessageKey::FriendRemoved => "已移除好友",
            MessageKey::ProjectCreated => "作品已發佈",
            MessageKey::ActionFailed => "操作失敗，請稍後再試",
        },
    }
}
