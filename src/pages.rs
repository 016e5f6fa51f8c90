// src/pages.rs
//! Routes of the application and the URL helpers built around them.

pub const SIGNIN: &str = "/login";
pub const SIGNOUT: &str = "/logout";
pub const SIGNUP: &str = "/register";
pub const INDEX: &str = "/";

pub mod account {
    pub const INDEX: &str = "/account";
    pub const USERS: &str = "/account/users";
}

/// `path?key=value` with the value encoded.
pub fn with_query(path: &str, key: &str, value: &str) -> String {
    format!("{}?{}={}", path, key, urlencoding::encode(value))
}

/// Whether a redirect target stays on this site.
pub fn is_local(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}
