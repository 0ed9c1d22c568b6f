pub mod auth;
pub mod patterns;
pub mod projects;
