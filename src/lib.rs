// Library exports for Vitrina
// This allows integration tests and external code to use Vitrina modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod i18n;
pub mod notify;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;
