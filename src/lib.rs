pub mod app_state;
pub mod auth;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod uptime;

#[cfg(test)]
pub mod test_utils;
