pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod query;
pub mod response;
pub mod routes;
pub mod state;
