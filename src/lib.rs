pub mod auth;
pub mod config;
pub mod database;
pub mod entities;
pub mod error;
pub mod notify;
pub mod response;
pub mod router;
pub mod routes;
pub mod services;
pub mod util;
