//! HTTP front end for Finfolio: a JSON API over [`finfolio_core::Finfolio`],
//! bearer-token sessions, the cached news feed and periodic snapshot saves.

pub mod api;
pub mod auth;
pub mod config;
pub mod server;
pub mod state;
