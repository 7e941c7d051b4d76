//! chainshare-server: HTTP front end for registry-governed file sharing

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
