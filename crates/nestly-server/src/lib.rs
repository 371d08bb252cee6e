//! Nestly link-shortening proxy.
//!
//! Browsers cannot call most shorteners directly (CORS), so the web app asks
//! this server instead. It holds no state and stores nothing; it forwards a
//! Nestly link to the upstream shortener and relays the short URL.

pub mod config;
pub mod error;
pub mod routes;
pub mod shortener;
pub mod state;
