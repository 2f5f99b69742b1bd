//! Agency portal: session lifecycle, route guards, profile management and
//! the admin reset endpoint for an auto-insurance agency.

pub mod busy;
pub mod config;
pub mod db;
pub mod guard;
pub mod identity;
pub mod maintenance;
pub mod platform;
pub mod profile;
pub mod routes;
pub mod session;
pub mod state;
pub mod telemetry;
