//! HRMS attendance service: derives daily attendance from biometric device
//! punches and serves it over HTTP.

pub mod api;
pub mod attendance;
pub mod config;
pub mod db;
pub mod device;
pub mod docs;
pub mod model;
pub mod routes;
pub mod utils;
