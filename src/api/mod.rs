//! API module for the BPJS report backend
//!
//! JSON endpoints the dashboard polls, one per report entry point.

pub mod handlers;
pub mod routes;

pub use routes::configure;
