//! Data Transfer Objects for REST request/response serialization.
//!
//! Station and price bodies reuse the domain types directly; only query
//! parameters and system payloads live here.

pub mod station_dto;
pub mod system_dto;

pub use station_dto::*;
pub use system_dto::*;
