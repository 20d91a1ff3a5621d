//! HTTP inbound adapter exposing the `/api/v1` REST endpoints.

pub mod cache_control;
pub mod catalogue;
pub mod dto;
pub mod error;
pub mod grades;
pub mod health;
pub mod ledger;
pub mod principals;
pub mod registrations;
pub mod routes;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod validation;

pub use error::ApiResult;
