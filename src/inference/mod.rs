//! Serving predictions from saved artifacts.
//!
//! [`InferenceService`] is built once from the artifact store and then
//! answers requests: validate against the fit-time schema, transform, predict.

mod request;
mod service;

pub use request::{normalize, parse_request, PredictionResponse, USER_ERROR_MESSAGE};
pub use service::{InferenceService, ServiceError};
