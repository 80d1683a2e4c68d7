//! Extractors whose rejections render as the API's JSON error body.
//!
//! Axum's own `Json`, `Path` and `Query` reject with plain-text 4xx
//! responses (422 for a body that parses but doesn't match the type). These
//! wrappers turn every such rejection into a 400 `AppError::BadRequest`.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
