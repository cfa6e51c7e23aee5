// ABOUTME: Request extractors whose rejections go through AppError
// ABOUTME: Malformed JSON bodies and path ids become 400 responses with the standard error body

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON body extractor; a body that fails to parse is a validation failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor; an unparseable id is a validation failure.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
