use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` whose rejections render through [`AppError`], so a malformed or
/// mistyped body is a 400 with a JSON error like every other bad request.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
