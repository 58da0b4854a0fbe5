//! # pdf-protector-api
//!
//! REST API server for the pdf-protector library
//!

mod api;
pub use api::{
    app, app_with_options, check_pdf, health_check, protect_pdf, verify_password, AppError,
    CheckResponse, ErrorResponse, VerifyResponse,
};
