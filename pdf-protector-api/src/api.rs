use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Json, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use pdf_protector::{ParseOptions, PdfError, ProtectOptions, ProtectionInfo, Protector, Role};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Multipart overhead allowed on top of the document size ceiling
const MULTIPART_SLACK: usize = 64 * 1024;

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message describing what went wrong
    pub error: String,
}

/// Response for the protection check endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub protected: bool,
    /// Encryption settings, when the handler is understood
    pub info: Option<ProtectionInfo>,
}

/// Response for the password verification endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub role: Role,
}

/// Application-specific error types for the API
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Errors reported by pdf-protector
    #[error(transparent)]
    Pdf(#[from] PdfError),
    /// Unreadable multipart body
    #[error("Failed to read multipart body: {0}")]
    Multipart(#[from] MultipartError),
    /// Missing or invalid form field
    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Pdf(PdfError::MalformedDocument(_))
            | AppError::Pdf(PdfError::UnsupportedSecurityHandler(_)) => StatusCode::BAD_REQUEST,
            AppError::Pdf(PdfError::DocumentTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Pdf(PdfError::EncryptionFailed { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Pdf(PdfError::IncorrectPassword) => StatusCode::UNAUTHORIZED,
            AppError::Pdf(PdfError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Multipart(e) => e.status(),
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        debug!("Request failed with {}: {}", status, self);
        let error_response = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Build the application router with strict parsing defaults
pub fn app() -> Router {
    app_with_options(ParseOptions::default())
}

/// Build the application router around a parser configuration
pub fn app_with_options(options: ParseOptions) -> Router {
    let body_limit = options.max_document_size.saturating_add(MULTIPART_SLACK);
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/protect", post(protect_pdf))
        .route("/api/check", post(check_pdf))
        .route("/api/verify", post(verify_password))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Protector::new(options))
}

/// Health check endpoint for monitoring and load balancing
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pdf-protector API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Encrypt an uploaded PDF; answers with the protected file
pub async fn protect_pdf(
    State(protector): State<Protector>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.file()?;
    let password = form
        .password
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing 'password' field".to_string()))?;

    let mut options = ProtectOptions::new();
    if let Some(owner) = form.owner_password.as_deref().filter(|p| !p.is_empty()) {
        options = options.with_owner_password(owner);
    }
    if let Some(bits) = form.key_length.as_deref() {
        let bits = bits
            .trim()
            .parse::<u32>()
            .map_err(|_| AppError::BadRequest(format!("Invalid key_length '{bits}'")))?;
        options = options.with_key_length(bits);
    }

    let protected = protector.protect(file, password, &options)?;
    info!("Protected upload ({} bytes)", protected.len());

    Ok((
        StatusCode::OK,
        [
            ("Content-Type", "application/pdf"),
            (
                "Content-Disposition",
                "attachment; filename=\"protected.pdf\"",
            ),
        ],
        protected,
    )
        .into_response())
}

/// Report whether an uploaded PDF is protected
pub async fn check_pdf(
    State(protector): State<Protector>,
    multipart: Multipart,
) -> Result<Json<CheckResponse>, AppError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.file()?;

    let protected = protector.is_protected(file)?;
    let info = if protected {
        protector.inspect(file).unwrap_or_else(|e| {
            debug!("Encryption settings unavailable: {e}");
            None
        })
    } else {
        None
    };

    Ok(Json(CheckResponse { protected, info }))
}

/// Classify a password against an uploaded PDF
pub async fn verify_password(
    State(protector): State<Protector>,
    multipart: Multipart,
) -> Result<Json<VerifyResponse>, AppError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.file()?;
    let password = form.password.as_deref().unwrap_or_default();

    let role = protector.check_password(file, password)?;
    Ok(Json(VerifyResponse { role }))
}

/// Fields accepted by the upload endpoints
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    password: Option<String>,
    owner_password: Option<String>,
    key_length: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            match field.name().unwrap_or("") {
                "file" => form.file = Some(field.bytes().await?.to_vec()),
                "password" => form.password = Some(field.text().await?),
                "owner_password" => form.owner_password = Some(field.text().await?),
                "key_length" => form.key_length = Some(field.text().await?),
                other => debug!("Ignoring multipart field '{other}'"),
            }
        }
        Ok(form)
    }

    fn file(&self) -> Result<&[u8], AppError> {
        self.file
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("No file provided in upload".to_string()))
    }
}
