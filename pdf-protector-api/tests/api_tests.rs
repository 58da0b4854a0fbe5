//! Unit and integration tests for pdf-protector-api

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use pdf_protector::{ParseOptions, PdfError};
use pdf_protector_api::{app, app_with_options, ErrorResponse};
use pretty_assertions::assert_eq;
use tower::util::ServiceExt;

const BOUNDARY: &str = "----pdf-protector-test-boundary";

/// Minimal one-page document with a correct cross-reference table
fn sample_pdf() -> Vec<u8> {
    let content = "BT /F1 12 Tf 72 720 Td (Salary table) Tj ET";
    let bodies = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>".to_string(),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(b"xref\n0 5\n0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!("trailer\n<< /Size 5 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n").as_bytes(),
    );
    out
}

/// multipart/form-data body with an optional `file` part and text fields
fn multipart_body(file: Option<&[u8]>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"in.pdf\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post(app: Router, uri: &str, body: Vec<u8>) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .method("POST")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn protected_sample(fields: &[(&str, &str)]) -> Vec<u8> {
    let response = post(
        app(),
        "/api/protect",
        multipart_body(Some(&sample_pdf()), fields),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use axum::response::IntoResponse;
    use pdf_protector_api::AppError;

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            error: "Test error message".to_string(),
        };

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"], "Test error message");
    }

    #[test]
    fn test_app_error_status_mapping() {
        let cases = [
            (PdfError::MalformedDocument("bad".into()), StatusCode::BAD_REQUEST),
            (
                PdfError::UnsupportedSecurityHandler("Adobe.PubSec".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                PdfError::DocumentTooLarge { size: 10, limit: 5 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                PdfError::encryption_failed("nope"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (PdfError::IncorrectPassword, StatusCode::UNAUTHORIZED),
        ];
        for (error, status) in cases {
            let app_error: AppError = error.into();
            assert_eq!(app_error.into_response().status(), status);
        }
    }

    #[test]
    fn test_app_error_bad_request() {
        let response = AppError::BadRequest("missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_health_check_endpoint() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .method("GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "pdf-protector API");
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn test_protect_endpoint() {
        let response = post(
            app(),
            "/api/protect",
            multipart_body(Some(&sample_pdf()), &[("password", "secret")]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/pdf"
        );
        assert_eq!(
            response.headers().get("content-disposition").unwrap(),
            "attachment; filename=\"protected.pdf\""
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.starts_with(b"%PDF"));
        assert!(pdf_protector::is_protected(&body).unwrap());
        assert!(!body.windows(b"Salary".len()).any(|w| w == b"Salary"));
    }

    #[tokio::test]
    async fn test_check_endpoint() {
        let response = post(app(), "/api/check", multipart_body(Some(&sample_pdf()), &[])).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["protected"], false);
        assert!(json["info"].is_null());

        let protected = protected_sample(&[("password", "secret"), ("key_length", "256")]).await;
        let response = post(app(), "/api/check", multipart_body(Some(&protected), &[])).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["protected"], true);
        assert_eq!(json["info"]["revision"], 6);
    }

    #[tokio::test]
    async fn test_verify_endpoint_roles() {
        let protected = protected_sample(&[
            ("password", "reader"),
            ("owner_password", "admin"),
            ("key_length", "40"),
        ])
        .await;

        for (password, role) in [("reader", "user"), ("admin", "owner"), ("guess", "none")] {
            let response = post(
                app(),
                "/api/verify",
                multipart_body(Some(&protected), &[("password", password)]),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["role"], role);
        }
    }

    #[tokio::test]
    async fn test_protect_missing_file() {
        let response = post(
            app(),
            "/api/protect",
            multipart_body(None, &[("password", "secret")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_body(response).await;
        let error: ErrorResponse = serde_json::from_value(json).unwrap();
        assert!(error.error.contains("No file"));
    }

    #[tokio::test]
    async fn test_protect_missing_password() {
        let response = post(app(), "/api/protect", multipart_body(Some(&sample_pdf()), &[])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_protect_invalid_key_length() {
        let response = post(
            app(),
            "/api/protect",
            multipart_body(
                Some(&sample_pdf()),
                &[("password", "x"), ("key_length", "lots")],
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = post(
            app(),
            "/api/protect",
            multipart_body(Some(&sample_pdf()), &[("password", "x"), ("key_length", "100")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_protect_already_protected() {
        let protected = protected_sample(&[("password", "secret")]).await;
        let response = post(
            app(),
            "/api/protect",
            multipart_body(Some(&protected), &[("password", "again")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_check_malformed_input() {
        let response = post(
            app(),
            "/api/check",
            multipart_body(Some(b"not a pdf".as_slice()), &[]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_document_too_large() {
        let app = app_with_options(ParseOptions::default().with_max_document_size(100));
        let response = post(app, "/api/check", multipart_body(Some(&sample_pdf()), &[])).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/nonexistent")
                    .method("GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
