use super::api_path;
use super::auth::bearer;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use uuid::Uuid;

/// Smallest valid PNG (1x1 transparent pixel).
pub fn minimal_png_bytes() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

pub fn minimal_pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj<</Type/Catalog>>endobj\ntrailer<</Root 1 0 R>>\n%%EOF\n".to_vec()
}

/// Multipart form with a `file` part and an optional `document_type` field.
pub fn document_form(
    document_type: Option<&str>,
    bytes: Vec<u8>,
    filename: &str,
    mime_type: &str,
) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(bytes))
        .file_name(filename.to_string())
        .mime_type(mime_type.to_string());
    let form = MultipartForm::new();
    let form = match document_type {
        Some(doc) => form.add_text("document_type", doc.to_string()),
        None => form,
    };
    form.add_part("file", part)
}

pub fn png_form(document_type: &str) -> MultipartForm {
    document_form(
        Some(document_type),
        minimal_png_bytes(),
        "scan.png",
        "image/png",
    )
}

pub async fn create_client(server: &TestServer, email: &str) -> Value {
    let response = server
        .post(&api_path("/clients"))
        .add_header("Authorization", bearer())
        .json(&json!({
            "first_name": "Amira",
            "last_name": "Haddad",
            "email": email,
            "phone": "+33 6 12 34 56 78"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["client"].clone()
}

pub async fn create_car(server: &TestServer, plate: &str, daily_rate: f64) -> Value {
    let response = server
        .post(&api_path("/cars"))
        .add_header("Authorization", bearer())
        .json(&json!({
            "brand": "Renault",
            "model": "Clio",
            "year": 2022,
            "plate_number": plate,
            "color": "grey",
            "daily_rate": daily_rate
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["car"].clone()
}

pub fn id_of(entity: &Value) -> Uuid {
    entity["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("entity has an id")
}

/// Issue an upload token for `kind` ("clients" or "cars") and return the raw JWT.
pub async fn issue_token(server: &TestServer, collection: &str, id: Uuid) -> String {
    let response = server
        .post(&api_path(&format!("/{}/{}/upload-token", collection, id)))
        .add_header("Authorization", bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["token"]
        .as_str()
        .expect("token in response")
        .to_string()
}

/// Post one document through the mobile flow (`flow` is "client-uploads" or "car-uploads").
pub async fn mobile_upload(
    server: &TestServer,
    flow: &str,
    token: &str,
    form: MultipartForm,
) -> TestResponse {
    server
        .post(&api_path(&format!("/{}/{}/documents", flow, token)))
        .multipart(form)
        .await
}

pub async fn mobile_status(server: &TestServer, flow: &str, token: &str) -> TestResponse {
    server
        .get(&api_path(&format!("/{}/{}/status", flow, token)))
        .await
}

pub async fn mobile_complete(server: &TestServer, flow: &str, token: &str) -> TestResponse {
    server
        .post(&api_path(&format!("/{}/{}/complete", flow, token)))
        .await
}

pub fn assert_error(response: &TestResponse, status: StatusCode, code: &str) -> Value {
    assert_eq!(response.status_code(), status, "body: {}", response.text());
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], code);
    body
}
