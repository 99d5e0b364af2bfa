//! HTTP-level integration tests for the exam API.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; no
//! socket is bound. Returned documents are opened with the `zip` crate and
//! checked through the text of `word/document.xml`.
//!
//! Run with:
//!   cargo test --test api

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use resvg::usvg::fontdb;
use serde_json::{json, Value};
use simulado_docx::{router, AppState, ChartRenderer, GeneratorConfig, ServerConfig};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn app() -> Router {
    let config = GeneratorConfig::default();
    // An empty font database keeps tests independent of the host's fonts.
    let charts = ChartRenderer::with_fonts(&config, Arc::new(fontdb::Database::new()));
    router(
        Arc::new(AppState { config, charts }),
        &ServerConfig::default(),
    )
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

/// Text content of `word/document.xml` with tags stripped, one paragraph
/// per line.
fn document_text(docx: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).expect("docx is a zip");
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .expect("document part")
        .read_to_string(&mut xml)
        .unwrap();

    let mut text = String::new();
    let mut in_tag = false;
    let mut tag = String::new();
    for c in xml.chars() {
        match c {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' => {
                in_tag = false;
                if tag == "/w:p" {
                    text.push('\n');
                }
            }
            _ if in_tag => tag.push(c),
            _ => text.push(c),
        }
    }
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
}

/// Image parts stored in the package (directory entries excluded).
fn media_count(docx: &[u8]) -> usize {
    let archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let count = archive
        .file_names()
        .filter(|n| n.starts_with("word/media/") && !n.ends_with('/'))
        .count();
    count
}

/// Pictures placed in the body, counted as `<w:drawing>` elements.
fn drawing_count(docx: &[u8]) -> usize {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml.matches("<w:drawing>").count()
}

fn png_base64(rgb: [u8; 3]) -> String {
    let img = image::RgbImage::from_pixel(12, 8, image::Rgb(rgb));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    STANDARD.encode(buf.into_inner())
}

fn error_message(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).expect("JSON error body");
    value["error"].as_str().expect("error field").to_string()
}

// ── Success paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn simple_math_exam() {
    let body = json!({
        "materia": "Math",
        "itens": [{
            "enunciado": "2+2=?",
            "alternativas": { "a": "3", "b": "4" },
            "gabarito": "b"
        }]
    });
    let (status, headers, docx) = send(post("/gerar-simulado", body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Exam_Math.docx\""
    );

    let text = document_text(&docx);
    let lines: Vec<&str> = text.lines().collect();
    for expected in ["Exam: Math", "QUESTION 1", "2+2=?", "(A) 3", "(B) 4", "Q1: KEY B"] {
        assert!(lines.contains(&expected), "missing {expected:?} in {lines:#?}");
    }
    let key_at = lines.iter().position(|l| *l == "Q1: KEY B").unwrap();
    assert!(
        lines[key_at + 1..].iter().all(|l| !l.starts_with("(A)")),
        "no rationale lines expected"
    );
    assert_eq!(media_count(&docx), 0);
}

#[tokio::test]
async fn english_alias_route_and_keys() {
    let body = json!({
        "title": "Unit 3 quiz",
        "subject": "Natural Sciences",
        "items": [
            { "statement": "Pick one", "alternatives": ["x", "y", "z"], "answer_key": "C",
              "rationale": { "c": "z is right", "a": "x is a distractor" } }
        ]
    });
    let (status, headers, docx) = send(post("/generate", body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Exam_Natural_Sciences.docx\""
    );
    let text = document_text(&docx);
    assert!(text.contains("Unit 3 quiz"));
    assert!(text.contains("(C) z"));
    assert!(text.contains("Q1: KEY C"));
    assert!(text.contains("(A) x is a distractor"));
    assert!(text.contains("(C) z is right"));
}

#[tokio::test]
async fn supplied_pictures_are_embedded() {
    let body = json!({
        "itens": [
            { "enunciado": "plain", "imagem_base64": png_base64([0, 90, 200]) },
            { "enunciado": "data uri",
              "imagem_base64": format!("data:image/png;base64,{}", png_base64([200, 40, 0])) }
        ]
    });
    let (status, _, docx) = send(post("/gerar-simulado", body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(media_count(&docx), 2);
    assert_eq!(drawing_count(&docx), 2, "each question embeds its picture");
}

#[tokio::test]
async fn invalid_picture_still_returns_document() {
    let body = json!({
        "itens": [{ "enunciado": "look here", "imagem_base64": "@@not base64@@", "gabarito": "a" }]
    });
    let (status, _, docx) = send(post("/gerar-simulado", body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(media_count(&docx), 0);
    assert_eq!(drawing_count(&docx), 0);
    let text = document_text(&docx);
    assert!(text.contains("look here"));
    assert!(text.contains("Q1: KEY A"));
}

#[tokio::test]
async fn charts_and_tables_from_visual_spec() {
    let body = json!({
        "itens": [
            { "enunciado": "line", "visual_spec": { "tipo": "reta_numerica", "min": -2, "max": 2, "step": 1,
                                                   "marks": [-2, 0, 2], "destaque": { "valor": 1, "rotulo": "P" } } },
            { "enunciado": "bars", "visual_spec": { "kind": "bar", "categories": ["a", "b"], "values": [3, "4,5"] } },
            { "enunciado": "grid", "visual_spec": { "kind": "table", "columns": ["n", "n²"], "rows": [[1, 1], [2, 4]] } }
        ]
    });
    let (status, _, docx) = send(post("/gerar-simulado", body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(media_count(&docx), 2, "number line and bar chart");
    assert_eq!(drawing_count(&docx), 2);
    let text = document_text(&docx);
    assert!(text.contains("n²"));
    assert!(text.contains("QUESTION 3"));
}

#[tokio::test]
async fn broken_chart_spec_keeps_the_question() {
    let body = json!({
        "itens": [{ "enunciado": "degenerate", "visual_spec": { "kind": "number_line", "min": 5, "max": 1 } }]
    });
    let (status, _, docx) = send(post("/gerar-simulado", body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(media_count(&docx), 0);
    assert!(document_text(&docx).contains("degenerate"));
}

#[tokio::test]
async fn oversized_bar_chart_is_dropped_not_fatal() {
    let categories: Vec<String> = (0..100_000).map(|i| format!("c{i}")).collect();
    let values = vec![1; 100_000];
    let body = json!({
        "itens": [{ "enunciado": "too many bars",
                    "visual_spec": { "kind": "bar", "categories": categories, "values": values } }]
    });
    let (status, _, docx) = send(post("/gerar-simulado", body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(media_count(&docx), 0);
    assert!(document_text(&docx).contains("too many bars"));
}

// ── Rejections ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_body_is_400() {
    let (status, headers, body) = send(post("/gerar-simulado", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(error_message(&body), "No JSON data received");
}

#[tokio::test]
async fn null_and_empty_object_are_400() {
    for payload in ["null", "{}", "[1,2,3]", "\"exam\"", "{broken"] {
        let (status, _, body) = send(post("/gerar-simulado", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(!error_message(&body).is_empty());
    }
}

// ── Health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_endpoints() {
    for uri in ["/", "/health"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Exam API online! Send a POST to /gerar-simulado"
        );
    }
}
