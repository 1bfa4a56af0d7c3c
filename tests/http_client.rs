//! `HttpBackend` against a one-shot loopback HTTP server.
//!
//! Each test binds `127.0.0.1:0`, answers exactly one request with a canned
//! response and hands back what the client actually sent.

use pdf_augmenter::input::PDF_MIME;
use pdf_augmenter::{
    AskRequest, AugmenterBackend, AugmenterError, ClientConfig, Endpoint, ExtractedItem,
    ExtractionMode, ExtractionSession, FileCandidate, HttpBackend, SelectedFile, SessionStatus,
    TableCase,
};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn body_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).to_lowercase()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_more(stream: &mut TcpStream, buf: &mut Vec<u8>) -> usize {
    let mut chunk = [0u8; 8192];
    let n = stream.read(&mut chunk).await.unwrap();
    buf.extend_from_slice(&chunk[..n]);
    n
}

async fn read_request(stream: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let header_end = loop {
        assert!(read_more(stream, &mut buf).await > 0, "closed before headers");
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok());

    let mut body = buf[header_end..].to_vec();
    match content_length {
        Some(len) => {
            while body.len() < len {
                if read_more(stream, &mut body).await == 0 {
                    break;
                }
            }
        }
        None => {
            while find(&body, b"0\r\n\r\n").is_none() {
                if read_more(stream, &mut body).await == 0 {
                    break;
                }
            }
        }
    }

    Captured {
        request_line,
        headers,
        body,
    }
}

/// Serve one request with `status` and a JSON `body`.
async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut stream).await;
        let reason = if status < 400 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        captured
    });
    (format!("http://{addr}"), handle)
}

fn backend(base_url: &str) -> HttpBackend {
    let config = ClientConfig::builder()
        .base_url(base_url)
        .request_timeout_secs(10)
        .build()
        .unwrap();
    HttpBackend::new(config).unwrap()
}

fn report() -> SelectedFile {
    SelectedFile::try_from(FileCandidate::new(
        "report.pdf",
        PDF_MIME,
        b"%PDF-1.4\nhello\n%%EOF\n".to_vec(),
    ))
    .unwrap()
}

#[tokio::test]
async fn extraction_uploads_the_pdf_field() {
    let (url, server) = serve_once(
        200,
        r#"[{"preview_data":[["A","B"]],"description":"d","page":1,"table_index":0}]"#,
    )
    .await;

    let items = backend(&url)
        .extract(Endpoint::Tables(TableCase::Case2), &report())
        .await
        .unwrap();
    let req = server.await.unwrap();

    assert_eq!(
        req.request_line,
        "POST /extract-description/second-case/tables HTTP/1.1"
    );
    assert!(req
        .header("content-type")
        .unwrap()
        .starts_with("multipart/form-data"));
    let body = req.body_lossy();
    assert!(body.contains(r#"name="pdf""#), "{body}");
    assert!(body.contains(r#"filename="report.pdf""#), "{body}");
    assert!(body.contains("content-type: application/pdf"), "{body}");
    assert!(body.contains("%pdf-1.4"));

    assert_eq!(items.len(), 1);
    match &items[0] {
        ExtractedItem::Table(t) => {
            assert_eq!(t.preview_data[0], vec!["A", "B"]);
            assert_eq!(t.description, "d");
        }
        other => panic!("expected a table, got {other:?}"),
    }
}

#[tokio::test]
async fn legacy_tables_endpoint_is_reachable() {
    let (url, server) = serve_once(200, "[]").await;
    let items = backend(&url)
        .extract(Endpoint::LegacyTables, &report())
        .await
        .unwrap();
    assert!(items.is_empty());
    assert_eq!(
        server.await.unwrap().request_line,
        "POST /extract-description HTTP/1.1"
    );
}

#[tokio::test]
async fn server_error_maps_to_http_status() {
    let (url, server) = serve_once(500, r#"{"error":"pdf parser exploded"}"#).await;
    let err = backend(&url)
        .extract(Endpoint::Images, &report())
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(err.is_transport());
    match err {
        AugmenterError::HttpStatus { endpoint, status } => {
            assert_eq!(endpoint, "/extract-description/images");
            assert_eq!(status, 500);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_array_body_is_a_decode_failure() {
    let (url, server) = serve_once(200, r#"{"error":"No file provided"}"#).await;
    let err = backend(&url)
        .extract(Endpoint::Formulas, &report())
        .await
        .unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, AugmenterError::DecodeFailed { .. }), "{err:?}");
    assert!(err.is_transport());
}

#[tokio::test]
async fn refused_connection_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = backend(&format!("http://{addr}"))
        .extract(Endpoint::Images, &report())
        .await
        .unwrap_err();
    assert!(err.is_transport(), "{err:?}");
}

#[tokio::test]
async fn questions_are_posted_as_json() {
    let (url, server) = serve_once(200, r#"{"answer":"Quarterly revenue."}"#).await;
    let answer = backend(&url)
        .ask(&AskRequest {
            question: "What does it show?".into(),
            table_description: "A table of revenue by quarter".into(),
        })
        .await
        .unwrap();
    let req = server.await.unwrap();

    assert_eq!(answer, "Quarterly revenue.");
    assert_eq!(req.request_line, "POST /ask-question HTTP/1.1");
    assert!(req
        .header("content-type")
        .unwrap()
        .starts_with("application/json"));
    let sent: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(sent["question"], "What does it show?");
    assert_eq!(sent["table_description"], "A table of revenue by quarter");
}

#[tokio::test]
async fn session_over_http_reaches_results() {
    let (url, server) = serve_once(
        200,
        r#"[{"base64":"iVBORw0KGgo=","description":"logo","page":3,"image_index":0}]"#,
    )
    .await;

    let mut session = ExtractionSession::new(Arc::new(backend(&url)));
    session
        .select(Some(FileCandidate::new(
            "report.pdf",
            PDF_MIME,
            b"%PDF-1.4".to_vec(),
        )))
        .unwrap();
    session.set_mode(ExtractionMode::Images).unwrap();
    assert_eq!(session.process().await.unwrap(), SessionStatus::Results);
    assert_eq!(
        server.await.unwrap().request_line,
        "POST /extract-description/images HTTP/1.1"
    );

    let text = session.viewer().render_current().unwrap();
    assert!(text.starts_with("Image 1 of 1 (Page 3)"), "{text}");
    assert!(text.contains("[png image, 8 bytes]"));
}
