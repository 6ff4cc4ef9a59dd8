//! Integration tests for HttpImageProber against a mock image host
//!
//! Covers the four probe outcomes:
//! - A real image wider than the placeholder threshold
//! - A placeholder image (width at or below the threshold)
//! - HTTP and decode errors
//! - Responses slower than the probe timeout

use image::{ImageFormat, RgbaImage};
use shard_mirror::{HttpImageProber, ImageProber, MirrorConfig, ProbeFailure};
use std::io::Cursor;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbaImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn test_prober(probe_timeout_ms: u64) -> HttpImageProber {
    let config = MirrorConfig {
        probe_timeout_ms,
        ..Default::default()
    };
    HttpImageProber::new(&config).unwrap()
}

/// Mount a GET handler serving `body` as `content_type` at `path_str`
async fn serve(server: &MockServer, path_str: &str, status: u16, content_type: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("Content-Type", content_type)
                .set_body_bytes(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_probe_real_image_succeeds() {
    let server = MockServer::start().await;
    serve(&server, "/wide.png", 200, "image/png", png(20, 20)).await;

    let prober = test_prober(5000);
    let result = prober.probe(&format!("{}/wide.png", server.uri())).await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_probe_placeholder_is_empty() {
    let server = MockServer::start().await;
    serve(&server, "/pixel.png", 200, "image/png", png(5, 5)).await;
    serve(&server, "/edge.png", 200, "image/png", png(10, 40)).await;

    let prober = test_prober(5000);
    assert_eq!(
        prober.probe(&format!("{}/pixel.png", server.uri())).await,
        Err(ProbeFailure::Empty)
    );
    // Exactly the threshold width is still a placeholder
    assert_eq!(
        prober.probe(&format!("{}/edge.png", server.uri())).await,
        Err(ProbeFailure::Empty)
    );
}

#[tokio::test]
async fn test_probe_http_error() {
    let server = MockServer::start().await;
    serve(&server, "/missing.png", 404, "text/html", b"not found".to_vec()).await;
    serve(&server, "/broken.png", 503, "image/png", png(64, 64)).await;

    let prober = test_prober(5000);
    assert_eq!(
        prober.probe(&format!("{}/missing.png", server.uri())).await,
        Err(ProbeFailure::Error)
    );
    // An error status fails even when the body is a valid image
    assert_eq!(
        prober.probe(&format!("{}/broken.png", server.uri())).await,
        Err(ProbeFailure::Error)
    );
}

#[tokio::test]
async fn test_probe_non_image_body() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/page.png",
        200,
        "text/html",
        b"<html><body>Shard offline</body></html>".to_vec(),
    )
    .await;

    let prober = test_prober(5000);
    let result = prober.probe(&format!("{}/page.png", server.uri())).await;
    assert_eq!(result, Err(ProbeFailure::Error));
}

#[tokio::test]
async fn test_probe_connection_refused() {
    // Start and drop a server so its port is no longer listening
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let prober = test_prober(5000);
    let result = prober.probe(&format!("{}/gone.png", uri)).await;
    assert_eq!(result, Err(ProbeFailure::Error));
}

#[tokio::test]
async fn test_probe_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(png(64, 64))
                .set_delay(Duration::from_millis(2000)),
        )
        .mount(&server)
        .await;

    let prober = test_prober(100);
    let started = std::time::Instant::now();
    let result = prober.probe(&format!("{}/slow.png", server.uri())).await;

    assert_eq!(result, Err(ProbeFailure::Timeout));
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[tokio::test]
async fn test_probe_oversized_body_is_error() {
    let server = MockServer::start().await;
    serve(&server, "/huge.bin", 200, "image/png", vec![0u8; 8192]).await;

    let config = MirrorConfig {
        max_probe_bytes: 1024,
        ..Default::default()
    };
    let prober = HttpImageProber::new(&config).unwrap();
    let result = prober.probe(&format!("{}/huge.bin", server.uri())).await;
    assert_eq!(result, Err(ProbeFailure::Error));
}

#[tokio::test]
async fn test_probe_reads_large_image_by_header() {
    let server = MockServer::start().await;
    let mut body = png(64, 64);
    body.extend(std::iter::repeat(0u8).take(8192));
    serve(&server, "/large.png", 200, "image/png", body).await;

    // The cap bounds header discovery, not the size of the image
    let config = MirrorConfig {
        max_probe_bytes: 1024,
        ..Default::default()
    };
    let prober = HttpImageProber::new(&config).unwrap();
    let result = prober.probe(&format!("{}/large.png", server.uri())).await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_probe_bmp_image() {
    let server = MockServer::start().await;
    let mut bmp = Cursor::new(Vec::new());
    RgbaImage::new(48, 4)
        .write_to(&mut bmp, ImageFormat::Bmp)
        .unwrap();
    serve(&server, "/page.bmp", 200, "image/bmp", bmp.into_inner()).await;

    let prober = test_prober(5000);
    let result = prober.probe(&format!("{}/page.bmp", server.uri())).await;
    tokio_test::assert_ok!(result);
}
