//! Reachability prober for candidate image URLs

use crate::config::MirrorConfig;
use crate::error::{MirrorError, ProbeFailure, Result};
use async_trait::async_trait;
use image::ImageReader;
use reqwest::Client;
use std::future::Future;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// Outcome of a single probe
pub type ProbeResult = std::result::Result<(), ProbeFailure>;

/// Checks whether a URL serves a usable image
///
/// Implementations must settle exactly once per call.
#[async_trait]
pub trait ImageProber: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeResult;
}

/// Race an image load against `timeout` and classify the result.
///
/// `load` yields the decoded image width. When the timer wins, `load` is dropped
/// mid-flight, which cancels the underlying request; a completion that would
/// have arrived later is never observed.
pub async fn settle_probe<F>(timeout: Duration, min_width: u32, load: F) -> ProbeResult
where
    F: Future<Output = Result<u32>>,
{
    match tokio::time::timeout(timeout, load).await {
        Ok(Ok(width)) if width > min_width => Ok(()),
        Ok(Ok(width)) => {
            debug!("Probe loaded placeholder image: width={}", width);
            Err(ProbeFailure::Empty)
        }
        Ok(Err(e)) => {
            debug!("Probe load failed: {}", e);
            Err(ProbeFailure::Error)
        }
        Err(_) => Err(ProbeFailure::Timeout),
    }
}

/// Prober that fetches the URL over HTTP and decodes the image header
///
/// Requests never carry a `Referer` header.
pub struct HttpImageProber {
    client: Client,
    timeout: Duration,
    min_width: u32,
    max_bytes: usize,
}

impl HttpImageProber {
    /// Create a new HttpImageProber from the configuration
    pub fn new(config: &MirrorConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .referer(false)
            .pool_max_idle_per_host(2)
            .tcp_nodelay(true);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| MirrorError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpImageProber {
            client,
            timeout: config.probe_timeout(),
            min_width: config.min_image_width,
            max_bytes: config.max_probe_bytes,
        })
    }

    /// Fetch the body until the image header yields a width
    async fn load_width(&self, url: &str) -> Result<u32> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?;

        let mut sniffer = WidthSniffer::new(self.max_bytes);
        while let Some(chunk) = response.chunk().await? {
            if let Some(width) = sniffer.push(&chunk)? {
                return Ok(width);
            }
        }
        sniffer.finish()
    }
}

/// Accumulates a response body and reports the width as soon as the header
/// bytes are in
///
/// The byte cap only applies while the dimensions are still unknown.
#[derive(Debug)]
pub struct WidthSniffer {
    buffer: Vec<u8>,
    max_bytes: usize,
}

impl WidthSniffer {
    pub fn new(max_bytes: usize) -> Self {
        WidthSniffer {
            buffer: Vec::new(),
            max_bytes,
        }
    }

    /// Append a chunk. Returns the width once it can be read from the prefix.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<u32>> {
        self.buffer.extend_from_slice(chunk);
        if let Ok(width) = image_width(&self.buffer) {
            return Ok(Some(width));
        }
        if self.buffer.len() > self.max_bytes {
            return Err(MirrorError::HttpError(format!(
                "No image header within {} bytes",
                self.max_bytes
            )));
        }
        Ok(None)
    }

    /// Body ended; decode whatever was received
    pub fn finish(self) -> Result<u32> {
        image_width(&self.buffer)
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[async_trait]
impl ImageProber for HttpImageProber {
    async fn probe(&self, url: &str) -> ProbeResult {
        let result = settle_probe(self.timeout, self.min_width, self.load_width(url)).await;
        match &result {
            Ok(()) => debug!("Probe succeeded: url={}", url),
            Err(reason) => debug!("Probe failed: url={}, reason={}", url, reason),
        }
        result
    }
}

/// Read the pixel width from an encoded image without decoding the pixels
pub fn image_width(bytes: &[u8]) -> Result<u32> {
    let (width, _height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_image_width_png() {
        assert_eq!(image_width(&png(24, 3)).unwrap(), 24);
    }

    #[test]
    fn test_image_width_rejects_garbage() {
        assert!(image_width(b"<html>not an image</html>").is_err());
        assert!(image_width(&[]).is_err());
    }

    #[tokio::test]
    async fn test_settle_wide_image_succeeds() {
        let result = settle_probe(Duration::from_secs(1), 10, async { Ok(11) }).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_settle_narrow_image_is_empty() {
        let result = settle_probe(Duration::from_secs(1), 10, async { Ok(10) }).await;
        assert_eq!(result, Err(ProbeFailure::Empty));
    }

    #[tokio::test]
    async fn test_settle_load_error() {
        let result = settle_probe(Duration::from_secs(1), 10, async {
            Err(MirrorError::HttpError("connection refused".to_string()))
        })
        .await;
        assert_eq!(result, Err(ProbeFailure::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_times_out_after_exact_duration() {
        let started = tokio::time::Instant::now();
        let result = settle_probe(
            Duration::from_millis(5000),
            10,
            std::future::pending::<Result<u32>>(),
        )
        .await;
        assert_eq!(result, Err(ProbeFailure::Timeout));
        assert_eq!(started.elapsed(), Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_ignores_late_completion() {
        let result = settle_probe(Duration::from_millis(100), 10, async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(500)
        })
        .await;
        assert_eq!(result, Err(ProbeFailure::Timeout));
    }

    #[test]
    fn test_sniffer_reports_width_once_header_arrives() {
        let image = png(32, 8);
        let mut sniffer = WidthSniffer::new(1024);

        // Signature alone is not enough
        assert_eq!(sniffer.push(&image[..8]).unwrap(), None);
        assert_eq!(sniffer.push(&image[8..]).unwrap(), Some(32));
        assert_eq!(sniffer.buffered(), image.len());
    }

    #[test]
    fn test_sniffer_ignores_cap_once_header_is_read() {
        let mut body = png(32, 8);
        body.extend(std::iter::repeat(0u8).take(4096));

        let mut sniffer = WidthSniffer::new(1024);
        assert_eq!(sniffer.push(&body).unwrap(), Some(32));
    }

    #[test]
    fn test_sniffer_rejects_headerless_body_over_cap() {
        let mut sniffer = WidthSniffer::new(1024);
        assert_eq!(sniffer.push(&[0u8; 512]).unwrap(), None);
        assert!(sniffer.push(&[0u8; 600]).is_err());
    }

    #[test]
    fn test_sniffer_finish_short_body() {
        let mut sniffer = WidthSniffer::new(1024);
        assert_eq!(sniffer.push(b"GIF").unwrap(), None);
        assert!(sniffer.finish().is_err());
    }

    #[test]
    fn test_image_width_bmp() {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::new(40, 2)
            .write_to(&mut out, ImageFormat::Bmp)
            .unwrap();
        assert_eq!(image_width(out.get_ref()).unwrap(), 40);
    }

    #[test]
    fn test_http_prober_new() {
        let config = MirrorConfig {
            user_agent: Some("shard-mirror-test".to_string()),
            ..Default::default()
        };
        let prober = HttpImageProber::new(&config).unwrap();
        assert_eq!(prober.timeout, Duration::from_millis(5000));
        assert_eq!(prober.min_width, 10);
    }
}
