use super::*;
use crate::config::DownloaderConfig;
use crate::error::{DownloadError, Error};
use std::io::Cursor;
use std::time::Duration;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Deterministic non-repeating-ish test payload.
fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn settings(chunk_size: u64, workers: usize, threshold: u64) -> DownloaderConfig {
    DownloaderConfig {
        chunk_size_bytes: chunk_size,
        workers,
        parallel_threshold_bytes: threshold,
    }
}

/// How a [`RangeOrigin`] delays its chunk responses.
enum ChunkDelay {
    None,
    /// Earlier chunks respond later, forcing reverse completion order
    ReverseOrder { chunk_size: usize, step_ms: u64 },
    /// Every chunk is slow
    Fixed(Duration),
}

/// Test origin with real byte-range support.
struct RangeOrigin {
    body: Vec<u8>,
    delay: ChunkDelay,
}

impl RangeOrigin {
    fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            delay: ChunkDelay::None,
        }
    }
}

impl Respond for RangeOrigin {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let range = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let Some(range) = range else {
            return ResponseTemplate::new(200).set_body_bytes(self.body.clone());
        };

        let spec = range.trim_start_matches("bytes=");
        let (first, last) = spec.split_once('-').expect("range spec");
        let first: usize = first.parse().expect("range start");
        let last: usize = last
            .parse::<usize>()
            .expect("range end")
            .min(self.body.len() - 1);

        let mut response = ResponseTemplate::new(206)
            .insert_header(
                "Content-Range",
                format!("bytes {}-{}/{}", first, last, self.body.len()).as_str(),
            )
            .set_body_bytes(self.body[first..=last].to_vec());

        // Probes (bytes=0-0) always answer immediately
        if range != "bytes=0-0" {
            match &self.delay {
                ChunkDelay::None => {}
                ChunkDelay::ReverseOrder {
                    chunk_size,
                    step_ms,
                } => {
                    let chunk_count = self.body.len().div_ceil(*chunk_size);
                    let index = first / chunk_size;
                    let delay_ms = (chunk_count - 1 - index) as u64 * step_ms;
                    response = response.set_delay(Duration::from_millis(delay_ms));
                }
                ChunkDelay::Fixed(delay) => {
                    response = response.set_delay(*delay);
                }
            }
        }

        response
    }
}

async fn run_download(
    url: &str,
    settings: DownloaderConfig,
) -> crate::error::Result<(Vec<u8>, crate::types::Metadata)> {
    let downloader = HttpDownloader::new(reqwest::Client::new(), url.to_string(), settings);
    let cancel = CancellationToken::new();
    let mut sink = Cursor::new(Vec::new());
    let metadata = downloader.download(&cancel, &mut sink).await?;
    Ok((sink.into_inner(), metadata))
}

#[tokio::test]
async fn sequential_download_when_origin_ignores_ranges() {
    let server = MockServer::start().await;
    let body = pattern(1024 * 1024);

    // Returns 200 with the whole body no matter what Range asks for
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let url = format!("{}/file.bin", server.uri());
    let (downloaded, metadata) = run_download(&url, DownloaderConfig::default())
        .await
        .unwrap();

    assert_eq!(downloaded, body);
    assert_eq!(
        metadata.get(METADATA_KEY_SIZE_BYTES).unwrap().as_u64(),
        Some(1024 * 1024)
    );
    assert!(metadata.contains_key(METADATA_KEY_DURATION_MS));
    assert!(metadata.contains_key(METADATA_KEY_CONTENT_TYPE));

    // The download GET itself must not carry a Range header; only the probe
    // (bytes=0-0) may
    let requests = server.received_requests().await.unwrap();
    let download_gets: Vec<_> = requests
        .iter()
        .filter(|r| r.method.as_str() == "GET" && !r.headers.contains_key("range"))
        .collect();
    assert_eq!(download_gets.len(), 1);
    for request in &requests {
        if let Some(range) = request.headers.get("range") {
            assert_eq!(range.to_str().unwrap(), "bytes=0-0");
        }
    }
}

#[tokio::test]
async fn small_file_with_range_support_downloads_sequentially() {
    let server = MockServer::start().await;
    let body = pattern(1000);

    Mock::given(method("GET"))
        .respond_with(RangeOrigin::new(body.clone()))
        .mount(&server)
        .await;

    let url = format!("{}/small.bin", server.uri());
    // Default threshold (5 MiB) far exceeds the 1000-byte body
    let (downloaded, _metadata) = run_download(&url, DownloaderConfig::default())
        .await
        .unwrap();
    assert_eq!(downloaded, body);

    let requests = server.received_requests().await.unwrap();
    for request in &requests {
        if let Some(range) = request.headers.get("range") {
            assert_eq!(range.to_str().unwrap(), "bytes=0-0");
        }
    }
}

#[tokio::test]
async fn parallel_download_reassembles_in_offset_order() {
    let server = MockServer::start().await;
    let body = pattern(10_000);

    Mock::given(method("GET"))
        .respond_with(RangeOrigin::new(body.clone()))
        .mount(&server)
        .await;

    let url = format!("{}/large.bin", server.uri());
    let (downloaded, metadata) = run_download(&url, settings(1024, 4, 2048)).await.unwrap();

    assert_eq!(downloaded, body);
    assert_eq!(metadata.get("total_size").unwrap().as_u64(), Some(10_000));
    assert_eq!(
        metadata.get("downloaded_bytes").unwrap().as_u64(),
        Some(10_000)
    );

    // ceil(10000 / 1024) = 10 ranged chunk requests besides the probe
    let requests = server.received_requests().await.unwrap();
    let chunk_requests = requests
        .iter()
        .filter(|r| {
            r.headers
                .get("range")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|range| range != "bytes=0-0")
        })
        .count();
    assert_eq!(chunk_requests, 10);
}

#[tokio::test]
async fn reverse_completion_order_still_writes_forward() {
    let server = MockServer::start().await;
    let body = pattern(8 * 512);

    Mock::given(method("GET"))
        .respond_with(RangeOrigin {
            body: body.clone(),
            delay: ChunkDelay::ReverseOrder {
                chunk_size: 512,
                step_ms: 40,
            },
        })
        .mount(&server)
        .await;

    let url = format!("{}/reversed.bin", server.uri());
    // All eight chunks in flight at once so completions arrive last-first
    let (downloaded, _metadata) = run_download(&url, settings(512, 8, 1024)).await.unwrap();
    assert_eq!(downloaded, body);
}

#[tokio::test]
async fn chunk_without_partial_content_aborts_the_download() {
    let server = MockServer::start().await;
    let body = pattern(4096);

    // Probe looks range-capable, but actual chunk requests come back 200
    Mock::given(method("GET"))
        .and(header("Range", "bytes=0-0"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", format!("bytes 0-0/{}", body.len()).as_str())
                .set_body_bytes(vec![body[0]]),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let url = format!("{}/liar.bin", server.uri());
    let err = run_download(&url, settings(1024, 4, 2048)).await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Download(DownloadError::UnexpectedChunkStatus { status: 200, .. })
        ),
        "got {err:?}"
    );
}

#[tokio::test]
async fn probe_failure_falls_back_to_sequential() {
    let server = MockServer::start().await;
    let body = pattern(2048);

    Mock::given(method("GET"))
        .and(header("Range", "bytes=0-0"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let url = format!("{}/flaky.bin", server.uri());
    let (downloaded, _metadata) = run_download(&url, settings(1024, 4, 2048)).await.unwrap();
    assert_eq!(downloaded, body);
}

#[tokio::test]
async fn cancellation_interrupts_a_slow_parallel_download() {
    let server = MockServer::start().await;
    let body = pattern(8 * 256);

    Mock::given(method("GET"))
        .respond_with(RangeOrigin {
            body: body.clone(),
            delay: ChunkDelay::Fixed(Duration::from_secs(10)),
        })
        .mount(&server)
        .await;

    let url = format!("{}/slow.bin", server.uri());
    let downloader = HttpDownloader::new(reqwest::Client::new(), url, settings(256, 4, 512));

    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        let mut sink = Cursor::new(Vec::new());
        downloader.download(&task_cancel, &mut sink).await.map(|_| ())
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    // Outstanding fetches must unwind promptly, not after the 10s delay
    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("download did not honor cancellation")
        .unwrap();
    assert!(result.is_err());
}

#[tokio::test]
async fn probe_reports_range_support_and_size() {
    let server = MockServer::start().await;
    let body = pattern(12345);
    Mock::given(method("GET"))
        .respond_with(RangeOrigin::new(body))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let support = detect_range_and_size(&client, &format!("{}/f", server.uri()))
        .await
        .unwrap();
    assert_eq!(
        support,
        RangeSupport {
            supports_range: true,
            total_size: 12345
        }
    );
}

#[tokio::test]
async fn probe_falls_back_to_head_on_mangled_content_range() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("Range", "bytes=0-0"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "bytes garbage")
                .set_body_bytes(vec![0u8]),
        )
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Length", "5555"))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let support = detect_range_and_size(&client, &format!("{}/f", server.uri()))
        .await
        .unwrap();
    assert_eq!(
        support,
        RangeSupport {
            supports_range: true,
            total_size: 5555
        }
    );
}

#[tokio::test]
async fn probe_handles_unsatisfiable_range() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("Range", "bytes=0-0"))
        .respond_with(
            ResponseTemplate::new(416).insert_header("Content-Range", "bytes */777"),
        )
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let support = detect_range_and_size(&client, &format!("{}/f", server.uri()))
        .await
        .unwrap();
    assert_eq!(
        support,
        RangeSupport {
            supports_range: true,
            total_size: 777
        }
    );
}

#[tokio::test]
async fn probe_classifies_plain_200_as_no_range_support() {
    let server = MockServer::start().await;
    let body = pattern(4096);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let support = detect_range_and_size(&client, &format!("{}/f", server.uri()))
        .await
        .unwrap();
    assert!(!support.supports_range);
    assert_eq!(support.total_size, 4096);
}

#[tokio::test]
async fn probe_errors_when_nothing_can_be_learned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let err = detect_range_and_size(&client, &format!("{}/f", server.uri()))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Download(DownloadError::ProbeFailed { status: 403 })
        ),
        "got {err:?}"
    );
}
