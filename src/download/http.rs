//! Sequential and parallel HTTP download strategies.

use crate::config::DownloaderConfig;
use crate::error::{DownloadError, Error, Result};
use crate::types::Metadata;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{
    detect_range_and_size, Downloader, METADATA_KEY_CONTENT_TYPE, METADATA_KEY_DURATION_MS,
    METADATA_KEY_SIZE_BYTES,
};

/// Downloads one HTTP(S) URL
pub struct HttpDownloader {
    client: reqwest::Client,
    url: String,
    settings: DownloaderConfig,
}

impl HttpDownloader {
    /// Create a downloader for `url` using the shared client
    pub fn new(client: reqwest::Client, url: String, settings: DownloaderConfig) -> Self {
        Self {
            client,
            url,
            settings,
        }
    }

    /// Plain GET streamed to the writer.
    async fn sequential_download(
        &self,
        cancel: &CancellationToken,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<Metadata> {
        let start = Instant::now();

        let response = tokio::select! {
            response = self.client.get(&self.url).send() => response?,
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled.into()),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::OriginStatus {
                status: status.as_u16(),
            }
            .into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                _ = cancel.cancelled() => return Err(DownloadError::Cancelled.into()),
            };
            match chunk {
                Some(chunk) => {
                    let chunk = chunk?;
                    writer.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                None => break,
            }
        }
        writer.flush().await?;

        let elapsed = start.elapsed();
        tracing::info!(
            url = %self.url,
            bytes = written,
            duration_ms = elapsed.as_millis() as u64,
            "sequential download completed"
        );

        let mut metadata = Metadata::new();
        metadata.insert(METADATA_KEY_CONTENT_TYPE.to_string(), content_type.into());
        metadata.insert(
            METADATA_KEY_DURATION_MS.to_string(),
            (elapsed.as_millis() as u64).into(),
        );
        metadata.insert(METADATA_KEY_SIZE_BYTES.to_string(), written.into());
        Ok(metadata)
    }

    /// Ranged chunks fetched by a worker pool, written in offset order.
    async fn parallel_download(
        &self,
        cancel: &CancellationToken,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        total_size: i64,
    ) -> Result<Metadata> {
        let start = Instant::now();
        let total_size = total_size as u64;
        let chunk_size = self.settings.chunk_size_bytes;
        let chunk_count = total_size.div_ceil(chunk_size) as usize;
        let workers = self.settings.workers.min(chunk_count).max(1);

        tracing::info!(
            url = %self.url,
            total_size,
            chunks = chunk_count,
            workers,
            "starting parallel range download"
        );

        // Cancelling this token (caller cancellation or first error) makes
        // every outstanding fetch return promptly
        let abort = cancel.child_token();

        // Preloaded queue of chunk indices; workers share the receiving end
        let (job_tx, job_rx) = mpsc::channel::<usize>(chunk_count);
        for index in 0..chunk_count {
            // Capacity equals the chunk count, so this never waits
            job_tx
                .send(index)
                .await
                .map_err(|_| Error::Internal("chunk queue closed prematurely".to_string()))?;
        }
        drop(job_tx);
        let jobs = Arc::new(Mutex::new(job_rx));

        // Bounded by the worker count: a fetcher parks here until the
        // reassembler has drained its previous chunk
        let (result_tx, mut result_rx) = mpsc::channel::<Result<(usize, Bytes)>>(workers);

        let mut worker_handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let client = self.client.clone();
            let url = self.url.clone();
            let jobs = jobs.clone();
            let result_tx = result_tx.clone();
            let abort = abort.clone();

            worker_handles.push(tokio::spawn(async move {
                loop {
                    let index = {
                        let mut jobs = jobs.lock().await;
                        jobs.recv().await
                    };
                    let Some(index) = index else { break };

                    let first_byte = index as u64 * chunk_size;
                    let last_byte = (first_byte + chunk_size - 1).min(total_size - 1);

                    match fetch_chunk(&client, &url, index, first_byte, last_byte, &abort).await {
                        Ok(bytes) => {
                            if result_tx.send(Ok((index, bytes))).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            abort.cancel();
                            let _ = result_tx.send(Err(e)).await;
                            break;
                        }
                    }
                }
            }));
        }
        // Workers hold the only remaining senders; the channel closes once
        // they have all finished
        drop(result_tx);

        // Single reassembler: buffer out-of-order chunks, emit in offset order
        let mut pending: HashMap<usize, Bytes> = HashMap::new();
        let mut next_index = 0usize;
        let mut downloaded: u64 = 0;
        let mut first_error: Option<Error> = None;

        while let Some(result) = result_rx.recv().await {
            match result {
                Ok((index, bytes)) => {
                    pending.insert(index, bytes);
                    while let Some(chunk) = pending.remove(&next_index) {
                        if let Err(e) = writer.write_all(&chunk).await {
                            first_error = Some(e.into());
                            break;
                        }
                        downloaded += chunk.len() as u64;
                        next_index += 1;
                    }
                    if first_error.is_some() {
                        break;
                    }
                }
                Err(e) => {
                    first_error = Some(e);
                    break;
                }
            }
        }

        if first_error.is_some() {
            abort.cancel();
        }
        // Dropping the receiver unblocks any fetcher parked on a full
        // results channel; only then is joining the workers safe
        drop(result_rx);
        for handle in worker_handles {
            let _ = handle.await;
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if next_index != chunk_count {
            return Err(Error::Internal(format!(
                "parallel download ended early: wrote {} of {} chunks",
                next_index, chunk_count
            )));
        }
        writer.flush().await?;

        let elapsed = start.elapsed();
        tracing::info!(
            url = %self.url,
            bytes = downloaded,
            duration_ms = elapsed.as_millis() as u64,
            "parallel download completed"
        );

        let mut metadata = Metadata::new();
        metadata.insert("total_size".to_string(), total_size.into());
        metadata.insert("downloaded_bytes".to_string(), downloaded.into());
        metadata.insert(
            "duration_ms".to_string(),
            (elapsed.as_millis() as u64).into(),
        );
        metadata.insert(
            "content_type".to_string(),
            "application/octet-stream".into(),
        );
        Ok(metadata)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        cancel: &CancellationToken,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<Metadata> {
        let support = tokio::select! {
            support = detect_range_and_size(&self.client, &self.url) => support,
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled.into()),
        };

        let support = match support {
            Ok(support) => support,
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "range probe failed, falling back to sequential");
                return self.sequential_download(cancel, writer).await;
            }
        };

        tracing::debug!(
            url = %self.url,
            supports_range = support.supports_range,
            total_size = support.total_size,
            "range probe"
        );

        if !support.supports_range || support.total_size <= 0 {
            return self.sequential_download(cancel, writer).await;
        }
        if (support.total_size as u64) < self.settings.parallel_threshold_bytes {
            return self.sequential_download(cancel, writer).await;
        }

        self.parallel_download(cancel, writer, support.total_size)
            .await
    }
}

/// Fetch one chunk; anything but 206 Partial Content is an error.
async fn fetch_chunk(
    client: &reqwest::Client,
    url: &str,
    index: usize,
    first_byte: u64,
    last_byte: u64,
    abort: &CancellationToken,
) -> Result<Bytes> {
    let request = client
        .get(url)
        .header(RANGE, format!("bytes={}-{}", first_byte, last_byte));

    let response = tokio::select! {
        response = request.send() => response?,
        _ = abort.cancelled() => return Err(DownloadError::Cancelled.into()),
    };

    if response.status() != StatusCode::PARTIAL_CONTENT {
        return Err(DownloadError::UnexpectedChunkStatus {
            index,
            status: response.status().as_u16(),
        }
        .into());
    }

    let bytes = tokio::select! {
        bytes = response.bytes() => bytes?,
        _ = abort.cancelled() => return Err(DownloadError::Cancelled.into()),
    };
    Ok(bytes)
}
