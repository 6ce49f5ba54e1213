//! S3-compatible blob store.
//!
//! `write` hands the caller the write end of an in-process pipe while a
//! background task drives a multipart streaming upload from the read end, so
//! the whole blob is never buffered in memory. An upload failure drops the
//! read end (the writer's next write fails with a pipe error) and the real
//! cause surfaces when the writer is shut down.

use crate::config::DownloadConfig;
use crate::error::{Error, Result, StorageError};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncReadExt, AsyncWrite, DuplexStream};
use tokio::task::JoinHandle;

use super::{BlobReader, BlobWriter, FileStore};

/// Upload part size. S3 requires every part except the last to be at least
/// 5 MiB.
const PART_SIZE: usize = 8 * 1024 * 1024;

/// In-process pipe buffer between the writer and the uploader task
const PIPE_BUFFER: usize = 256 * 1024;

/// Stores blobs in an S3-compatible bucket
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client for the configured bucket
    ///
    /// Path-style addressing is forced so bucket names don't have to resolve
    /// as DNS labels on self-hosted endpoints.
    pub fn new(config: &DownloadConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "fetchd-config",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true);

        if !config.endpoint.is_empty() {
            builder = builder.endpoint_url(config.endpoint.clone());
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl FileStore for S3Store {
    async fn write(&self, path: &str) -> Result<BlobWriter> {
        let (pipe_writer, pipe_reader) = tokio::io::duplex(PIPE_BUFFER);

        let upload = tokio::spawn(upload_multipart(
            self.client.clone(),
            self.bucket.clone(),
            path.to_string(),
            pipe_reader,
        ));

        Ok(Box::new(S3Writer {
            pipe: pipe_writer,
            upload: Some(upload),
        }))
    }

    async fn read(&self, path: &str) -> Result<BlobReader> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::Open {
                path: path.to_string(),
                message: DisplayErrorContext(e).to_string(),
            })?;

        Ok(Box::new(Box::pin(object.body.into_async_read())))
    }
}

/// Write end of the upload pipe; shutdown joins the uploader task so its
/// outcome becomes the close result.
struct S3Writer {
    pipe: DuplexStream,
    upload: Option<JoinHandle<Result<()>>>,
}

impl AsyncWrite for S3Writer {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.pipe).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.pipe).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        // Signal EOF to the uploader, then surface its result
        ready!(Pin::new(&mut self.pipe).poll_shutdown(cx))?;

        let Some(upload) = self.upload.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        let result = ready!(Pin::new(upload).poll(cx));
        self.upload = None;

        Poll::Ready(match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(std::io::Error::other(e.to_string())),
            Err(join_err) => Err(std::io::Error::other(join_err)),
        })
    }
}

fn upload_error(path: &str, message: impl std::fmt::Display) -> Error {
    Error::Storage(StorageError::Upload {
        path: path.to_string(),
        message: message.to_string(),
    })
}

/// Drive a multipart upload reading parts from the pipe until EOF.
async fn upload_multipart(
    client: Client,
    bucket: String,
    key: String,
    mut reader: DuplexStream,
) -> Result<()> {
    let created = client
        .create_multipart_upload()
        .bucket(&bucket)
        .key(&key)
        .content_type("application/octet-stream")
        .send()
        .await
        .map_err(|e| upload_error(&key, DisplayErrorContext(e)))?;

    let upload_id = created
        .upload_id()
        .map(str::to_string)
        .ok_or_else(|| upload_error(&key, "create_multipart_upload returned no upload id"))?;

    match stream_parts(&client, &bucket, &key, &upload_id, &mut reader).await {
        Ok(parts) => {
            client
                .complete_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder()
                        .set_parts(Some(parts))
                        .build(),
                )
                .send()
                .await
                .map_err(|e| upload_error(&key, DisplayErrorContext(e)))?;

            tracing::debug!(key = %key, "multipart upload completed");
            Ok(())
        }
        Err(e) => {
            if let Err(abort_err) = client
                .abort_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                tracing::warn!(
                    key = %key,
                    error = %DisplayErrorContext(abort_err),
                    "failed to abort multipart upload"
                );
            }
            Err(e)
        }
    }
}

/// Read PART_SIZE slabs from the pipe and upload them in order.
async fn stream_parts(
    client: &Client,
    bucket: &str,
    key: &str,
    upload_id: &str,
    reader: &mut DuplexStream,
) -> Result<Vec<CompletedPart>> {
    let mut parts = Vec::new();
    let mut part_number = 1i32;

    loop {
        let mut buf = vec![0u8; PART_SIZE];
        let mut filled = 0usize;
        let mut eof = false;

        while filled < PART_SIZE {
            let n = reader
                .read(&mut buf[filled..])
                .await
                .map_err(|e| upload_error(key, e))?;
            if n == 0 {
                eof = true;
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        // A zero-byte blob still needs one (empty) part for the upload to
        // be completable
        if filled > 0 || part_number == 1 {
            let uploaded = client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(buf))
                .send()
                .await
                .map_err(|e| upload_error(key, DisplayErrorContext(e)))?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(uploaded.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
            part_number += 1;
        }

        if eof {
            return Ok(parts);
        }
    }
}
