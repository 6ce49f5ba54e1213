//! Byte-range support probe.
//!
//! Learns whether an origin honors `Range` requests and, when possible, the
//! total size of the resource, using a one-byte ranged GET with a HEAD
//! fallback. Servers get this wrong in every imaginable way, so the dispatch
//! below is deliberately forgiving: the probe only errors when nothing at
//! all can be learned.

use crate::error::{DownloadError, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::StatusCode;

/// Outcome of a range probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSupport {
    /// Whether the origin honored the ranged request
    pub supports_range: bool,
    /// Total resource size in bytes, or -1 when unknown
    pub total_size: i64,
}

/// Probe `url` for range support and total size.
///
/// Issues `GET` with `Range: bytes=0-0` and dispatches on the status:
/// - 206: range supported; total parsed from `Content-Range`
/// - 416: range supported; total parsed from `Content-Range: bytes */<n>`
/// - 200: origin ignored the range; total from `Content-Length`
/// - anything else: HEAD fallback, otherwise an error carrying the status
pub async fn detect_range_and_size(
    client: &reqwest::Client,
    url: &str,
) -> Result<RangeSupport> {
    let response = client
        .get(url)
        .header(RANGE, "bytes=0-0")
        .send()
        .await?;

    let status = response.status();
    let content_range = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());
    // The probe body is at most one byte; dropping the response closes it
    drop(response);

    match status {
        StatusCode::PARTIAL_CONTENT => {
            if let Some(total) = content_range.as_deref().and_then(parse_total_from_content_range) {
                return Ok(RangeSupport {
                    supports_range: true,
                    total_size: total,
                });
            }
            // 206 with a missing or mangled Content-Range; ask HEAD instead
            let total = try_head_for_size(client, url).await.unwrap_or(-1);
            Ok(RangeSupport {
                supports_range: true,
                total_size: total,
            })
        }

        StatusCode::RANGE_NOT_SATISFIABLE => {
            // 416 still proves range support; servers answer it as
            // "bytes */<total>"
            if let Some(total) = content_range.as_deref().and_then(parse_total_from_content_range) {
                return Ok(RangeSupport {
                    supports_range: true,
                    total_size: total,
                });
            }
            let total = try_head_for_size(client, url).await.unwrap_or(-1);
            Ok(RangeSupport {
                supports_range: true,
                total_size: total,
            })
        }

        StatusCode::OK => {
            // Origin ignored the range header entirely
            if let Some(total) = content_length {
                return Ok(RangeSupport {
                    supports_range: false,
                    total_size: total,
                });
            }
            let total = try_head_for_size(client, url).await.unwrap_or(-1);
            Ok(RangeSupport {
                supports_range: false,
                total_size: total,
            })
        }

        other => {
            // Unexpected status; HEAD is the last resort before giving up
            if let Some(total) = try_head_for_size(client, url).await {
                return Ok(RangeSupport {
                    supports_range: false,
                    total_size: total,
                });
            }
            Err(DownloadError::ProbeFailed {
                status: other.as_u16(),
            }
            .into())
        }
    }
}

/// Parse the total from a `Content-Range` header.
///
/// Accepts the common forms:
/// - `bytes 0-0/12345`
/// - `bytes 0-10/104857600`
/// - `bytes */12345` (used with 416)
///
/// Returns `None` for `*` totals, negatives, and anything malformed.
fn parse_total_from_content_range(header: &str) -> Option<i64> {
    let header = header.trim();
    let mut fields = header.split_whitespace();
    let _unit = fields.next()?;
    let range_and_total = fields.collect::<Vec<_>>().join(" ");
    if range_and_total.is_empty() {
        return None;
    }

    let (_, total) = range_and_total.rsplit_once('/')?;
    let total = total.trim();
    if total.is_empty() || total == "*" {
        return None;
    }

    match total.parse::<i64>() {
        Ok(n) if n >= 0 => Some(n),
        _ => None,
    }
}

/// HEAD the URL and parse `Content-Length`, if the origin cooperates.
///
/// Error statuses are ignored: a 403 page's Content-Length is not the size
/// of the resource.
async fn try_head_for_size(client: &reqwest::Client, url: &str) -> Option<i64> {
    let response = client.head(url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response
        .headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<i64>()
        .ok()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ordinary_content_range() {
        assert_eq!(
            parse_total_from_content_range("bytes 0-0/12345"),
            Some(12345)
        );
        assert_eq!(
            parse_total_from_content_range("bytes 0-10/104857600"),
            Some(104857600)
        );
    }

    #[test]
    fn parses_unsatisfied_range_form() {
        assert_eq!(parse_total_from_content_range("bytes */12345"), Some(12345));
    }

    #[test]
    fn tolerates_extra_whitespace() {
        assert_eq!(
            parse_total_from_content_range("  bytes   0-0/777  "),
            Some(777)
        );
    }

    #[test]
    fn rejects_unknown_total() {
        assert_eq!(parse_total_from_content_range("bytes 0-0/*"), None);
        assert_eq!(parse_total_from_content_range("bytes */*"), None);
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(parse_total_from_content_range(""), None);
        assert_eq!(parse_total_from_content_range("bytes"), None);
        assert_eq!(parse_total_from_content_range("bytes 0-0"), None);
        assert_eq!(parse_total_from_content_range("bytes 0-0/"), None);
        assert_eq!(parse_total_from_content_range("bytes 0-0/-5"), None);
        assert_eq!(parse_total_from_content_range("bytes 0-0/abc"), None);
    }
}
