//! ICY "now playing" retrieval.
//!
//! One fetch = one GET with `Icy-MetaData: 1`, skip `icy-metaint` bytes of
//! audio, read the length byte, read `16 * len` bytes of metadata and pull
//! `StreamTitle` out of it.
//!
//! Broadcasters do not escape anything inside the title, and some quote with
//! `'` while others use `"`, so the parser takes the quote character from
//! the data and settles for a best-effort title when the closing `<quote>;`
//! never shows up.

use futures_util::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::Client;
use tracing::debug;

use crate::config::{HttpConfig, StreamConfig};
use crate::error::{FetchError, Result};

/// Title reported when the metadata block carries no `StreamTitle` tag.
pub const NOT_FOUND: &str = "<NOT_FOUND>";

const STREAM_TITLE_TAG: &str = "StreamTitle=";

/// Largest `icy-metaint` accepted; real servers use 8k to 64k.
const MAX_METAINT: usize = 256_000;

/// Outcome of scanning a metadata block for the stream title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleScan {
    NotFound,
    /// Value found between the opening quote and `<quote>;`.
    Terminated(String),
    /// No closing `<quote>;`: everything after the opening quote.
    Unterminated(String),
}

impl TitleScan {
    pub fn into_title(self) -> String {
        match self {
            Self::NotFound => NOT_FOUND.to_string(),
            Self::Terminated(title) | Self::Unterminated(title) => title,
        }
    }
}

/// Strip the NUL padding, decode as UTF-8 and scan for `StreamTitle`.
pub fn parse_title(block: &[u8]) -> Result<TitleScan> {
    let end = block
        .iter()
        .rposition(|&b| b != 0)
        .map(|p| p + 1)
        .unwrap_or(0);
    let text = String::from_utf8(block[..end].to_vec())?;
    Ok(scan_title(&text))
}

pub fn scan_title(text: &str) -> TitleScan {
    let Some(tag_at) = text.find(STREAM_TITLE_TAG) else {
        return TitleScan::NotFound;
    };

    let mut rest = text[tag_at + STREAM_TITLE_TAG.len()..].chars();
    let Some(quote) = rest.next() else {
        return TitleScan::Unterminated(String::new());
    };
    let value = rest.as_str();

    let closing = format!("{quote};");
    match value.find(&closing) {
        Some(end) => TitleScan::Terminated(value[..end].to_string()),
        None => TitleScan::Unterminated(value.to_string()),
    }
}

/// Read `icy-metaint`, rejecting absent, non-numeric and out-of-range values.
pub fn parse_metaint(headers: &HeaderMap) -> Result<usize> {
    headers
        .get("icy-metaint")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| (1..=MAX_METAINT).contains(n))
        .ok_or_else(|| FetchError::protocol("missing or invalid icy-metaint"))
}

/// Consume a chunked body up to and including the first metadata block.
///
/// Skips exactly `metaint` audio bytes, reads the length byte and returns the
/// `16 * len` metadata bytes (empty when `len == 0`). Chunk boundaries may
/// fall anywhere, including inside the block.
pub async fn read_metadata_block<S, B, E>(stream: &mut S, metaint: usize) -> Result<Vec<u8>>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<FetchError>,
{
    let mut to_skip = metaint;
    let mut block_len: Option<usize> = None;
    let mut block = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        let mut bytes = chunk.as_ref();

        if to_skip > 0 {
            let n = to_skip.min(bytes.len());
            to_skip -= n;
            bytes = &bytes[n..];
            if to_skip > 0 {
                continue;
            }
        }

        let want = match block_len {
            Some(want) => want,
            None => {
                let Some((&len_byte, tail)) = bytes.split_first() else {
                    continue;
                };
                bytes = tail;
                let want = 16 * usize::from(len_byte);
                block_len = Some(want);
                want
            }
        };

        let take = (want - block.len()).min(bytes.len());
        block.extend_from_slice(&bytes[..take]);
        if block.len() == want {
            return Ok(block);
        }
    }

    Err(match block_len {
        None => FetchError::protocol("stream ended before metadata length byte"),
        Some(want) => FetchError::protocol(format!(
            "stream ended inside metadata block ({} of {} bytes)",
            block.len(),
            want
        )),
    })
}

/// HTTP side of the title fetch. Holds one `reqwest::Client` so connections
/// and TLS sessions are reused between polls.
#[derive(Debug, Clone)]
pub struct IcyFetcher {
    client: Client,
}

impl IcyFetcher {
    pub fn new(http: &HttpConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(http.user_agent.as_str())
            // Icecast mounts frequently redirect to a relay
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(http.connect_timeout())
            .timeout(http.request_timeout())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch_title(&self, config: &StreamConfig) -> Result<String> {
        debug!("[icy] GET {}", config.url);
        let resp = self
            .client
            .get(&config.url)
            .header("Icy-MetaData", "1")
            .send()
            .await?
            .error_for_status()?;

        let metaint = parse_metaint(resp.headers())?;
        debug!("[icy] icy-metaint={}", metaint);

        let body = resp.bytes_stream();
        futures_util::pin_mut!(body);
        let block = read_metadata_block(&mut body, metaint).await?;

        let scan = parse_title(&block)?;
        if let TitleScan::Unterminated(partial) = &scan {
            debug!("[icy] unterminated StreamTitle, keeping {:?}", partial);
        }
        Ok(scan.into_title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn padded(meta: &str) -> Vec<u8> {
        let mut block = meta.as_bytes().to_vec();
        block.resize(block.len().div_ceil(16) * 16, 0);
        block
    }

    fn chunks(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>>> + Unpin {
        futures_util::stream::iter(parts.into_iter().map(Ok))
    }

    #[test]
    fn test_double_quoted_title() {
        let scan = parse_title(&padded("StreamTitle=\"Steve Reich - Music for 18\";")).unwrap();
        assert_eq!(scan, TitleScan::Terminated("Steve Reich - Music for 18".into()));
    }

    #[test]
    fn test_single_quote_read_from_data() {
        let scan = parse_title(&padded("StreamTitle='Arvo Pärt - Fratres';StreamUrl='';")).unwrap();
        assert_eq!(scan.into_title(), "Arvo Pärt - Fratres");
    }

    #[test]
    fn test_other_quote_kind_does_not_close() {
        // Opened with ', so "; is part of the title
        let scan = scan_title("StreamTitle='Say \"hi\"; bye';");
        assert_eq!(scan, TitleScan::Terminated("Say \"hi\"; bye".into()));
    }

    #[test]
    fn test_missing_tag_is_sentinel() {
        let scan = parse_title(&padded("StreamUrl='http://example.com';")).unwrap();
        assert_eq!(scan, TitleScan::NotFound);
        assert_eq!(scan.into_title(), NOT_FOUND);
    }

    #[test]
    fn test_empty_block_is_sentinel() {
        assert_eq!(parse_title(&[]).unwrap(), TitleScan::NotFound);
        assert_eq!(parse_title(&[0; 32]).unwrap(), TitleScan::NotFound);
    }

    #[test]
    fn test_unterminated_title_is_best_effort() {
        let scan = parse_title(&padded("StreamTitle=\"Unterminated")).unwrap();
        assert_eq!(scan, TitleScan::Unterminated("Unterminated".into()));
        assert_eq!(scan.into_title(), "Unterminated");
    }

    #[test]
    fn test_tag_at_end_of_block() {
        assert_eq!(scan_title("StreamTitle="), TitleScan::Unterminated(String::new()));
    }

    #[test]
    fn test_closing_searched_after_opening_quote() {
        // A `';` before the tag must not be taken as the terminator
        let scan = scan_title("StreamUrl='x';StreamTitle='Late';");
        assert_eq!(scan, TitleScan::Terminated("Late".into()));
    }

    #[test]
    fn test_empty_title() {
        assert_eq!(scan_title("StreamTitle='';"), TitleScan::Terminated(String::new()));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let err = parse_title(b"StreamTitle='\xff\xfe';").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_parse_metaint() {
        let mut headers = HeaderMap::new();
        assert!(matches!(parse_metaint(&headers), Err(FetchError::Protocol(_))));

        headers.insert("icy-metaint", HeaderValue::from_static("16000"));
        assert_eq!(parse_metaint(&headers).unwrap(), 16000);

        headers.insert("icy-metaint", HeaderValue::from_static("abc"));
        let err = parse_metaint(&headers).unwrap_err();
        assert_eq!(err.to_string(), "protocol error: missing or invalid icy-metaint");

        headers.insert("icy-metaint", HeaderValue::from_static("0"));
        assert!(parse_metaint(&headers).is_err());

        headers.insert("icy-metaint", HeaderValue::from_static("999999"));
        assert!(parse_metaint(&headers).is_err());
    }

    #[tokio::test]
    async fn test_block_read_across_chunk_boundaries() {
        let meta = padded("StreamTitle='Split';");
        let mut body = vec![0xAA; 10];
        body.push((meta.len() / 16) as u8);
        body.extend_from_slice(&meta);
        body.extend_from_slice(&[0xBB; 40]);

        // One byte per chunk is the worst case for the state machine
        let parts = body.iter().map(|b| vec![*b]).collect();
        let block = read_metadata_block(&mut chunks(parts), 10).await.unwrap();
        assert_eq!(block, meta);
        assert_eq!(parse_title(&block).unwrap().into_title(), "Split");
    }

    #[tokio::test]
    async fn test_block_read_single_chunk() {
        let meta = padded("StreamTitle=\"One\";");
        let mut body = vec![1, 2, 3, 4];
        body.push((meta.len() / 16) as u8);
        body.extend_from_slice(&meta);

        let block = read_metadata_block(&mut chunks(vec![body]), 4).await.unwrap();
        assert_eq!(block, meta);
    }

    #[tokio::test]
    async fn test_zero_length_block() {
        let block = read_metadata_block(&mut chunks(vec![vec![7; 8], vec![0, 9, 9]]), 8)
            .await
            .unwrap();
        assert!(block.is_empty());
    }

    #[tokio::test]
    async fn test_stream_ends_before_length_byte() {
        let err = read_metadata_block(&mut chunks(vec![vec![0; 5]]), 8)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::protocol("stream ended before metadata length byte")
        );
    }

    #[tokio::test]
    async fn test_stream_ends_inside_block() {
        let err = read_metadata_block(&mut chunks(vec![vec![0; 4], vec![2], vec![b'S'; 10]]), 4)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::protocol("stream ended inside metadata block (10 of 32 bytes)")
        );
    }

    #[tokio::test]
    async fn test_chunk_error_propagates() {
        let parts: Vec<Result<Vec<u8>>> = vec![
            Ok(vec![0; 2]),
            Err(FetchError::Network("connection reset".into())),
        ];
        let err = read_metadata_block(&mut futures_util::stream::iter(parts), 4)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Network("connection reset".into()));
    }
}
