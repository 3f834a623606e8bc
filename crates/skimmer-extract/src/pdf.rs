//! PDF extraction via an external `pdftotext` tool.
//!
//! The body is streamed straight into the tool's stdin, prefixed by the
//! bytes already consumed for content sniffing, so the document never
//! has to fit in memory twice.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::USER_AGENT;
use skimmer_fetch::random_desktop_user_agent;
use skimmer_types::{truncate_to_chars, ExtractError, SourceData};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

/// Maximum accepted PDF size.
pub const PDF_SIZE_CAP: u64 = 20 * 1024 * 1024;

const SNIFF_LEN: usize = 512;
const PDFTOTEXT_BIN: &str = "pdftotext";

/// What the first bytes of a body look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffedType {
    Pdf,
    Html,
    Zip,
    Png,
    Jpeg,
    Unknown,
}

impl SniffedType {
    fn name(self) -> &'static str {
        match self {
            SniffedType::Pdf => "pdf",
            SniffedType::Html => "html",
            SniffedType::Zip => "zip",
            SniffedType::Png => "png",
            SniffedType::Jpeg => "jpeg",
            SniffedType::Unknown => "unknown",
        }
    }
}

/// Sniff a body prefix for well-known signatures.
pub fn sniff(prefix: &[u8]) -> SniffedType {
    if prefix.starts_with(b"%PDF-") {
        return SniffedType::Pdf;
    }
    if prefix.starts_with(b"PK\x03\x04") {
        return SniffedType::Zip;
    }
    if prefix.starts_with(b"\x89PNG") {
        return SniffedType::Png;
    }
    if prefix.starts_with(b"\xff\xd8\xff") {
        return SniffedType::Jpeg;
    }
    let head = String::from_utf8_lossy(prefix).to_ascii_lowercase();
    let trimmed = head.trim_start();
    if trimmed.starts_with("<!doctype html")
        || trimmed.starts_with("<html")
        || head.contains("<head")
        || head.contains("<body")
    {
        return SniffedType::Html;
    }
    SniffedType::Unknown
}

/// Fetches PDFs and extracts their text.
pub struct PdfAdapter {
    client: reqwest::Client,
}

impl PdfAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn extract(
        &self,
        url: &str,
        max_chars: Option<usize>,
    ) -> Result<SourceData, ExtractError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, random_desktop_user_agent())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::UpstreamStatus {
                status: status.as_u16(),
                message: format!("fetching {}", url),
            });
        }

        if let Some(length) = response.content_length() {
            if length > PDF_SIZE_CAP {
                return Err(ExtractError::TooLarge {
                    size: length,
                    limit: PDF_SIZE_CAP,
                });
            }
        }

        let mut stream = response.bytes_stream();

        // Accumulate enough of the body to sniff the content type.
        let mut prefix: Vec<u8> = Vec::with_capacity(SNIFF_LEN);
        while prefix.len() < SNIFF_LEN {
            match stream.next().await {
                Some(chunk) => prefix.extend_from_slice(&chunk.map_err(ExtractError::from)?),
                None => break,
            }
        }

        let sniffed = sniff(&prefix);
        if sniffed != SniffedType::Pdf {
            debug!(url = %url, detected = sniffed.name(), "body is not a pdf");
            return Err(ExtractError::NotPdf {
                detected: sniffed.name().to_string(),
            });
        }

        let mut text = run_pdftotext(Bytes::from(prefix), stream).await?;

        if let Some(cap) = max_chars {
            truncate_to_chars(&mut text, cap);
        }

        Ok(SourceData::Pdf { text_content: text })
    }
}

/// Pipe the sniffed prefix plus the remaining body through
/// `pdftotext - -`, reading stdout concurrently to avoid pipe
/// deadlock on large documents.
async fn run_pdftotext(
    prefix: Bytes,
    mut rest: impl futures::Stream<Item = reqwest::Result<Bytes>> + Unpin,
) -> Result<String, ExtractError> {
    let mut child = Command::new(PDFTOTEXT_BIN)
        .args(["-", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ExtractError::Tool(format!("{} unavailable: {}", PDFTOTEXT_BIN, e)))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ExtractError::Tool("pdftotext stdin unavailable".to_string()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExtractError::Tool("pdftotext stdout unavailable".to_string()))?;

    let reader = tokio::spawn(async move {
        let mut out = String::new();
        stdout.read_to_string(&mut out).await.map(|_| out)
    });

    let write_result: Result<(), ExtractError> = async {
        let mut written = prefix.len() as u64;
        stdin
            .write_all(&prefix)
            .await
            .map_err(|e| ExtractError::Tool(format!("writing to pdftotext: {}", e)))?;
        while let Some(chunk) = rest.next().await {
            let chunk = chunk.map_err(ExtractError::from)?;
            written += chunk.len() as u64;
            if written > PDF_SIZE_CAP {
                return Err(ExtractError::TooLarge {
                    size: written,
                    limit: PDF_SIZE_CAP,
                });
            }
            stdin
                .write_all(&chunk)
                .await
                .map_err(|e| ExtractError::Tool(format!("writing to pdftotext: {}", e)))?;
        }
        stdin
            .shutdown()
            .await
            .map_err(|e| ExtractError::Tool(format!("closing pdftotext stdin: {}", e)))?;
        Ok(())
    }
    .await;
    // Ensure stdin is closed even on error so the child terminates.
    drop(stdin);

    let output = reader
        .await
        .map_err(|e| ExtractError::Tool(format!("pdftotext reader task: {}", e)))?
        .map_err(|e| ExtractError::Tool(format!("reading pdftotext output: {}", e)))?;

    let status = child
        .wait()
        .await
        .map_err(|e| ExtractError::Tool(format!("waiting for pdftotext: {}", e)))?;

    write_result?;

    if !status.success() {
        return Err(ExtractError::Tool(format!(
            "pdftotext exited with {}",
            status
        )));
    }

    Ok(output.trim().to_string())
}
