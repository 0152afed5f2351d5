//! Image encoding: rendered page file → base64 `ImageData`.
//!
//! VLM APIs accept images as base64 data embedded in the JSON request body.
//! `detail: "high"` lets GPT-4-class models tile the image instead of
//! reading a single downscaled overview, which matters for small print.

use crate::pipeline::render::RenderedPage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// Read a rendered page from disk and wrap it for the VLM API.
pub async fn encode_page(page: &RenderedPage) -> std::io::Result<ImageData> {
    let bytes = tokio::fs::read(&page.path).await?;
    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded page {} → {} bytes base64", page.page, b64.len());

    Ok(ImageData::new(b64, page.format.mime_type()).with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::ImageFormat;

    #[tokio::test]
    async fn encode_file_roundtrips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page-0001.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();

        let page = RenderedPage {
            page: 1,
            path,
            format: ImageFormat::Png,
        };
        let data = encode_page(&page).await.expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let page = RenderedPage {
            page: 2,
            path: "/nonexistent/page-0002.png".into(),
            format: ImageFormat::Jpeg,
        };
        assert!(encode_page(&page).await.is_err());
    }
}
