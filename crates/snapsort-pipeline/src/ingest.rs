//! Item ingestion: decode raw uploads into an ordered batch of items.
//!
//! Validation happens before anything else so an invalid batch never
//! reaches the inference service. HEIC items are handed to the injected
//! transcoder; a failed conversion passes the original through.

use std::sync::Arc;

use base64::Engine;
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use snapsort_core::defaults::MAX_BATCH_SIZE;
use snapsort_core::media::with_extension;
use snapsort_core::{detect_media_type, is_heic, Error, ImageTranscoder, Item, Result};

/// Error message for an empty batch.
pub const NO_IMAGES_MESSAGE: &str = "No images provided";

/// One image as received from the caller, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawImage {
    /// A multipart file part.
    File {
        data: Vec<u8>,
        content_type: Option<String>,
        filename: Option<String>,
    },
    /// A self-describing payload: `data:<mime>;base64,<data>` or bare base64.
    Encoded(String),
}

impl RawImage {
    pub fn file(data: Vec<u8>, content_type: Option<String>, filename: Option<String>) -> Self {
        Self::File {
            data,
            content_type,
            filename,
        }
    }

    pub fn encoded(payload: impl Into<String>) -> Self {
        Self::Encoded(payload.into())
    }
}

/// Fail unless `count` is within `[1, MAX_BATCH_SIZE]`.
pub fn validate_batch_size(count: usize) -> Result<()> {
    if count == 0 {
        return Err(Error::InvalidInput(NO_IMAGES_MESSAGE.to_string()));
    }
    if count > MAX_BATCH_SIZE {
        return Err(Error::InvalidInput(format!(
            "Maximum {} images allowed per request",
            MAX_BATCH_SIZE
        )));
    }
    Ok(())
}

/// Decode a self-describing payload into bytes and its declared media type.
///
/// Accepts `data:<mime>;base64,<data>` URIs and bare base64 strings
/// (whitespace ignored). The declared type is `None` for bare base64.
pub fn decode_payload(payload: &str) -> Result<(Vec<u8>, Option<String>)> {
    let payload = payload.trim();

    let (declared, encoded) = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest.split_once(',').ok_or_else(|| {
                Error::InvalidInput("Malformed data URI: missing ',' separator".to_string())
            })?;
            let mut params = header.split(';');
            let mime = params.next().unwrap_or_default().trim();
            if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                return Err(Error::InvalidInput(
                    "Only base64-encoded data URIs are supported".to_string(),
                ));
            }
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            (mime, body)
        }
        None => (None, payload),
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(Error::InvalidInput("Image payload is empty".to_string()));
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::InvalidInput(format!("Invalid base64 image payload: {}", e)))?;
    if data.is_empty() {
        return Err(Error::InvalidInput("Image payload is empty".to_string()));
    }

    Ok((data, declared))
}

/// Turns raw uploads into items.
pub struct Ingestor {
    transcoder: Arc<dyn ImageTranscoder>,
}

impl Ingestor {
    pub fn new(transcoder: Arc<dyn ImageTranscoder>) -> Self {
        Self { transcoder }
    }

    /// Validate, decode, and normalize a batch.
    ///
    /// Item indices follow the order of `raw`.
    #[instrument(skip(self, raw), fields(subsystem = "pipeline", component = "ingest", op = "ingest", batch_size = raw.len()))]
    pub async fn ingest(&self, raw: Vec<RawImage>) -> Result<Vec<Item>> {
        validate_batch_size(raw.len())?;

        let decoded = raw
            .into_iter()
            .enumerate()
            .map(|(index, image)| decode_item(index, image))
            .collect::<Result<Vec<_>>>()?;

        let items = join_all(decoded.into_iter().map(|item| self.normalize(item))).await;
        debug!(count = items.len(), "Batch ingested");
        Ok(items)
    }

    /// Convert HEIC items to JPEG; anything else passes through.
    async fn normalize(&self, item: Item) -> Item {
        if !is_heic(&item.media_type, item.original_name.as_deref()) {
            return item;
        }

        match self.transcoder.to_jpeg(&item.data, &item.media_type).await {
            Ok(jpeg) => {
                debug!(
                    item_index = item.index,
                    from = %item.media_type,
                    image_bytes = jpeg.len(),
                    "Converted HEIC to JPEG"
                );
                Item {
                    data: jpeg,
                    media_type: "image/jpeg".to_string(),
                    original_name: item.original_name.map(|n| with_extension(&n, "jpg")),
                    ..item
                }
            }
            Err(e) => {
                warn!(
                    item_index = item.index,
                    transcoder = self.transcoder.name(),
                    error = %e,
                    fallback = true,
                    "HEIC conversion failed, passing original through"
                );
                item
            }
        }
    }
}

fn decode_item(index: usize, image: RawImage) -> Result<Item> {
    match image {
        RawImage::File {
            data,
            content_type,
            filename,
        } => {
            if data.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Image {} is empty",
                    index + 1
                )));
            }
            let media_type = detect_media_type(filename.as_deref(), &data, content_type.as_deref());
            Ok(Item::new(index, data, media_type, filename))
        }
        RawImage::Encoded(payload) => {
            let (data, declared) = decode_payload(&payload)
                .map_err(|e| match e {
                    Error::InvalidInput(msg) => {
                        Error::InvalidInput(format!("Image {}: {}", index + 1, msg))
                    }
                    other => other,
                })?;
            let media_type = detect_media_type(None, &data, declared.as_deref());
            Ok(Item::new(index, data, media_type, None))
        }
    }
}
