//! Decoding an artifact and comparing the payload with what was submitted.
//!
//! The comparison is exact: no trimming, no case folding and no URL
//! normalization. A trailing slash the generator added is a mismatch.

use crate::artifact::{Artifact, Channel};
use crate::error::{Result, ScenarioError};
use image::RgbaImage;
use std::fmt;
use tracing::{debug, info};

/// The payload a scenario submitted and expects back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target(String);

impl Target {
    pub fn new(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedSymbol {
    Payload(String),
    /// The image was readable but held no decodable symbol.
    NotFound,
}

/// Turns image-container bytes into a decoded payload.
pub trait SymbolDecoder: Send + Sync {
    /// # Errors
    ///
    /// Fails only when the bytes are not a readable image. An image without
    /// a symbol is `Ok(DecodedSymbol::NotFound)`.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedSymbol>;
}

/// Decoder backed by `rqrr`.
///
/// Pixels are flattened onto white before thresholding, since generated
/// codes may come with a transparent background. A light margin is added
/// around the image because element screenshots are often clipped right
/// at the finder patterns.
#[derive(Debug, Clone)]
pub struct QrDecoder {
    quiet_zone: u32,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self { quiet_zone: 32 }
    }
}

impl QrDecoder {
    fn luma_on_white(image: &RgbaImage, x: u32, y: u32) -> u8 {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let luma = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
        let alpha = u32::from(a);
        let blended = (luma * alpha + 255 * (255 - alpha)) / 255;
        u8::try_from(blended).unwrap_or(u8::MAX)
    }
}

impl SymbolDecoder for QrDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedSymbol> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        let pad = self.quiet_zone;

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            (width + 2 * pad) as usize,
            (height + 2 * pad) as usize,
            |x, y| {
                let (x, y) = (x as u32, y as u32);
                if x < pad || y < pad || x >= width + pad || y >= height + pad {
                    u8::MAX
                } else {
                    Self::luma_on_white(&image, x - pad, y - pad)
                }
            },
        );

        let grids = prepared.detect_grids();
        debug!(width, height, grids = grids.len(), "symbol detection");

        for grid in grids {
            match grid.decode() {
                Ok((_meta, content)) => return Ok(DecodedSymbol::Payload(content)),
                Err(e) => debug!(error = ?e, "grid did not decode"),
            }
        }
        Ok(DecodedSymbol::NotFound)
    }
}

/// Checks a decode result against the submitted target.
///
/// # Errors
///
/// `DecodeFailure` when nothing decoded, `Mismatch` when the payload
/// differs in any byte.
pub fn check(channel: Channel, decoded: DecodedSymbol, target: &Target) -> Result<String> {
    match decoded {
        DecodedSymbol::NotFound => Err(ScenarioError::DecodeFailure { channel }),
        DecodedSymbol::Payload(actual) if actual == target.as_str() => Ok(actual),
        DecodedSymbol::Payload(actual) => Err(ScenarioError::Mismatch {
            channel,
            expected: target.as_str().to_string(),
            actual,
        }),
    }
}

/// Decodes artifacts and compares them with their target.
pub struct VerificationPipeline {
    decoder: Box<dyn SymbolDecoder>,
}

impl fmt::Debug for VerificationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationPipeline").finish_non_exhaustive()
    }
}

impl Default for VerificationPipeline {
    fn default() -> Self {
        Self::new(Box::new(QrDecoder::default()))
    }
}

impl VerificationPipeline {
    pub fn new(decoder: Box<dyn SymbolDecoder>) -> Self {
        Self { decoder }
    }

    /// Consumes the artifact (deleting a downloaded file) and returns the
    /// decoded payload when it equals `target`.
    pub async fn verify(&self, artifact: Artifact, target: &Target) -> Result<String> {
        let channel = artifact.channel();
        let bytes = artifact.into_bytes().await?;
        let decoded = self.decoder.decode(&bytes)?;
        let payload = check(channel, decoded, target)?;
        info!(%channel, %payload, "payload verified");
        Ok(payload)
    }
}
