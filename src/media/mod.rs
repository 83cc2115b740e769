mod probe;
mod resize;
mod types;
mod utils;

pub use resize::{ThumbnailOptions, THUMB_SIZE};
pub use types::{ProbeResult, Thumbnail};

use image::ImageReader;
use probe::SourceKind;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The source is not decodable as media.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
    #[error("{tool} is not available: {source}")]
    ToolUnavailable {
        tool: &'static str,
        source: std::io::Error,
    },
    #[error("probe failed: {0}")]
    Probe(String),
    #[error("failed to extract frame: {0}")]
    Extract(String),
    #[error("failed to decode frame: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),
}

/// Produces a probe and a square JPEG thumbnail for a media file.
pub trait Thumbnailer: Send + Sync {
    fn generate(&self, path: &Path) -> Result<Thumbnail, ThumbnailError>;
}

#[derive(Debug, Clone, Default)]
pub struct ThumbnailGenerator {
    options: ThumbnailOptions,
}

impl ThumbnailGenerator {
    pub fn new(options: ThumbnailOptions) -> Self {
        Self { options }
    }
}

impl Thumbnailer for ThumbnailGenerator {
    fn generate(&self, path: &Path) -> Result<Thumbnail, ThumbnailError> {
        let probed = probe::probe_file(path)?;

        let frame = match probed.kind {
            SourceKind::Still(format) => {
                let mut reader = ImageReader::open(path)?;
                reader.set_format(format);
                reader.decode().map_err(ThumbnailError::Decode)?
            }
            SourceKind::Stream {
                stream_index: Some(index),
                cover_art,
            } => utils::extract_frame(path, index, cover_art)?,
            SourceKind::Stream {
                stream_index: None,
                ..
            } => {
                return Err(ThumbnailError::UnsupportedFormat(format!(
                    "{}: audio without cover art",
                    path.display()
                )))
            }
        };

        let square = resize::make_square_thumbnail(&frame, &self.options);
        let data = resize::encode_jpeg(&square, self.options.quality)?;

        info!(
            path = %path.display(),
            source_width = probed.result.width,
            source_height = probed.result.height,
            size = square.width(),
            "Generated thumbnail"
        );
        debug!("Thumbnail is {} bytes", data.len());

        Ok(Thumbnail {
            probe: probed.result,
            width: square.width(),
            height: square.height(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_generate_from_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("landscape.png");
        RgbImage::from_pixel(200, 100, Rgb([0, 128, 255]))
            .save(&path)
            .unwrap();

        let thumb = ThumbnailGenerator::default().generate(&path).unwrap();
        assert_eq!((thumb.width, thumb.height), (THUMB_SIZE, THUMB_SIZE));
        assert_eq!(thumb.probe.extension, "png");
        assert_eq!((thumb.probe.width, thumb.probe.height), (200, 100));
        assert!(!thumb.probe.has_video);

        let mut bytes = Vec::new();
        thumb.into_reader().read_to_end(&mut bytes).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (128, 128));
    }

    #[test]
    fn test_generate_from_jpeg_portrait() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("portrait.jpg");
        RgbImage::from_pixel(90, 160, Rgb([20, 20, 20]))
            .save(&path)
            .unwrap();

        let thumb = ThumbnailGenerator::default().generate(&path).unwrap();
        assert_eq!(thumb.probe.extension, "jpg");
        assert_eq!((thumb.width, thumb.height), (128, 128));
    }

    #[test]
    fn test_generate_square_keeps_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("square.png");
        RgbImage::new(50, 50).save(&path).unwrap();

        let thumb = ThumbnailGenerator::default().generate(&path).unwrap();
        assert_eq!((thumb.width, thumb.height), (50, 50));
    }

    #[test]
    fn test_generate_corrupt_image_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.png");
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0u8; 16]);
        std::fs::write(&path, data).unwrap();

        assert!(ThumbnailGenerator::default().generate(&path).is_err());
    }

    #[test]
    #[ignore = "Requires ffmpeg installed"]
    fn test_generate_rejects_non_media() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readme.txt");
        std::fs::write(&path, "plain text, not media").unwrap();

        let err = ThumbnailGenerator::default().generate(&path).unwrap_err();
        assert!(matches!(err, ThumbnailError::UnsupportedFormat(_)));
    }
}
