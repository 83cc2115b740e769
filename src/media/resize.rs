use super::ThumbnailError;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView};
use tracing::debug;

/// Side length of the thumbnail square.
pub const THUMB_SIZE: u32 = 128;

/// Added to the shorter side of the resize box so that rounding never leaves
/// the shorter side below `THUMB_SIZE` before the crop.
pub const THUMB_PADDING: u32 = 2;

pub const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailOptions {
    pub size: u32,
    pub padding: u32,
    pub quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            size: THUMB_SIZE,
            padding: THUMB_PADDING,
            quality: JPEG_QUALITY,
        }
    }
}

impl ThumbnailOptions {
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}

/// Box the source is resized into before cropping: the shorter side becomes
/// `size + padding`, the longer side keeps the aspect ratio. Square sources
/// are left untouched.
pub fn target_dimensions(width: u32, height: u32, options: &ThumbnailOptions) -> (u32, u32) {
    let size = options.size as f64;
    let padded = options.size + options.padding;

    if width == height {
        (width, height)
    } else if width > height {
        let scaled = (width as f64 * (size / height as f64)).round() as u32;
        (scaled.max(1), padded)
    } else {
        let scaled = (height as f64 * (size / width as f64)).round() as u32;
        (padded, scaled.max(1))
    }
}

/// Largest size with the source's aspect ratio that fits inside the box.
pub fn fit_within(width: u32, height: u32, box_width: u32, box_height: u32) -> (u32, u32) {
    let scale = f64::min(
        box_width as f64 / width as f64,
        box_height as f64 / height as f64,
    );
    let fitted_width = (width as f64 * scale).round() as u32;
    let fitted_height = (height as f64 * scale).round() as u32;
    (fitted_width.max(1), fitted_height.max(1))
}

/// Offset and side of the centered 1:1 region of a `width` x `height` frame.
pub fn centered_square(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    ((width - side) / 2, (height - side) / 2, side)
}

/// Maps `offset`/`len` along an axis of the resized frame back onto the
/// source axis of length `source`.
fn source_span(offset: u32, len: u32, resized: u32, source: u32) -> (u32, u32) {
    let scale = source as f64 / resized as f64;
    let len = ((len as f64 * scale).round() as u32).clamp(1, source);
    let offset = ((offset as f64 * scale).round() as u32).min(source - len);
    (offset, len)
}

/// Resizes `frame` into the target box and crops its centered square.
///
/// The crop is taken from the source first and only that region is scaled,
/// so elongated frames never allocate the full resized strip.
pub fn make_square_thumbnail(frame: &DynamicImage, options: &ThumbnailOptions) -> DynamicImage {
    let (width, height) = frame.dimensions();
    let (box_width, box_height) = target_dimensions(width, height, options);
    let (resized_width, resized_height) = fit_within(width, height, box_width, box_height);

    let (x, y, mut side) = centered_square(resized_width, resized_height);
    if width != height {
        // Half-way rounding can leave the short side one pixel long.
        side = side.min(options.size);
    }
    let x = x + (resized_width.min(resized_height) - side) / 2;
    let y = y + (resized_width.min(resized_height) - side) / 2;

    let (source_x, source_width) = source_span(x, side, resized_width, width);
    let (source_y, source_height) = source_span(y, side, resized_height, height);

    debug!(
        width,
        height,
        resized_width,
        resized_height,
        source_x,
        source_y,
        source_width,
        source_height,
        "Cropping frame for thumbnail"
    );

    let cropped = frame.crop_imm(source_x, source_y, source_width, source_height);
    if (source_width, source_height) == (side, side) {
        cropped
    } else {
        cropped.resize_exact(side, side, FilterType::CatmullRom)
    }
}

pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ThumbnailError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(ThumbnailError::Encode)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])))
    }

    #[test]
    fn test_target_dimensions_square_unchanged() {
        let options = ThumbnailOptions::default();
        assert_eq!(target_dimensions(300, 300, &options), (300, 300));
        assert_eq!(target_dimensions(64, 64, &options), (64, 64));
    }

    #[test]
    fn test_target_dimensions_landscape() {
        let options = ThumbnailOptions::default();
        assert_eq!(target_dimensions(200, 100, &options), (256, 130));
        assert_eq!(target_dimensions(1920, 1080, &options), (228, 130));
    }

    #[test]
    fn test_target_dimensions_portrait() {
        let options = ThumbnailOptions::default();
        assert_eq!(target_dimensions(100, 300, &options), (130, 384));
        assert_eq!(target_dimensions(1080, 1920, &options), (130, 228));
    }

    #[test]
    fn test_target_dimensions_padding_is_tunable() {
        let options = ThumbnailOptions {
            padding: 0,
            ..ThumbnailOptions::default()
        };
        assert_eq!(target_dimensions(200, 100, &options), (256, 128));
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(200, 100, 256, 130), (256, 128));
        assert_eq!(fit_within(100, 300, 130, 384), (128, 384));
        assert_eq!(fit_within(50, 50, 50, 50), (50, 50));
    }

    #[test]
    fn test_centered_square() {
        assert_eq!(centered_square(256, 128), (64, 0, 128));
        assert_eq!(centered_square(128, 384), (0, 128, 128));
        assert_eq!(centered_square(10, 10), (0, 0, 10));
    }

    #[test]
    fn test_non_square_sources_become_thumb_size_squares() {
        let options = ThumbnailOptions::default();
        let dims = [
            (200, 100),
            (100, 200),
            (1920, 1080),
            (1080, 1920),
            (640, 480),
            (37, 1000),
            (1000, 37),
            (129, 128),
            (3, 7),
        ];

        for (width, height) in dims {
            let thumb = make_square_thumbnail(&solid(width, height), &options);
            assert_eq!(
                thumb.dimensions(),
                (THUMB_SIZE, THUMB_SIZE),
                "source {}x{}",
                width,
                height
            );
        }
    }

    #[test]
    fn test_extremely_elongated_sources() {
        let options = ThumbnailOptions::default();
        for (width, height) in [(10_000, 1), (1, 10_000), (4_000, 3)] {
            let thumb = make_square_thumbnail(&solid(width, height), &options);
            assert_eq!(thumb.dimensions(), (THUMB_SIZE, THUMB_SIZE));
        }
    }

    #[test]
    fn test_source_span_stays_inside_source() {
        assert_eq!(source_span(64, 128, 256, 200), (50, 100));
        assert_eq!(source_span(0, 128, 128, 100), (0, 100));
        assert_eq!(source_span(639_936, 128, 1_280_000, 10_000), (5_000, 1));
        assert_eq!(source_span(0, 128, 130, 1), (0, 1));
    }

    #[test]
    fn test_square_source_is_not_resized() {
        let options = ThumbnailOptions::default();
        let thumb = make_square_thumbnail(&solid(300, 300), &options);
        assert_eq!(thumb.dimensions(), (300, 300));
    }

    #[test]
    fn test_custom_size() {
        let options = ThumbnailOptions::with_size(64);
        let thumb = make_square_thumbnail(&solid(640, 480), &options);
        assert_eq!(thumb.dimensions(), (64, 64));
    }

    #[test]
    fn test_crop_keeps_center() {
        // Left and right thirds black, middle third white.
        let mut img = RgbImage::new(300, 100);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            *pixel = if (100..200).contains(&x) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            };
        }

        let thumb = make_square_thumbnail(&DynamicImage::ImageRgb8(img), &ThumbnailOptions::default());
        let center = thumb.get_pixel(64, 64);
        assert!(center[0] > 200, "center pixel should stay white: {:?}", center);
    }

    #[test]
    fn test_encode_jpeg() {
        let thumb = make_square_thumbnail(&solid(200, 100), &ThumbnailOptions::default());
        let data = encode_jpeg(&thumb, JPEG_QUALITY).unwrap();

        assert!(data.starts_with(&[0xFF, 0xD8]));
        let decoded = image::load_from_memory_with_format(&data, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (128, 128));
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 100])));
        let data = encode_jpeg(&img, JPEG_QUALITY).unwrap();
        assert!(data.starts_with(&[0xFF, 0xD8]));
    }
}
