use super::ThumbnailError;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Decodes one representative frame of an audio/video file with ffmpeg.
///
/// For real video streams ffmpeg's `thumbnail` filter picks the most
/// representative frame of the first batch; cover art is taken as is.
pub fn extract_frame(
    path: &Path,
    stream_index: usize,
    cover_art: bool,
) -> Result<DynamicImage, ThumbnailError> {
    debug!(
        path = %path.display(),
        stream_index, cover_art,
        "Extracting frame with ffmpeg"
    );

    let mut command = Command::new("ffmpeg");
    command
        .arg("-v")
        .arg("error")
        .arg("-i")
        .arg(path)
        .arg("-map")
        .arg(format!("0:{}", stream_index))
        .arg("-an");
    if !cover_art {
        command.arg("-vf").arg("thumbnail");
    }
    let output = command
        .arg("-frames:v")
        .arg("1")
        .arg("-f")
        .arg("image2pipe")
        .arg("-c:v")
        .arg("png")
        .arg("pipe:1")
        .output()
        .map_err(|source| ThumbnailError::ToolUnavailable {
            tool: "ffmpeg",
            source,
        })?;

    if !output.status.success() || output.stdout.is_empty() {
        return Err(ThumbnailError::Extract(format!(
            "{}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    debug!("Read {} bytes of frame data from ffmpeg", output.stdout.len());

    image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)
        .map_err(ThumbnailError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use tempfile::tempdir;

    #[test]
    #[ignore = "Requires ffmpeg installed"]
    fn test_extract_frame_from_generated_video() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bars.mp4");
        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-f", "lavfi", "-i", "testsrc=size=320x240:rate=10"])
            .args(["-t", "1", "-pix_fmt", "yuv420p", "-y"])
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());

        let frame = extract_frame(&path, 0, false).unwrap();
        assert_eq!(frame.dimensions(), (320, 240));
    }

    #[test]
    fn test_extract_frame_missing_file_fails() {
        // Fails either because ffmpeg is absent or because the input is.
        assert!(extract_frame(Path::new("/no/such/video.mp4"), 0, false).is_err());
    }
}
