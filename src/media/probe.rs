use super::{types::ProbeResult, ThumbnailError};
use image::{ImageFormat, ImageReader};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// How the representative frame of a probed source is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceKind {
    /// Decodable in-process by the `image` crate.
    Still(ImageFormat),
    /// Needs ffmpeg. `stream_index` points at the stream holding the frame:
    /// the first real video stream, or the cover art of an audio file.
    Stream {
        stream_index: Option<usize>,
        cover_art: bool,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Probed {
    pub result: ProbeResult,
    pub kind: SourceKind,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: usize,
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    #[serde(default)]
    tags: HashMap<String, String>,
}

pub(crate) fn probe_file(path: &Path) -> Result<Probed, ThumbnailError> {
    if let Some(probed) = probe_still(path)? {
        return Ok(probed);
    }
    probe_stream(path)
}

/// Sniffs the header for a still image format. Returns `None` when the
/// `image` crate does not recognise the magic bytes.
fn probe_still(path: &Path) -> Result<Option<Probed>, ThumbnailError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let Some(format) = reader.format() else {
        return Ok(None);
    };

    let (width, height) = reader.into_dimensions().map_err(ThumbnailError::Decode)?;
    if width == 0 || height == 0 {
        return Err(ThumbnailError::UnsupportedFormat(format!(
            "{} has zero-sized dimensions",
            path.display()
        )));
    }

    let extension = format
        .extensions_str()
        .first()
        .copied()
        .unwrap_or_default()
        .to_string();

    debug!(
        path = %path.display(),
        width, height, extension = %extension,
        "Probed still image"
    );

    Ok(Some(Probed {
        result: ProbeResult {
            width,
            height,
            has_video: false,
            has_audio: false,
            extension,
            title: None,
        },
        kind: SourceKind::Still(format),
    }))
}

fn probe_stream(path: &Path) -> Result<Probed, ThumbnailError> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .output()
        .map_err(|source| ThumbnailError::ToolUnavailable {
            tool: "ffprobe",
            source,
        })?;

    if !output.status.success() {
        return Err(ThumbnailError::UnsupportedFormat(format!(
            "{}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| ThumbnailError::Probe(format!("unreadable ffprobe output: {e}")))?;

    let probed = from_ffprobe(path, parsed)?;
    debug!(
        path = %path.display(),
        width = probed.result.width,
        height = probed.result.height,
        has_video = probed.result.has_video,
        has_audio = probed.result.has_audio,
        extension = %probed.result.extension,
        "Probed media stream"
    );
    Ok(probed)
}

fn from_ffprobe(path: &Path, output: FfprobeOutput) -> Result<Probed, ThumbnailError> {
    let format = output.format.ok_or_else(|| {
        ThumbnailError::UnsupportedFormat(format!("{}: no container detected", path.display()))
    })?;

    let is_video = |s: &&FfprobeStream| s.codec_type.as_deref() == Some("video");
    let video = output
        .streams
        .iter()
        .filter(is_video)
        .find(|s| s.disposition.attached_pic == 0);
    let cover = output
        .streams
        .iter()
        .filter(is_video)
        .find(|s| s.disposition.attached_pic != 0);
    let has_audio = output
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    if video.is_none() && cover.is_none() && !has_audio {
        return Err(ThumbnailError::UnsupportedFormat(format!(
            "{}: no audio or video streams",
            path.display()
        )));
    }

    let frame_stream = video.or(cover);
    let (width, height) = frame_stream
        .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
        .unwrap_or((0, 0));

    let title = format
        .tags
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("title"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());

    Ok(Probed {
        result: ProbeResult {
            width,
            height,
            has_video: video.is_some(),
            has_audio,
            extension: container_extension(path, &format.format_name),
            title,
        },
        kind: SourceKind::Stream {
            stream_index: frame_stream.map(|s| s.index),
            cover_art: video.is_none() && cover.is_some(),
        },
    })
}

/// ffprobe reports demuxer names such as `mov,mp4,m4a,3gp,3g2,mj2`. The
/// file's own extension wins when it is one of them.
fn container_extension(path: &Path, format_name: &str) -> String {
    let names: Vec<&str> = format_name.split(',').map(str::trim).collect();
    let file_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if let Some(ext) = file_ext {
        if names.contains(&ext.as_str()) {
            return ext;
        }
    }

    match names.first().copied() {
        Some("matroska") => "mkv".to_string(),
        Some(name) => name.to_string(),
        None => String::new(),
    }
}
