use std::io::Cursor;

/// What probing a source told us about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    pub has_video: bool,
    pub has_audio: bool,
    /// Container or codec extension, e.g. `jpg`, `png`, `mp4`.
    pub extension: String,
    /// Title embedded in the container metadata, if any.
    pub title: Option<String>,
}

/// A derived square thumbnail together with the probe of its source.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub probe: ProbeResult,
    pub width: u32,
    pub height: u32,
    /// JPEG-encoded bytes.
    pub data: Vec<u8>,
}

impl Thumbnail {
    /// Reader over the JPEG bytes.
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.data)
    }
}
