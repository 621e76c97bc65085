#![forbid(unsafe_code)]

/// ffmpeg encoder names used when exporting a watermarked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecPair {
    pub video: &'static str,
    pub audio: &'static str,
}

pub const H264_AAC: CodecPair = CodecPair {
    video: "libx264",
    audio: "aac",
};
pub const VP8_VORBIS: CodecPair = CodecPair {
    video: "libvpx",
    audio: "libvorbis",
};
pub const THEORA_VORBIS: CodecPair = CodecPair {
    video: "libtheora",
    audio: "libvorbis",
};

/// Picks the encoder pair for an output extension (leading dot optional).
/// Unknown extensions fall back to H.264/AAC.
pub fn codecs_for_extension(extension: &str) -> CodecPair {
    match extension.strip_prefix('.').unwrap_or(extension) {
        "webm" => VP8_VORBIS,
        "ogv" => THEORA_VORBIS,
        "mp4" | "mkv" => H264_AAC,
        _ => H264_AAC,
    }
}
