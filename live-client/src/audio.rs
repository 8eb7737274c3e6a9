//! Audio format definitions and turn-level accumulation.

use crate::error::{LiveError, Result};
use base64::prelude::*;
use bytes::{Bytes, BytesMut};

/// Default output sample rate when nothing else is known (Hz).
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

/// PCM format metadata for an audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz (e.g., 24000, 16000).
    pub sample_rate: u32,
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Bits per sample.
    pub bits_per_sample: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::pcm16_24khz()
    }
}

impl AudioFormat {
    /// Create a new audio format specification.
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self { sample_rate, channels, bits_per_sample }
    }

    /// Standard PCM16 mono at 24kHz (model output default).
    pub fn pcm16_24khz() -> Self {
        Self { sample_rate: DEFAULT_SAMPLE_RATE, channels: 1, bits_per_sample: 16 }
    }

    /// PCM16 mono at 16kHz (microphone input default).
    pub fn pcm16_16khz() -> Self {
        Self { sample_rate: 16000, channels: 1, bits_per_sample: 16 }
    }

    /// Bytes per second for this format.
    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate * self.channels as u32 * (self.bits_per_sample / 8) as u32
    }

    /// Duration in milliseconds for a given number of bytes.
    pub fn duration_ms(&self, bytes: usize) -> f64 {
        let bytes_per_ms = self.bytes_per_second() as f64 / 1000.0;
        bytes as f64 / bytes_per_ms
    }

    /// MIME type for streaming this format as raw PCM.
    pub fn mime_type(&self) -> String {
        format!("audio/pcm;rate={}", self.sample_rate)
    }
}

/// One reassembled audio payload with format information.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw audio data.
    pub data: Bytes,
    /// Format metadata, from a container header or the MIME parameters.
    pub format: AudioFormat,
    /// Whether a container header was seen in the source bytes.
    pub header_present: bool,
}

impl AudioChunk {
    /// Create a new audio chunk.
    pub fn new(data: impl Into<Bytes>, format: AudioFormat) -> Self {
        Self { data: data.into(), format, header_present: false }
    }

    /// Duration of this chunk in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.format.duration_ms(self.data.len())
    }

    /// Encode the audio data as base64 for the wire.
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.data)
    }
}

/// Extract a `rate=<n>` parameter from a MIME string, e.g.
/// `audio/pcm;rate=16000` → 16000. Falls back to [`DEFAULT_SAMPLE_RATE`]
/// when the token is absent or unparsable.
pub fn sample_rate_from_mime(mime: &str) -> u32 {
    mime.split(';')
        .skip(1)
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_SAMPLE_RATE)
}

/// Sniff a RIFF/WAVE container header and extract its PCM format.
///
/// Returns `None` for headerless (raw PCM) payloads.
fn parse_wav_header(data: &[u8]) -> Option<AudioFormat> {
    if data.len() < 44 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return None;
    }
    let channels = u16::from_le_bytes([data[22], data[23]]);
    let sample_rate = u32::from_le_bytes([data[24], data[25], data[26], data[27]]);
    let bits_per_sample = u16::from_le_bytes([data[34], data[35]]);
    Some(AudioFormat { sample_rate, channels, bits_per_sample })
}

/// Buffers raw audio bytes across inbound parts until turn completion.
///
/// Exactly one of [`flush`](Self::flush) or [`discard`](Self::discard) ends
/// a turn; the next turn always starts from an empty buffer. Mutated only
/// from the single inbound dispatch path.
#[derive(Debug, Default)]
pub struct AudioAccumulator {
    buffer: BytesMut,
    format: Option<AudioFormat>,
    header_present: bool,
}

impl AudioAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a wire-encoded (base64) payload and append it.
    pub fn append_base64(&mut self, data: &str, mime_type: &str) -> Result<()> {
        let bytes = BASE64_STANDARD
            .decode(data)
            .map_err(|e| LiveError::protocol(format!("invalid base64 audio payload: {e}")))?;
        self.append(&bytes, mime_type);
        Ok(())
    }

    /// Append raw bytes, updating the format metadata. A container header
    /// takes precedence over MIME parameters; the latest metadata wins.
    pub fn append(&mut self, data: &[u8], mime_type: &str) {
        if let Some(format) = parse_wav_header(data) {
            self.format = Some(format);
            self.header_present = true;
        } else {
            self.format = Some(AudioFormat {
                sample_rate: sample_rate_from_mime(mime_type),
                channels: 1,
                bits_per_sample: 16,
            });
        }
        self.buffer.extend_from_slice(data);
    }

    /// Produce the accumulated chunk and clear state. `None` if empty.
    pub fn flush(&mut self) -> Option<AudioChunk> {
        if self.buffer.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.buffer).freeze();
        let format = self.format.take().unwrap_or_default();
        let header_present = std::mem::take(&mut self.header_present);
        Some(AudioChunk { data, format, header_present })
    }

    /// Clear state without producing output (interruption path).
    pub fn discard(&mut self) {
        self.buffer.clear();
        self.format = None;
        self.header_present = false;
    }

    /// Whether any bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }
}
