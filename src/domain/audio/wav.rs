/// WAV (RIFF/PCM) parsing for announcement clips
use crate::domain::shared::AnnouncerError;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// WAV file format errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WavError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid WAV data: {0}")]
    InvalidFormat(String),

    #[error("Unsupported WAV encoding: {0}")]
    UnsupportedFormat(String),
}

impl From<io::Error> for WavError {
    fn from(err: io::Error) -> Self {
        WavError::Io(err.to_string())
    }
}

impl From<WavError> for AnnouncerError {
    fn from(err: WavError) -> Self {
        AnnouncerError::Playback(err.to_string())
    }
}

/// WAV audio format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per sample (8, 16, 24, 32)
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Bytes per frame (one sample for every channel)
    pub fn bytes_per_frame(&self) -> usize {
        (self.bits_per_sample / 8) as usize * self.channels as usize
    }
}

/// Decoded WAV clip
#[derive(Debug, Clone)]
pub struct WavFile {
    pub format: WavFormat,
    /// Raw PCM payload
    pub data: Arc<Vec<u8>>,
}

impl WavFile {
    /// Load WAV file from path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WavError> {
        let file = File::open(path)?;
        Self::from_reader(&mut BufReader::new(file))
    }

    /// Parse WAV from an in-memory buffer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WavError> {
        Self::from_reader(&mut Cursor::new(bytes))
    }

    /// Parse WAV from reader
    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> Result<Self, WavError> {
        let mut riff_header = [0u8; 12];
        reader
            .read_exact(&mut riff_header)
            .map_err(|_| WavError::InvalidFormat("truncated RIFF header".to_string()))?;

        if &riff_header[0..4] != b"RIFF" {
            return Err(WavError::InvalidFormat("missing RIFF signature".to_string()));
        }
        if &riff_header[8..12] != b"WAVE" {
            return Err(WavError::InvalidFormat("not a WAVE file".to_string()));
        }

        let mut format: Option<WavFormat> = None;
        let mut data: Option<Vec<u8>> = None;

        while format.is_none() || data.is_none() {
            let mut chunk_header = [0u8; 8];
            if reader.read_exact(&mut chunk_header).is_err() {
                break;
            }

            let chunk_size = u32::from_le_bytes([
                chunk_header[4],
                chunk_header[5],
                chunk_header[6],
                chunk_header[7],
            ]) as usize;

            match &chunk_header[0..4] {
                b"fmt " => format = Some(Self::parse_fmt_chunk(reader, chunk_size)?),
                b"data" => {
                    let mut payload = vec![0u8; chunk_size];
                    reader.read_exact(&mut payload)?;
                    data = Some(payload);
                }
                _ => {
                    reader.seek(SeekFrom::Current(chunk_size as i64))?;
                }
            }

            // Chunks are word-aligned
            if chunk_size % 2 != 0 {
                reader.seek(SeekFrom::Current(1))?;
            }
        }

        let format = format.ok_or_else(|| WavError::InvalidFormat("missing fmt chunk".to_string()))?;
        let data = data.ok_or_else(|| WavError::InvalidFormat("missing data chunk".to_string()))?;

        Ok(WavFile {
            format,
            data: Arc::new(data),
        })
    }

    fn parse_fmt_chunk<R: Read>(reader: &mut R, chunk_size: usize) -> Result<WavFormat, WavError> {
        if chunk_size < 16 {
            return Err(WavError::InvalidFormat("fmt chunk too small".to_string()));
        }

        let mut fmt = vec![0u8; chunk_size];
        reader.read_exact(&mut fmt)?;

        let audio_format = u16::from_le_bytes([fmt[0], fmt[1]]);
        let channels = u16::from_le_bytes([fmt[2], fmt[3]]);
        let sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
        let bits_per_sample = u16::from_le_bytes([fmt[14], fmt[15]]);

        if audio_format != 1 {
            return Err(WavError::UnsupportedFormat(format!(
                "only PCM (1) is supported, got {}",
                audio_format
            )));
        }
        if channels == 0 {
            return Err(WavError::InvalidFormat("zero channels".to_string()));
        }
        if sample_rate == 0 {
            return Err(WavError::InvalidFormat("zero sample rate".to_string()));
        }
        if !matches!(bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(WavError::UnsupportedFormat(format!(
                "{} bits per sample",
                bits_per_sample
            )));
        }

        Ok(WavFormat {
            channels,
            sample_rate,
            bits_per_sample,
        })
    }

    /// Number of complete frames in the payload
    pub fn frame_count(&self) -> u64 {
        (self.data.len() / self.format.bytes_per_frame()) as u64
    }

    /// Playback duration: frames divided by sample rate
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.format.sample_rate as f64)
    }
}

/// Build a PCM WAV image; used by tests across the crate
#[cfg(test)]
pub(crate) fn pcm_wav_bytes(sample_rate: u32, channels: u16, frames: u32) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let block_align = channels * bits_per_sample / 8;
    let data_len = frames * block_align as u32;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);
    bytes
}
