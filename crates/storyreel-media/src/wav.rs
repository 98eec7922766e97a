//! RIFF/WAVE packaging for raw PCM narration.

use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// MIME type of the produced container.
pub const WAV_MIME: &str = "audio/wav";

/// PCM sample layout of a speech payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for WavFormat {
    /// 24 kHz mono 16-bit, the layout speech providers return.
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

impl WavFormat {
    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }

    fn validate(&self) -> MediaResult<()> {
        if self.channels == 0 {
            return Err(MediaError::invalid_format("channel count must be non-zero"));
        }
        if self.sample_rate == 0 {
            return Err(MediaError::invalid_format("sample rate must be non-zero"));
        }
        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 {
            return Err(MediaError::invalid_format(format!(
                "unsupported bits per sample: {}",
                self.bits_per_sample
            )));
        }
        Ok(())
    }

    /// Build the 44-byte header for `data_len` bytes of PCM.
    pub fn header(&self, data_len: u32) -> [u8; WAV_HEADER_LEN] {
        let mut header = [0u8; WAV_HEADER_LEN];
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&(data_len.saturating_add(36)).to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        // PCM
        header[20..22].copy_from_slice(&1u16.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&data_len.to_le_bytes());
        header
    }
}

/// Prefix raw PCM with a WAV header.
pub fn wrap_pcm(pcm: &[u8], format: WavFormat) -> MediaResult<Vec<u8>> {
    format.validate()?;

    if pcm.is_empty() {
        return Err(MediaError::EmptyPayload);
    }

    let data_len = u32::try_from(pcm.len())
        .ok()
        .filter(|len| len.checked_add(36).is_some())
        .ok_or(MediaError::PayloadTooLarge { len: pcm.len() })?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    out.extend_from_slice(&format.header(data_len));
    out.extend_from_slice(pcm);

    debug!(
        pcm_bytes = pcm.len(),
        sample_rate = format.sample_rate,
        channels = format.channels,
        "Wrapped PCM in WAV container"
    );

    Ok(out)
}
