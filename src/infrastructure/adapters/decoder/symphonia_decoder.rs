//! Symphonia Decoder - 基于 symphonia 的片段解码器
//!
//! 支持 MP3（语音片段的正式格式）与 WAV（测试与本地录音）

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioBuffer, ClipDecoderPort, ClipError};

/// Symphonia 解码器
///
/// 无状态，可在多个请求间共享
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    /// 根据文件头猜测容器格式
    fn hint_for(data: &[u8]) -> Hint {
        let mut hint = Hint::new();
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            hint.with_extension("wav");
        } else {
            hint.with_extension("mp3");
        }
        hint
    }
}

impl ClipDecoderPort for SymphoniaDecoder {
    fn decode(&self, data: &[u8]) -> Result<AudioBuffer, ClipError> {
        if data.is_empty() {
            return Err(ClipError::Decode("Empty clip".to_string()));
        }

        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Self::hint_for(data),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ClipError::Decode(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| ClipError::Decode("No audio track found".to_string()))?;

        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| ClipError::Decode(format!("Decoder creation failed: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();
        let track_id = track.id;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => {
                    return Err(ClipError::Decode(format!("Packet read error: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => return Err(ClipError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            // MP3 头中不一定带参数，以首个解码帧为准
            sample_rate.get_or_insert(spec.rate);
            channels.get_or_insert(spec.channels.count() as u16);

            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let actual_samples = num_frames * spec.channels.count();
            samples.extend(&sample_buf.samples()[..actual_samples]);
        }

        let sample_rate =
            sample_rate.ok_or_else(|| ClipError::Decode("Unknown sample rate".to_string()))?;
        let channels =
            channels.ok_or_else(|| ClipError::Decode("Unknown channel count".to_string()))?;

        Ok(AudioBuffer::new(samples, sample_rate, channels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::encode_wav;

    #[test]
    fn test_decode_wav() {
        let pcm: Vec<f32> = (0..8_000).map(|i| ((i % 100) as f32 / 100.0) - 0.5).collect();
        let wav = encode_wav(&pcm, 8_000, 2);

        let buffer = SymphoniaDecoder::new().decode(&wav).unwrap();
        assert_eq!(buffer.sample_rate, 8_000);
        assert_eq!(buffer.channels, 2);
        assert_eq!(buffer.samples.len(), 8_000);
        assert!((buffer.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let decoder = SymphoniaDecoder::new();
        assert!(matches!(decoder.decode(&[]), Err(ClipError::Decode(_))));
        assert!(matches!(
            decoder.decode(b"definitely not audio at all, just text"),
            Err(ClipError::Decode(_))
        ));
    }
}
