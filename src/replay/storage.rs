//! Replay file storage.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::replay::frame::{KeyPressState, ReplayFrame};
use crate::replay::replay::Replay;

/// Bytes per packed frame record: song time (f64 LE) + key bits (u32 LE).
const FRAME_RECORD_BYTES: usize = 12;

/// Metadata identifying a stored replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayMetadata {
    /// Player name.
    #[serde(default)]
    pub player: String,
    /// Chart content hash this replay was recorded against.
    #[serde(default)]
    pub chart_sha256: String,
    /// Lane count the replay was recorded with.
    #[serde(default)]
    pub key_count: usize,
    /// Play date (unix timestamp).
    #[serde(default)]
    pub date: i64,
}

/// On-disk replay document: metadata plus the packed frame log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayDocument {
    pub metadata: ReplayMetadata,
    /// Packed frame log (base64 over gzip). `None` while expanded.
    #[serde(default)]
    pub frame_log: Option<String>,
    /// Expanded frames (not serialized directly).
    #[serde(skip)]
    pub frames: Vec<ReplayFrame>,
}

impl ReplayDocument {
    /// Wrap a finished replay for persistence, stamped with the current
    /// date.
    pub fn from_replay(replay: &Replay, player: &str, chart_sha256: &str) -> Self {
        Self {
            metadata: ReplayMetadata {
                player: player.to_string(),
                chart_sha256: chart_sha256.to_string(),
                key_count: replay.key_count(),
                date: chrono::Utc::now().timestamp(),
            },
            frame_log: None,
            frames: replay.frames().to_vec(),
        }
    }

    /// Pack the expanded frames into the `frame_log` field.
    ///
    /// Each record is the song time followed by the key bits, little-endian.
    /// Capture timestamps are informational and not persisted; deltas are
    /// recomputed on expansion.
    pub fn shrink(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            return Ok(());
        }

        let mut raw = Vec::with_capacity(self.frames.len() * FRAME_RECORD_BYTES);
        for frame in &self.frames {
            raw.extend_from_slice(&frame.time_ms.to_le_bytes());
            raw.extend_from_slice(&frame.keys.bits().to_le_bytes());
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        let compressed = encoder.finish()?;

        self.frame_log = Some(URL_SAFE.encode(compressed));
        self.frames.clear();
        Ok(())
    }

    /// Expand the packed `frame_log` back into frames.
    pub fn expand(&mut self) -> Result<()> {
        let frame_log = match &self.frame_log {
            Some(log) if !log.is_empty() => log.clone(),
            _ => return Ok(()),
        };

        let compressed = URL_SAFE
            .decode(frame_log.as_bytes())
            .map_err(|e| anyhow!("base64 decode error: {e}"))?;

        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;

        if raw.len() % FRAME_RECORD_BYTES != 0 {
            return Err(anyhow!("truncated frame log"));
        }

        let mut frames = Vec::with_capacity(raw.len() / FRAME_RECORD_BYTES);
        let mut previous_time = f64::NEG_INFINITY;
        for record in raw.chunks_exact(FRAME_RECORD_BYTES) {
            let time_bytes: [u8; 8] = record[..8]
                .try_into()
                .map_err(|_| anyhow!("invalid frame log data"))?;
            let bits_bytes: [u8; 4] = record[8..]
                .try_into()
                .map_err(|_| anyhow!("invalid frame log data"))?;
            let time_ms = f64::from_le_bytes(time_bytes);

            if time_ms < previous_time {
                return Err(anyhow!("frame log moves backwards in song time"));
            }
            previous_time = time_ms;

            frames.push(ReplayFrame::new(
                time_ms,
                KeyPressState::from_bits(u32::from_le_bytes(bits_bytes)),
            ));
        }

        self.frames = frames;
        self.frame_log = None;
        Ok(())
    }

    /// Turn the document into a playable replay, expanding if needed.
    pub fn into_replay(mut self) -> Result<Replay> {
        self.expand()?;
        Ok(Replay::new(self.metadata.key_count, self.frames))
    }
}

/// Replay file path for a chart inside `dir`.
pub fn replay_path(dir: &Path, chart_sha256: &str) -> PathBuf {
    dir.join(format!("{chart_sha256}.json.gz"))
}

/// Save a replay document as gzip-compressed JSON.
pub fn save_replay(path: &Path, document: &mut ReplayDocument) -> Result<()> {
    document.shrink()?;

    let json = serde_json::to_string(document).context("Failed to serialize replay document")?;

    let file = File::create(path)
        .with_context(|| format!("Failed to create replay file: {}", path.display()))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(json.as_bytes())
        .context("Failed to write compressed replay")?;
    encoder.finish().context("Failed to finish compression")?;

    Ok(())
}

/// Load a replay document, expanding the frame log.
pub fn load_replay(path: &Path) -> Result<ReplayDocument> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open replay file: {}", path.display()))?;
    let mut decoder = GzDecoder::new(file);
    let mut json = String::new();
    decoder
        .read_to_string(&mut json)
        .context("Failed to decompress replay file")?;

    let mut document: ReplayDocument =
        serde_json::from_str(&json).context("Failed to deserialize replay document")?;
    document.expand()?;
    Ok(document)
}
