//! Incremental decoder for the coach endpoint's event stream.
//!
//! The stream is a sequence of newline-delimited lines:
//!
//! * `: keep-alive` comment lines and blank lines are ignored
//! * `data: {json}` carries `choices[0].delta.content`, a fragment to append
//! * `data: [DONE]` terminates the stream
//!
//! Chunks may split a line (or a multi-byte UTF-8 character) anywhere, so the
//! decoder buffers raw bytes and only interprets a line once its `\n` arrived.

use serde::Deserialize;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded unit of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text fragment to append to the assistant message
    Delta(String),
    /// `data: [DONE]`
    Done,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub lines: usize,
    pub deltas: usize,
    pub ignored: usize,
    pub malformed: usize,
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Rolling line buffer turning byte chunks into [`Frame`]s.
#[derive(Debug, Default)]
pub struct LineFrameDecoder {
    pending: Vec<u8>,
    finished: bool,
    stats: DecoderStats,
}

impl LineFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `[DONE]` has been seen; further input is ignored
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes of an incomplete trailing line
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Append a chunk and decode every complete line it finishes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }

        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = decode_line(&self.pending[start..end]);
            start = end + 1;

            match self.process_line(&line, false) {
                Some(Frame::Done) => {
                    frames.push(Frame::Done);
                    self.finish();
                    return frames;
                }
                Some(frame) => frames.push(frame),
                None => {}
            }
        }

        self.pending.drain(..start);
        frames
    }

    /// Decode whatever partial line is left once the byte stream ended.
    ///
    /// Best effort: a malformed trailing line is dropped silently.
    pub fn flush(&mut self) -> Vec<Frame> {
        if self.finished || self.pending.is_empty() {
            self.pending.clear();
            return Vec::new();
        }

        let rest = std::mem::take(&mut self.pending);
        let line = decode_line(&rest);
        let frame = self.process_line(&line, true);
        if matches!(frame, Some(Frame::Done)) {
            self.finish();
        }
        frame.into_iter().collect()
    }

    fn finish(&mut self) {
        self.finished = true;
        self.pending.clear();
    }

    fn process_line(&mut self, line: &str, final_flush: bool) -> Option<Frame> {
        self.stats.lines += 1;

        if line.trim().is_empty() || line.starts_with(':') {
            self.stats.ignored += 1;
            return None;
        }

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            tracing::trace!("💬 [STREAM] Ignoring non-data line: {}", line);
            self.stats.ignored += 1;
            return None;
        };
        let payload = payload.trim();

        if payload == DONE_SENTINEL {
            return Some(Frame::Done);
        }

        match serde_json::from_str::<ChunkPayload>(payload) {
            Ok(chunk) => {
                let content = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta)
                    .and_then(|delta| delta.content)
                    .filter(|content| !content.is_empty());

                match content {
                    Some(content) => {
                        self.stats.deltas += 1;
                        Some(Frame::Delta(content))
                    }
                    None => {
                        self.stats.ignored += 1;
                        None
                    }
                }
            }
            Err(e) => {
                self.stats.malformed += 1;
                if final_flush {
                    tracing::debug!("💬 [STREAM] Dropping malformed trailing frame: {}", e);
                } else {
                    tracing::warn!("💬 [STREAM] Skipping malformed frame: {}", e);
                }
                None
            }
        }
    }
}

// `\r\n` line endings: strip the carriage return
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Per-request assembly state: the decoder plus the accumulated reply.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    decoder: LineFrameDecoder,
    content: String,
    done: bool,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns `true` when the content grew.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> bool {
        let frames = self.decoder.feed(chunk);
        self.apply(frames)
    }

    /// End of the byte stream; returns `true` when the content grew.
    pub fn finish(&mut self) -> bool {
        let frames = self.decoder.flush();
        self.apply(frames)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    /// `[DONE]` received
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn decoder_stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    fn apply(&mut self, frames: Vec<Frame>) -> bool {
        let mut changed = false;
        for frame in frames {
            match frame {
                Frame::Delta(fragment) => {
                    self.content.push_str(&fragment);
                    changed = true;
                }
                Frame::Done => self.done = true,
            }
        }
        changed
    }
}
