//! Server-Sent Events decoding.
//!
//! `SseDecoder` turns arbitrary body chunks into complete frames. A frame ends
//! at a blank line; lines may end in LF or CRLF and may be split across
//! chunks at any byte. Supported fields are `event`, `data` (repeatable,
//! joined with `\n`) and `id`; `retry` and unknown fields are ignored, as are
//! comment lines starting with `:`.
//!
//! Each frame's data is a JSON workload event:
//!
//! ```text
//! event: reading
//! data: {"workload": "rppg", "timestamp": 1717171717, "data": {"HR": 72, "RR": 16}}
//! ```

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Upper bound for a single frame (pending data plus the current line).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SseError {
    /// Frame grew past the limit; it was discarded.
    #[error("SSE frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },
}

/// One decoded event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Frames completed by one chunk, plus the oversized frames it dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub frames: Vec<SseFrame>,
    pub errors: Vec<SseError>,
}

/// Incremental SSE decoder.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: BytesMut,
    max_frame_bytes: usize,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
    last_event_id: Option<String>,
    /// Drop input up to the next line break after an oversized line.
    skipping_line: bool,
    /// Drop lines up to the next blank line after an oversized frame.
    skipping_frame: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl SseDecoder {
    #[must_use]
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_bytes,
            event: None,
            data: Vec::new(),
            data_len: 0,
            last_event_id: None,
            skipping_line: false,
            skipping_frame: false,
        }
    }

    /// Id of the most recent event that carried one.
    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Feed a body chunk and return every frame it completes.
    ///
    /// A frame that exceeds the limit is dropped whole, up to its terminating
    /// blank line, and reported in [`Decoded::errors`]. Frames around it are
    /// still returned.
    pub fn push(&mut self, chunk: &[u8]) -> Decoded {
        self.buffer.extend_from_slice(chunk);
        let mut decoded = Decoded::default();

        loop {
            let newline = self.buffer.iter().position(|b| *b == b'\n');

            if self.skipping_line {
                match newline {
                    Some(pos) => {
                        let _ = self.buffer.split_to(pos + 1);
                        self.skipping_line = false;
                        continue;
                    }
                    None => {
                        self.buffer.clear();
                        break;
                    }
                }
            }

            let Some(pos) = newline else { break };
            let line = self.buffer.split_to(pos + 1);
            let line = line.strip_suffix(b"\n").unwrap_or(&line);
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if self.skipping_frame {
                if line.is_empty() {
                    self.skipping_frame = false;
                }
                continue;
            }

            let line = String::from_utf8_lossy(line);
            match self.process_line(&line) {
                Ok(Some(frame)) => decoded.frames.push(frame),
                Ok(None) => {}
                Err(e) => {
                    self.skipping_frame = true;
                    decoded.errors.push(e);
                }
            }
        }

        if self.buffer.len() + self.data_len > self.max_frame_bytes {
            self.buffer.clear();
            self.skipping_line = true;
            self.reset_frame();
            if !self.skipping_frame {
                self.skipping_frame = true;
                decoded.errors.push(SseError::FrameTooLarge {
                    limit: self.max_frame_bytes,
                });
            }
        }

        decoded
    }

    /// Flush a final frame left without a terminating blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let dropping = self.skipping_line || self.skipping_frame;
        if !dropping && !self.buffer.is_empty() {
            let rest = self.buffer.split();
            let rest = rest.strip_suffix(b"\r").unwrap_or(&rest);
            let line = String::from_utf8_lossy(rest).into_owned();
            // A trailing line cannot overflow here; the limit was checked on push
            let _ = self.process_line(&line);
        }
        self.buffer.clear();
        self.skipping_line = false;
        self.skipping_frame = false;
        if dropping {
            self.reset_frame();
            return None;
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Result<Option<SseFrame>, SseError> {
        if line.is_empty() {
            return Ok(self.dispatch());
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            // Comment
            "" => {}
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data_len += value.len() + 1;
                if self.data_len > self.max_frame_bytes {
                    self.reset_frame();
                    return Err(SseError::FrameTooLarge {
                        limit: self.max_frame_bytes,
                    });
                }
                self.data.push(value.to_string());
            }
            "id" if !value.contains('\0') => self.last_event_id = Some(value.to_string()),
            _ => {}
        }

        Ok(None)
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take().filter(|e| !e.is_empty());
        if self.data.is_empty() {
            self.data_len = 0;
            return None;
        }

        let data = self.data.join("\n");
        self.data.clear();
        self.data_len = 0;

        Some(SseFrame {
            event,
            data,
            id: self.last_event_id.clone(),
        })
    }

    fn reset_frame(&mut self) {
        self.event = None;
        self.data.clear();
        self.data_len = 0;
    }
}

/// Reading published by a workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadEvent {
    /// Workload identifier as sent by the backend.
    pub workload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawWorkloadEvent {
    #[serde(default)]
    workload: Option<String>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    data: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("Event data is not a valid workload event: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Event does not name a workload")]
    MissingWorkload,
}

impl WorkloadEvent {
    /// Parse a frame's data. The frame's event name stands in for a missing
    /// `workload` field.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a JSON object of the expected shape
    /// or no workload can be determined.
    pub fn from_frame(frame: &SseFrame) -> Result<Self, EventParseError> {
        let raw: RawWorkloadEvent = serde_json::from_str(&frame.data)?;

        let workload = raw
            .workload
            .or_else(|| frame.event.clone())
            .filter(|w| !w.is_empty())
            .ok_or(EventParseError::MissingWorkload)?;

        Ok(WorkloadEvent {
            workload,
            timestamp: raw.timestamp,
            data: raw.data,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn data_frames(frames: &[SseFrame]) -> Vec<&str> {
        frames.iter().map(|f| f.data.as_str()).collect()
    }

    #[test]
    fn test_decodes_single_frame() {
        let mut decoder = SseDecoder::default();
        let frames = decoder
            .push(b"event: reading\nid: 7\ndata: {\"workload\":\"rppg\"}\n\n")
            .frames;

        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("reading".to_string()),
                data: "{\"workload\":\"rppg\"}".to_string(),
                id: Some("7".to_string()),
            }]
        );
        assert_eq!(decoder.last_event_id(), Some("7"));
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"da").frames.is_empty());
        assert!(decoder.push(b"ta: hel").frames.is_empty());
        assert!(decoder.push(b"lo\n").frames.is_empty());
        let frames = decoder.push(b"\ndata: next\n\n").frames;
        assert_eq!(data_frames(&frames), vec!["hello", "next"]);
    }

    #[test]
    fn test_crlf_and_cr_split_from_lf() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: one\r").frames.is_empty());
        let frames = decoder.push(b"\n\r\ndata: two\r\n\r\n").frames;
        assert_eq!(data_frames(&frames), vec!["one", "two"]);
    }

    #[test]
    fn test_multi_line_data_is_joined() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b"data: first\ndata:second\ndata\n\n").frames;
        assert_eq!(data_frames(&frames), vec!["first\nsecond\n"]);
    }

    #[test]
    fn test_comments_and_empty_frames_are_skipped() {
        let mut decoder = SseDecoder::default();
        let frames = decoder
            .push(b": keep-alive\n\nevent: ping\n\nretry: 1000\ndata: x\n\n")
            .frames;
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                data: "x".to_string(),
                id: None,
            }]
        );
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").frames.is_empty());
        let frame = decoder.finish().unwrap();
        assert_eq!(frame.data, "tail");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_oversized_frame_is_dropped_and_decoding_recovers() {
        let mut decoder = SseDecoder::new(16);
        let decoded = decoder.push(b"data: 0123456789abcdefghij");
        assert!(decoded.frames.is_empty());
        assert_eq!(decoded.errors, vec![SseError::FrameTooLarge { limit: 16 }]);

        // Rest of the oversized line is discarded
        let decoded = decoder.push(b"klmnop\n\ndata: ok\n\n");
        assert_eq!(data_frames(&decoded.frames), vec!["ok"]);
        assert!(decoded.errors.is_empty());
    }

    #[test]
    fn test_frames_before_an_oversized_frame_are_kept() {
        let mut decoder = SseDecoder::new(32);
        let mut chunk = b"data: {\"workload\":\"rppg\"}\n\ndata: ".to_vec();
        chunk.extend_from_slice(&[b'x'; 40]);
        chunk.extend_from_slice(b"\n\ndata: after\n\n");

        let decoded = decoder.push(&chunk);
        assert_eq!(
            data_frames(&decoded.frames),
            vec!["{\"workload\":\"rppg\"}", "after"]
        );
        assert_eq!(decoded.errors, vec![SseError::FrameTooLarge { limit: 32 }]);
    }

    #[test]
    fn test_remaining_lines_of_oversized_frame_are_dropped() {
        let mut decoder = SseDecoder::new(12);
        let decoded = decoder.push(b"data: aaaa\ndata: bbbb\ndata: cccc\ndata: dddd\n\n");
        assert!(decoded.frames.is_empty());
        assert_eq!(decoded.errors, vec![SseError::FrameTooLarge { limit: 12 }]);

        assert_eq!(decoder.push(b""), Decoded::default());
        assert_eq!(decoder.finish(), None);

        let decoded = decoder.push(b"data: ok\n\n");
        assert_eq!(data_frames(&decoded.frames), vec!["ok"]);
    }

    #[test]
    fn test_oversized_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new(12);
        let decoded = decoder.push(b"data: aaaa\ndata: bbbb\ndata: cccc\n");
        assert_eq!(decoded.errors.len(), 1);

        let decoded = decoder.push(b"event: tail\ndata: dddd\n");
        assert_eq!(decoded, Decoded::default());

        let decoded = decoder.push(b"\ndata: ok\n\n");
        assert_eq!(data_frames(&decoded.frames), vec!["ok"]);
        assert!(decoded.errors.is_empty());
    }

    #[test]
    fn test_unterminated_oversized_frame_is_not_flushed() {
        let mut decoder = SseDecoder::new(12);
        let decoded = decoder.push(b"data: aaaa\ndata: bbbb\ndata: cccc\ndata: dd");
        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_workload_event_parsing() {
        let frame = SseFrame {
            event: None,
            data: r#"{"workload":"mdpnp","timestamp":"2024-05-01T10:00:00Z","data":{"HR":80}}"#
                .to_string(),
            id: None,
        };
        let event = WorkloadEvent::from_frame(&frame).unwrap();
        assert_eq!(event.workload, "mdpnp");
        assert_eq!(event.data.get("HR"), Some(&serde_json::json!(80)));
        assert!(event.timestamp.is_some());
    }

    #[test]
    fn test_workload_falls_back_to_event_name() {
        let frame = SseFrame {
            event: Some("3d-pose".to_string()),
            data: r#"{"data":{"activity":"walking"}}"#.to_string(),
            id: None,
        };
        assert_eq!(WorkloadEvent::from_frame(&frame).unwrap().workload, "3d-pose");

        let anonymous = SseFrame {
            data: "{}".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            WorkloadEvent::from_frame(&anonymous),
            Err(EventParseError::MissingWorkload)
        ));

        let garbage = SseFrame {
            data: "not json".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            WorkloadEvent::from_frame(&garbage),
            Err(EventParseError::InvalidJson(_))
        ));
    }
}
