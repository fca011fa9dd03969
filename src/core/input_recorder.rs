//! Input capture and replay: a three-state recorder producing a versioned
//! JSON structure of per-frame event lists.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub const RECORDING_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderMode {
    Idle,
    Recording,
    Playing,
}

/// Event type categories, stored as raw numeric values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum InputEventType {
    KeyDown = 0,
    KeyUp = 1,
    MouseMotion = 2,
    MouseButtonDown = 3,
    MouseButtonUp = 4,
    MouseWheel = 5,
    TextInput = 6,
}

bitflags! {
    /// Modifier key bitmask; the wire carries the raw bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputModifiers: u16 {
        const SHIFT = 0x0001;
        const CTRL  = 0x0002;
        const ALT   = 0x0004;
        const GUI   = 0x0008;
    }
}

/// Backend-independent serializable input event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SerializedEvent {
    pub event_type: u32,
    pub keycode: i32,
    pub mouse_x: i32,
    pub mouse_y: i32,
    pub mouse_delta_x: i32,
    pub mouse_delta_y: i32,
    pub button: u8,
    pub modifiers: u16,
    pub text: String,
}

impl SerializedEvent {
    pub fn modifier_flags(&self) -> InputModifiers {
        InputModifiers::from_bits_truncate(self.modifiers)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputFrame {
    pub frame_number: u64,
    pub delta_time: f32,
    pub events: Vec<SerializedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputRecordingMetadata {
    pub version: String,
    pub description: String,
    pub total_frames: u64,
    pub total_duration: f32,
}

impl Default for InputRecordingMetadata {
    fn default() -> Self {
        Self {
            version: RECORDING_VERSION.to_string(),
            description: String::new(),
            total_frames: 0,
            total_duration: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputRecording {
    pub metadata: InputRecordingMetadata,
    pub frames: Vec<InputFrame>,
}

impl InputRecording {
    pub fn total_duration(&self) -> f32 {
        self.frames.iter().map(|f| f.delta_time).sum()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.metadata = InputRecordingMetadata::default();
    }
}

/// State machine over Idle / Recording / Playing.
pub struct InputRecorder {
    mode: RecorderMode,
    recording: InputRecording,
    pending_frame: InputFrame,
    frame_counter: u64,
    playback_cursor: usize,
}

impl Default for InputRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRecorder {
    pub fn new() -> Self {
        Self {
            mode: RecorderMode::Idle,
            recording: InputRecording::default(),
            pending_frame: InputFrame::default(),
            frame_counter: 0,
            playback_cursor: 0,
        }
    }

    pub fn mode(&self) -> RecorderMode {
        self.mode
    }

    pub fn is_recording(&self) -> bool {
        self.mode() == RecorderMode::Recording
    }

    pub fn is_playing(&self) -> bool {
        self.mode() == RecorderMode::Playing
    }

    /// Idle -> Recording, clearing any previous recording. No-op while
    /// already Recording; rejected while Playing.
    pub fn begin_recording(&mut self) -> bool {
        match self.mode() {
            RecorderMode::Recording => true,
            RecorderMode::Playing => false,
            RecorderMode::Idle => {
                self.recording.clear();
                self.pending_frame = InputFrame::default();
                self.frame_counter = 0;
                self.mode = RecorderMode::Recording;
                true
            }
        }
    }

    /// Recording -> Idle, finalizing metadata. No-op otherwise.
    pub fn stop_recording(&mut self) {
        if self.mode() != RecorderMode::Recording {
            return;
        }
        self.recording.metadata = InputRecordingMetadata {
            version: RECORDING_VERSION.to_string(),
            description: self.recording.metadata.description.clone(),
            total_frames: self.recording.frame_count(),
            total_duration: self.recording.total_duration(),
        };
        self.mode = RecorderMode::Idle;
    }

    /// Append an event to the open frame; only meaningful while Recording.
    pub fn capture_event(&mut self, event: SerializedEvent) {
        if self.is_recording() {
            self.pending_frame.events.push(event);
        }
    }

    /// Recording: finalize the open frame with this delta and start a new
    /// one. Playing: advance the playback cursor.
    pub fn advance_frame(&mut self, delta_time: f32) {
        match self.mode() {
            RecorderMode::Recording => {
                let mut frame = std::mem::take(&mut self.pending_frame);
                frame.frame_number = self.frame_counter;
                frame.delta_time = delta_time;
                self.frame_counter += 1;
                self.recording.frames.push(frame);
            }
            RecorderMode::Playing => {
                self.playback_cursor += 1;
            }
            RecorderMode::Idle => {}
        }
    }

    /// Idle -> Playing with the cursor reset. Rejected while Recording or
    /// when the recording is empty.
    pub fn start_playback(&mut self) -> bool {
        if self.mode() != RecorderMode::Idle || self.recording.frames.is_empty() {
            return false;
        }
        self.playback_cursor = 0;
        self.mode = RecorderMode::Playing;
        true
    }

    /// Current playback frame's events; empty once exhausted. Advances the
    /// cursor.
    pub fn get_next_frame(&mut self) -> Vec<SerializedEvent> {
        if !self.is_playing() {
            return Vec::new();
        }
        match self.recording.frames.get(self.playback_cursor) {
            Some(frame) => {
                let events = frame.events.clone();
                self.playback_cursor += 1;
                events
            }
            None => Vec::new(),
        }
    }

    pub fn stop_playback(&mut self) {
        if self.is_playing() {
            self.mode = RecorderMode::Idle;
        }
    }

    pub fn recording(&self) -> &InputRecording {
        &self.recording
    }

    /// Replace the recording; only permitted while Idle.
    pub fn set_recording(&mut self, recording: InputRecording) -> bool {
        if self.mode() != RecorderMode::Idle {
            return false;
        }
        self.recording = recording;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(keycode: i32) -> SerializedEvent {
        SerializedEvent {
            event_type: InputEventType::KeyDown as u32,
            keycode,
            modifiers: InputModifiers::SHIFT.bits(),
            ..SerializedEvent::default()
        }
    }

    #[test]
    fn test_modifier_flags_roundtrip_bits() {
        let event = key_event(10);
        assert_eq!(event.modifier_flags(), InputModifiers::SHIFT);
    }

    #[test]
    fn test_begin_recording_transitions() {
        let mut recorder = InputRecorder::new();
        assert_eq!(recorder.mode(), RecorderMode::Idle);
        assert!(recorder.begin_recording());
        assert!(recorder.is_recording());
        // No-op when already recording
        assert!(recorder.begin_recording());
    }

    #[test]
    fn test_begin_recording_rejected_while_playing() {
        let mut recorder = InputRecorder::new();
        recorder.begin_recording();
        recorder.capture_event(key_event(32));
        recorder.advance_frame(0.016);
        recorder.stop_recording();

        assert!(recorder.start_playback());
        assert!(!recorder.begin_recording());
    }

    #[test]
    fn test_capture_and_frames() {
        let mut recorder = InputRecorder::new();
        recorder.begin_recording();
        recorder.capture_event(key_event(65));
        recorder.capture_event(key_event(66));
        recorder.advance_frame(0.016);
        recorder.capture_event(key_event(67));
        recorder.advance_frame(0.033);
        recorder.stop_recording();

        let recording = recorder.recording();
        assert_eq!(recording.frame_count(), 2);
        assert_eq!(recording.frames[0].events.len(), 2);
        assert_eq!(recording.frames[0].frame_number, 0);
        assert_eq!(recording.frames[1].events.len(), 1);
        assert_eq!(recording.metadata.total_frames, 2);
        assert!((recording.metadata.total_duration - 0.049).abs() < 1e-5);
    }

    #[test]
    fn test_playback_replays_then_exhausts() {
        let mut recorder = InputRecorder::new();
        recorder.begin_recording();
        recorder.capture_event(key_event(1));
        recorder.advance_frame(0.016);
        recorder.capture_event(key_event(2));
        recorder.advance_frame(0.016);
        recorder.stop_recording();

        assert!(recorder.start_playback());
        assert_eq!(recorder.get_next_frame()[0].keycode, 1);
        assert_eq!(recorder.get_next_frame()[0].keycode, 2);
        assert!(recorder.get_next_frame().is_empty());
        assert!(recorder.get_next_frame().is_empty());
    }

    #[test]
    fn test_playback_rejected_when_empty() {
        let mut recorder = InputRecorder::new();
        assert!(!recorder.start_playback());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut recorder = InputRecorder::new();
        recorder.begin_recording();
        recorder.capture_event(SerializedEvent {
            event_type: InputEventType::MouseMotion as u32,
            mouse_x: 100,
            mouse_y: 200,
            mouse_delta_x: 5,
            mouse_delta_y: -3,
            ..SerializedEvent::default()
        });
        recorder.advance_frame(0.016);
        recorder.stop_recording();

        let json = serde_json::to_string(recorder.recording()).unwrap();
        let restored: InputRecording = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, recorder.recording());
        assert_eq!(restored.metadata.version, "1.0");
    }

    #[test]
    fn test_permissive_deserialization_defaults_fields() {
        let json = r#"{"frames":[{"frameNumber":0,"events":[{"eventType":2}]}]}"#;
        let recording: InputRecording = serde_json::from_str(json).unwrap();
        assert_eq!(recording.frames.len(), 1);
        assert_eq!(recording.frames[0].events[0].event_type, 2);
        assert_eq!(recording.frames[0].events[0].keycode, 0);
        assert_eq!(recording.metadata.version, "1.0");
    }

    #[test]
    fn test_set_recording_only_while_idle() {
        let mut recorder = InputRecorder::new();
        recorder.begin_recording();
        assert!(!recorder.set_recording(InputRecording::default()));
        recorder.stop_recording();
        assert!(recorder.set_recording(InputRecording::default()));
    }
}
