//! Time-keyed animation event markers (footsteps, impacts, whooshes) with
//! wrap-around emission for looped playback.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimEventType {
    Footstep,
    Impact,
    Whoosh,
    Custom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimEventMarker {
    pub time: f32,
    pub event_type: AnimEventType,
    pub sound_path: String,
    pub volume: f32,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimEventData {
    pub event_type: AnimEventType,
    pub sound_path: String,
    pub volume: f32,
    pub tag: String,
    pub trigger_time: f32,
}

impl AnimEventData {
    fn from_marker(marker: &AnimEventMarker) -> Self {
        Self {
            event_type: marker.event_type,
            sound_path: marker.sound_path.clone(),
            volume: marker.volume,
            tag: marker.tag.clone(),
            trigger_time: marker.time,
        }
    }
}

pub type ClipId = u32;
pub const INVALID_CLIP_ID: ClipId = 0;

type AnimEventCallback = Box<dyn FnMut(&AnimEventData) + Send>;

struct ClipData {
    name: String,
    markers: Vec<AnimEventMarker>,
}

/// Registry of named clips with time-sorted markers.
#[derive(Default)]
pub struct AnimationEvents {
    clips: HashMap<ClipId, ClipData>,
    next_clip_id: ClipId,
    callback: Option<AnimEventCallback>,
}

impl AnimationEvents {
    pub fn new() -> Self {
        Self {
            clips: HashMap::new(),
            next_clip_id: 1,
            callback: None,
        }
    }

    pub fn register_clip(&mut self, name: &str) -> ClipId {
        let id = self.next_clip_id;
        self.next_clip_id += 1;
        self.clips.insert(
            id,
            ClipData {
                name: name.to_string(),
                markers: Vec::new(),
            },
        );
        id
    }

    /// Insert keeping markers sorted by time.
    pub fn add_marker(&mut self, clip: ClipId, marker: AnimEventMarker) {
        let Some(data) = self.clips.get_mut(&clip) else {
            return;
        };
        let pos = data.markers.partition_point(|m| m.time < marker.time);
        data.markers.insert(pos, marker);
    }

    pub fn clear_markers(&mut self, clip: ClipId) {
        if let Some(data) = self.clips.get_mut(&clip) {
            data.markers.clear();
        }
    }

    pub fn remove_clip(&mut self, clip: ClipId) {
        self.clips.remove(&clip);
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn marker_count(&self, clip: ClipId) -> usize {
        self.clips.get(&clip).map_or(0, |data| data.markers.len())
    }

    pub fn clip_name(&self, clip: ClipId) -> Option<&str> {
        self.clips.get(&clip).map(|data| data.name.as_str())
    }

    pub fn set_event_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&AnimEventData) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Markers covered by the playback step `(prev, curr]`. When `curr <
    /// prev` the clip looped: emit `(prev, end]` then `[0, curr]`, in time
    /// order within each span. Each emission is also delivered to the
    /// registered callback.
    pub fn process_events(&mut self, clip: ClipId, prev: f32, curr: f32) -> Vec<AnimEventData> {
        let Some(data) = self.clips.get(&clip) else {
            return Vec::new();
        };
        if data.markers.is_empty() {
            return Vec::new();
        }

        let mut emitted = Vec::new();
        if curr >= prev {
            for marker in &data.markers {
                if marker.time > prev && marker.time <= curr {
                    emitted.push(AnimEventData::from_marker(marker));
                }
            }
        } else {
            for marker in &data.markers {
                if marker.time > prev {
                    emitted.push(AnimEventData::from_marker(marker));
                }
            }
            for marker in &data.markers {
                if marker.time <= curr {
                    emitted.push(AnimEventData::from_marker(marker));
                }
            }
        }

        if let Some(callback) = self.callback.as_mut() {
            for event in &emitted {
                callback(event);
            }
        }
        emitted
    }
}
