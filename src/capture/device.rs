use serde::{Deserialize, Serialize};

/// Kind of capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Video input
    Camera,
    /// Audio input
    Microphone,
}

/// A capture device as reported by the platform
///
/// The label stays empty until the user has granted media permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Opaque identifier, stable per physical device
    pub id: String,
    pub kind: DeviceKind,
    pub label: String,
}

impl Device {
    pub fn new(id: impl Into<String>, kind: DeviceKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
        }
    }

    /// Label to show in a picker, falling back to "Camera N" / "Microphone N"
    ///
    /// `position` is the zero-based index of the device within its kind.
    pub fn display_label(&self, position: usize) -> String {
        if !self.label.is_empty() {
            return self.label.clone();
        }

        match self.kind {
            DeviceKind::Camera => format!("Camera {}", position + 1),
            DeviceKind::Microphone => format!("Microphone {}", position + 1),
        }
    }
}

/// Enumerated devices partitioned by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceList {
    pub cameras: Vec<Device>,
    pub microphones: Vec<Device>,
}

impl DeviceList {
    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let (cameras, microphones): (Vec<Device>, Vec<Device>) = devices
            .into_iter()
            .partition(|device| device.kind == DeviceKind::Camera);

        Self {
            cameras,
            microphones,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty() && self.microphones.is_empty()
    }

    pub fn first_camera(&self) -> Option<&Device> {
        self.cameras.first()
    }

    pub fn first_microphone(&self) -> Option<&Device> {
        self.microphones.first()
    }

    /// Picker entries as (device id, display label) pairs
    pub fn picker_entries(&self, kind: DeviceKind) -> Vec<(String, String)> {
        let devices = match kind {
            DeviceKind::Camera => &self.cameras,
            DeviceKind::Microphone => &self.microphones,
        };

        devices
            .iter()
            .enumerate()
            .map(|(position, device)| (device.id.clone(), device.display_label(position)))
            .collect()
    }
}

/// Selected camera and microphone
///
/// An empty id means "use the platform default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub video_source: String,
    #[serde(default)]
    pub audio_source: String,
}

impl CaptureConfig {
    pub fn new(video_source: impl Into<String>, audio_source: impl Into<String>) -> Self {
        Self {
            video_source: video_source.into(),
            audio_source: audio_source.into(),
        }
    }

    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            video: DeviceConstraint::from_selection(&self.video_source),
            audio: DeviceConstraint::from_selection(&self.audio_source),
        }
    }
}

/// How a single track should be matched to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceConstraint {
    /// Any capable device
    Default,
    /// Only the device with this id
    Exact(String),
}

impl DeviceConstraint {
    fn from_selection(id: &str) -> Self {
        if id.is_empty() {
            Self::Default
        } else {
            Self::Exact(id.to_string())
        }
    }
}

/// Constraints for a camera + microphone acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: DeviceConstraint,
    pub audio: DeviceConstraint,
}
