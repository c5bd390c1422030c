// HTML pages served by the gate
//
// Markup is intentionally bare; the capture flow is driven through the
// /capture JSON API.

use crate::auth::UserSession;
use crate::capture::{DeviceKind, DeviceList};
use crate::session::{CaptureStatus, RecordingState};

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n\
         <head><meta charset=\"utf-8\"><title>{}</title></head>\n\
         <body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

pub fn login_page() -> String {
    page(
        "Video Capture App",
        "<main class=\"login\">\n<h1>Video Capture App</h1>\n\
         <a href=\"/auth/login\">Sign in</a>\n</main>",
    )
}

fn device_picker(
    name: &str,
    label: &str,
    devices: &DeviceList,
    kind: DeviceKind,
    selected: &str,
) -> String {
    let options: String = devices
        .picker_entries(kind)
        .into_iter()
        .map(|(id, text)| {
            let selected_attr = if id == selected { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                escape(&id),
                selected_attr,
                escape(&text)
            )
        })
        .collect();

    format!(
        "<label>{}<select name=\"{}\">{}</select></label>",
        label, name, options
    )
}

pub fn capture_page(
    user: &UserSession,
    devices: &DeviceList,
    status: &CaptureStatus,
    notice: Option<&str>,
) -> String {
    let mut body = String::new();

    body.push_str(&format!(
        "<header><h1>Media Recorder</h1><span class=\"user\">{}</span>\
         <img src=\"{}\" alt=\"{}\" width=\"24\" height=\"24\">\
         <a href=\"/auth/logout\">Sign out</a></header>\n",
        escape(&user.name),
        escape(&user.picture),
        escape(&user.name)
    ));

    if let Some(notice) = notice {
        body.push_str(&format!("<p class=\"notice\">{}</p>\n", escape(notice)));
    }

    body.push_str("<section class=\"devices\"><h2>Device Settings</h2>");
    body.push_str(&device_picker(
        "videoSource",
        "Camera",
        devices,
        DeviceKind::Camera,
        &status.selection.video_source,
    ));
    body.push_str(&device_picker(
        "audioSource",
        "Microphone",
        devices,
        DeviceKind::Microphone,
        &status.selection.audio_source,
    ));
    body.push_str("</section>\n");

    if !status.camera_active {
        body.push_str(
            "<section class=\"preview\"><p>Camera preview will appear here</p></section>\n",
        );
    }

    if let Some(recording) = &status.recording {
        let truncated = if recording.complete {
            ""
        } else {
            "<p class=\"notice\">Recording may be truncated</p>"
        };
        body.push_str(&format!(
            "<section class=\"recorded\"><h2>Recorded Video</h2>{}\
             <video controls src=\"/capture/recording?url={}\"></video>\
             <a href=\"/capture/recording/download\">Download Video</a></section>\n",
            truncated,
            escape(&recording.url)
        ));
    }

    let recording_status = match status.recording_state {
        RecordingState::Recording => "Recording...",
        RecordingState::Idle | RecordingState::Finished => "Ready",
    };

    body.push_str(&format!(
        "<footer><p>Camera Status: {}</p><p>Recording Status: {}</p></footer>",
        if status.camera_active { "Active" } else { "Inactive" },
        recording_status
    ));

    page("Media Recorder", &body)
}
