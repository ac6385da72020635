//! Existence detection.
//!
//! Maps a completed HTTP response onto a probe status using the site's
//! detection rule. Pure and synchronous; transport failures never reach here.

use crate::types::{DetectionType, ProbeStatus};

/// Result of classifying one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: ProbeStatus,
    /// Set for `Unknown`, recording the unexpected status code
    pub detail: Option<String>,
}

impl Classification {
    fn of(status: ProbeStatus) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    fn unexpected(status_code: u16) -> Self {
        Self {
            status: ProbeStatus::Unknown,
            detail: Some(format!("Unexpected status: {}", status_code)),
        }
    }
}

/// Classify a response for a site.
///
/// * `StatusCode`: 200 is found, 404 is not found.
/// * `MessageBody`: 404 is not found; a 200 whose body contains `error_marker`
///   (case-insensitive) is a soft-404, any other 200 is found.
///
/// Every other status code is `Unknown`. An empty marker never matches.
pub fn classify(
    detection_type: DetectionType,
    status_code: u16,
    body: &str,
    error_marker: Option<&str>,
) -> Classification {
    match (detection_type, status_code) {
        (_, 404) => Classification::of(ProbeStatus::NotFound),
        (DetectionType::StatusCode, 200) => Classification::of(ProbeStatus::Found),
        (DetectionType::MessageBody, 200) => {
            if contains_marker(body, error_marker) {
                Classification::of(ProbeStatus::NotFound)
            } else {
                Classification::of(ProbeStatus::Found)
            }
        }
        (_, code) => Classification::unexpected(code),
    }
}

fn contains_marker(body: &str, marker: Option<&str>) -> bool {
    match marker {
        Some(marker) if !marker.is_empty() => {
            body.to_lowercase().contains(&marker.to_lowercase())
        }
        _ => false,
    }
}
