use ::url::Url;

use crate::error::SahayakApiError;

/// Default origin of a locally running backend.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

pub const GENERATE_PATH: &str = "/api/generate";
pub const DIAGRAM_PATH: &str = "/api/generate_mermaid";
pub const ANALYZE_READING_PATH: &str = "/api/analyze_reading";
pub const STUDENTS_PATH: &str = "/api/students";
pub const MEETING_SUMMARY_PATH: &str = "/api/meeting-summary";

pub const TALKING_POINTS_SEGMENT: &str = "talking-points";
pub const ASSESSMENTS_SEGMENT: &str = "assessments";
pub const DOWNLOAD_AGENDA_SEGMENT: &str = "download-agenda";

/// Join a backend base URL with an `/api/...` path.
///
/// A path prefix on the base (e.g. a reverse-proxy mount) is preserved, and
/// a blank base falls back to [`DEFAULT_BASE_URL`].
pub fn join_endpoint(base: &str, path: &str) -> Result<String, SahayakApiError> {
    let base = if base.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        base.trim()
    };

    let mut url =
        Url::parse(base).map_err(|error| SahayakApiError::InvalidBaseUrl(format!("{base}: {error}")))?;
    if url.cannot_be_a_base() {
        return Err(SahayakApiError::InvalidBaseUrl(base.to_string()));
    }

    let prefix = url.path().trim_end_matches('/').to_string();
    let suffix = path.trim_start_matches('/');
    url.set_path(&format!("{prefix}/{suffix}"));
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

/// `/api/students/<id>[/<segment>]` under `base`.
///
/// The student id is percent-encoded as a single path segment, so ids
/// containing `/` or `?` cannot address another route.
pub fn student_endpoint(
    base: &str,
    student_id: &str,
    segment: Option<&str>,
) -> Result<String, SahayakApiError> {
    let student_id = student_id.trim();
    if student_id.is_empty() {
        return Err(SahayakApiError::InvalidRequest(
            "student id is empty".to_string(),
        ));
    }

    let joined = join_endpoint(base, STUDENTS_PATH)?;
    let mut url = Url::parse(&joined)
        .map_err(|error| SahayakApiError::InvalidBaseUrl(format!("{joined}: {error}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| SahayakApiError::InvalidBaseUrl(joined.clone()))?;
        segments.push(student_id);
        if let Some(segment) = segment {
            segments.push(segment);
        }
    }
    Ok(url.to_string())
}
