use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{is_truthy, SahayakApiError};

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One conversation turn in the generation body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::text(Role::Model, text)
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            model: model.into(),
            contents,
        }
    }

    /// Single-turn request carrying one user prompt.
    pub fn from_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model, vec![Content::user(prompt)])
    }
}

/// Body of `POST /api/generate_mermaid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagramReply {
    pub diagram: Option<String>,
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisReply {
    pub analysis: Option<String>,
    pub error: Option<Value>,
}

/// Recorded reading plus the passage the student was asked to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingSample {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub original_text: String,
}

impl ReadingSample {
    /// Browser recordings are WebM/Opus.
    pub const DEFAULT_MIME_TYPE: &'static str = "audio/webm";

    pub fn new(audio: Vec<u8>, original_text: impl Into<String>) -> Self {
        Self {
            audio,
            file_name: "recording.webm".to_string(),
            mime_type: Self::DEFAULT_MIME_TYPE.to_string(),
            original_text: original_text.into(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// `{success, data, count, error}` wrapper returned by the dashboard routes.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub count: Option<usize>,
    pub error: Option<Value>,
}

impl<T> Envelope<T> {
    /// Unwraps `data`, failing on a truthy `error` or `success: false`.
    pub fn into_data(self) -> Result<T, SahayakApiError> {
        if let Some(error) = self.error.as_ref().filter(|error| is_truthy(error)) {
            return Err(match error {
                Value::String(message) => SahayakApiError::Upstream {
                    message: message.trim().to_string(),
                },
                other => SahayakApiError::upstream(other),
            });
        }
        if !self.success {
            return Err(SahayakApiError::Upstream {
                message: "backend reported failure without an error message".to_string(),
            });
        }
        self.data.ok_or(SahayakApiError::MissingField("data"))
    }
}

/// Filters for `GET /api/students`. The backend applies `grade` first and
/// ignores `teacher_id` when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
}

impl StudentQuery {
    pub fn grade(grade: impl Into<String>) -> Self {
        Self {
            grade: Some(grade.into()),
            teacher_id: None,
        }
    }

    pub fn teacher(teacher_id: impl Into<String>) -> Self {
        Self {
            grade: None,
            teacher_id: Some(teacher_id.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub grade: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersonalInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Student document. Only the identifying fields are typed; academic and
/// behavioral profiles stay as raw JSON in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: String,
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalkingPoint {
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub supporting_data: Value,
    #[serde(default)]
    pub action_required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingOverview {
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub meeting_date: String,
    #[serde(default)]
    pub total_talking_points: usize,
    #[serde(default)]
    pub high_priority_items: usize,
    #[serde(default)]
    pub action_items: usize,
    #[serde(default)]
    pub overall_recommendation: String,
}

/// Generated talking points, grouped by category (`academic`, `behavioral`,
/// `social`, `goals`, `recommendations`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TalkingPoints {
    #[serde(default)]
    pub meeting_summary: MeetingOverview,
    #[serde(default)]
    pub talking_points_by_category: BTreeMap<String, Vec<TalkingPoint>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `data` of `GET /api/students/<id>/talking-points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalkingPointsReport {
    pub talking_points: TalkingPoints,
    /// Formatted agenda text, or `{"error": ...}` when the backend cannot
    /// build one.
    #[serde(default)]
    pub meeting_agenda: Value,
    #[serde(default)]
    pub generated_at: String,
}

impl TalkingPointsReport {
    pub fn agenda_text(&self) -> Option<&str> {
        self.meeting_agenda.as_str()
    }
}

/// One assessment record. The backend stores whatever fields it is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Assessment {
    /// Builds an assessment from a JSON object; any other value is rejected.
    pub fn from_value(value: Value) -> Result<Self, SahayakApiError> {
        match value {
            Value::Object(mut fields) => {
                let id = match fields.remove("id") {
                    Some(Value::String(id)) => Some(id),
                    Some(other) => {
                        fields.insert("id".to_string(), other);
                        None
                    }
                    None => None,
                };
                Ok(Self { id, fields })
            }
            other => Err(SahayakApiError::InvalidRequest(format!(
                "assessment must be a JSON object, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssessmentCreated {
    pub assessment_id: String,
}

/// Body of `POST /api/meeting-summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSummaryRequest {
    pub student_id: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub student_id: String,
}

/// `data` of `POST /api/meeting-summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub meeting_summary: String,
    #[serde(default)]
    pub student_info: StudentInfo,
    #[serde(default)]
    pub talking_points: TalkingPoints,
    #[serde(default)]
    pub generated_at: String,
}

/// Plain-text agenda served by `GET /api/students/<id>/download-agenda`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaDownload {
    /// From `Content-Disposition`, when the backend sent one.
    pub file_name: Option<String>,
    pub text: String,
}
