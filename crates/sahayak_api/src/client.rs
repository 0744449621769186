use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_DISPOSITION, USER_AGENT};
use reqwest::multipart::{Form, Part as MultipartPart};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::SahayakConfig;
use crate::diagram::normalize_flowchart;
use crate::error::{is_truthy, parse_error_message, SahayakApiError};
use crate::payload::{
    AgendaDownload, AnalysisReply, Assessment, AssessmentCreated, DiagramReply, DiagramRequest,
    Envelope, GenerateRequest, MeetingSummary, MeetingSummaryRequest, ReadingSample,
    StudentProfile, StudentQuery, TalkingPointsReport,
};
use crate::stream::TokenStream;
use crate::url::{
    join_endpoint, student_endpoint, ANALYZE_READING_PATH, ASSESSMENTS_SEGMENT, DIAGRAM_PATH,
    DOWNLOAD_AGENDA_SEGMENT, GENERATE_PATH, MEETING_SUMMARY_PATH, STUDENTS_PATH,
    TALKING_POINTS_SEGMENT,
};

const EVENT_STREAM: &str = "text/event-stream";

#[derive(Debug)]
pub struct SahayakClient {
    http: Client,
    config: SahayakConfig,
}

impl SahayakClient {
    pub fn new(config: SahayakConfig) -> Result<Self, SahayakApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SahayakConfig {
        &self.config
    }

    pub fn endpoint(&self, path: &str) -> Result<String, SahayakApiError> {
        join_endpoint(&self.config.base_url, path)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, SahayakApiError> {
        let mut headers = HeaderMap::new();
        if let Some(user_agent) = self.config.user_agent.as_deref() {
            headers.insert(
                USER_AGENT,
                HeaderValue::from_str(user_agent).map_err(|_| {
                    SahayakApiError::InvalidRequest("invalid User-Agent header value".to_string())
                })?,
            );
        }
        for (key, value) in &self.config.extra_headers {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    SahayakApiError::InvalidRequest(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(value).map_err(|_| {
                    SahayakApiError::InvalidRequest(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(headers)
    }

    pub fn build_generate_request(
        &self,
        request: &GenerateRequest,
    ) -> Result<RequestBuilder, SahayakApiError> {
        validate_generate_request(request)?;

        Ok(self
            .http
            .post(self.endpoint(GENERATE_PATH)?)
            .headers(self.build_headers()?)
            .header(ACCEPT, EVENT_STREAM)
            .json(request))
    }

    /// Start a generation and return its lazily decoded tokens.
    pub async fn stream_generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<TokenStream, SahayakApiError> {
        info!(
            "streaming generation: model={}, {} turns",
            request.model,
            request.contents.len()
        );
        let response = self.build_generate_request(request)?.send().await?;
        let response = ensure_success(response).await?;
        Ok(TokenStream::from_response(response))
    }

    /// Drive a generation to completion, handing each token to `on_token`.
    ///
    /// Returns the concatenated reply. The first failure ends the stream and
    /// nothing after it reaches the handler.
    pub async fn stream_with_handler<F>(
        &self,
        request: &GenerateRequest,
        mut on_token: F,
    ) -> Result<String, SahayakApiError>
    where
        F: FnMut(&str),
    {
        let mut tokens = self.stream_generate(request).await?;
        let mut reply = String::new();
        while let Some(token) = tokens.next().await {
            let token = token?;
            on_token(&token);
            reply.push_str(&token);
        }
        Ok(reply)
    }

    pub async fn generate_text(&self, request: &GenerateRequest) -> Result<String, SahayakApiError> {
        self.stream_generate(request).await?.collect_text().await
    }

    /// Ask the backend for a mermaid flowchart describing `prompt`.
    pub async fn generate_diagram(&self, prompt: &str) -> Result<String, SahayakApiError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SahayakApiError::InvalidRequest(
                "diagram prompt is empty".to_string(),
            ));
        }

        let response = self
            .http
            .post(self.endpoint(DIAGRAM_PATH)?)
            .headers(self.build_headers()?)
            .json(&DiagramRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await?;
        let reply: DiagramReply = ensure_success(response).await?.json().await?;

        if let Some(error) = reply.error.as_ref().filter(|error| is_truthy(error)) {
            return Err(SahayakApiError::upstream(error));
        }
        let diagram = reply.diagram.ok_or(SahayakApiError::MissingField("diagram"))?;
        debug!("diagram received: {} lines", diagram.lines().count());
        Ok(normalize_flowchart(&diagram))
    }

    /// Upload a reading recording and return the markdown analysis.
    pub async fn analyze_reading(&self, sample: &ReadingSample) -> Result<String, SahayakApiError> {
        if sample.original_text.trim().is_empty() {
            return Err(SahayakApiError::InvalidRequest(
                "original text is missing".to_string(),
            ));
        }
        if sample.audio.is_empty() {
            return Err(SahayakApiError::InvalidRequest(
                "audio recording is empty".to_string(),
            ));
        }

        let audio = MultipartPart::bytes(sample.audio.clone())
            .file_name(sample.file_name.clone())
            .mime_str(&sample.mime_type)?;
        let form = Form::new()
            .part("audio_file", audio)
            .text("original_text", sample.original_text.clone());

        info!(
            "submitting reading analysis: {} audio bytes, {} chars of reference text",
            sample.audio.len(),
            sample.original_text.len()
        );
        let response = self
            .http
            .post(self.endpoint(ANALYZE_READING_PATH)?)
            .headers(self.build_headers()?)
            .multipart(form)
            .send()
            .await?;
        let reply: AnalysisReply = ensure_success(response).await?.json().await?;

        if let Some(error) = reply.error.as_ref().filter(|error| is_truthy(error)) {
            return Err(SahayakApiError::upstream(error));
        }
        reply.analysis.ok_or(SahayakApiError::MissingField("analysis"))
    }

    pub fn student_endpoint(
        &self,
        student_id: &str,
        segment: Option<&str>,
    ) -> Result<String, SahayakApiError> {
        student_endpoint(&self.config.base_url, student_id, segment)
    }

    /// List students, optionally filtered by grade or teacher.
    pub async fn list_students(
        &self,
        query: &StudentQuery,
    ) -> Result<Vec<StudentProfile>, SahayakApiError> {
        let request = self
            .http
            .get(self.endpoint(STUDENTS_PATH)?)
            .headers(self.build_headers()?)
            .query(query);
        let students: Vec<StudentProfile> = send_envelope(request).await?;
        debug!("listed {} students", students.len());
        Ok(students)
    }

    pub async fn get_student(&self, student_id: &str) -> Result<StudentProfile, SahayakApiError> {
        let request = self
            .http
            .get(self.student_endpoint(student_id, None)?)
            .headers(self.build_headers()?);
        send_envelope(request).await
    }

    /// Generate talking points and the meeting agenda for one student.
    pub async fn talking_points(
        &self,
        student_id: &str,
    ) -> Result<TalkingPointsReport, SahayakApiError> {
        info!("requesting talking points for student {}", student_id.trim());
        let request = self
            .http
            .get(self.student_endpoint(student_id, Some(TALKING_POINTS_SEGMENT))?)
            .headers(self.build_headers()?);
        send_envelope(request).await
    }

    /// Most recent assessments first; the backend caps the list at `limit`
    /// (10 when unset).
    pub async fn list_assessments(
        &self,
        student_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Assessment>, SahayakApiError> {
        let mut request = self
            .http
            .get(self.student_endpoint(student_id, Some(ASSESSMENTS_SEGMENT))?)
            .headers(self.build_headers()?);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        send_envelope(request).await
    }

    /// Store an assessment and return the id the backend assigned.
    pub async fn add_assessment(
        &self,
        student_id: &str,
        assessment: &Assessment,
    ) -> Result<String, SahayakApiError> {
        if assessment.fields.is_empty() {
            return Err(SahayakApiError::InvalidRequest(
                "assessment has no fields".to_string(),
            ));
        }

        let request = self
            .http
            .post(self.student_endpoint(student_id, Some(ASSESSMENTS_SEGMENT))?)
            .headers(self.build_headers()?)
            .json(assessment);
        let created: AssessmentCreated = send_envelope(request).await?;
        info!("stored assessment {}", created.assessment_id);
        Ok(created.assessment_id)
    }

    /// Ask for a parent-teacher meeting summary, with optional teacher notes.
    pub async fn meeting_summary(
        &self,
        student_id: &str,
        notes: &str,
    ) -> Result<MeetingSummary, SahayakApiError> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(SahayakApiError::InvalidRequest(
                "student id is empty".to_string(),
            ));
        }

        info!("requesting meeting summary for student {student_id}");
        let request = self
            .http
            .post(self.endpoint(MEETING_SUMMARY_PATH)?)
            .headers(self.build_headers()?)
            .json(&MeetingSummaryRequest {
                student_id: student_id.to_string(),
                notes: notes.trim().to_string(),
            });
        send_envelope(request).await
    }

    /// Fetch the plain-text meeting agenda offered as a file download.
    pub async fn download_agenda(&self, student_id: &str) -> Result<AgendaDownload, SahayakApiError> {
        let response = self
            .http
            .get(self.student_endpoint(student_id, Some(DOWNLOAD_AGENDA_SEGMENT))?)
            .headers(self.build_headers()?)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_file_name);
        let text = response.text().await?;
        Ok(AgendaDownload { file_name, text })
    }
}

async fn send_envelope<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, SahayakApiError> {
    let response = ensure_success(request.send().await?).await?;
    let envelope: Envelope<T> = response.json().await?;
    if let Some(count) = envelope.count {
        debug!("dashboard reply carries {count} items");
    }
    envelope.into_data()
}

/// `filename` parameter of a `Content-Disposition` header, unquoted.
fn attachment_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))
        .map(|name| name.trim().trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

fn validate_generate_request(request: &GenerateRequest) -> Result<(), SahayakApiError> {
    if request.model.trim().is_empty() {
        return Err(SahayakApiError::InvalidRequest("model is empty".to_string()));
    }
    if request.contents.is_empty() {
        return Err(SahayakApiError::InvalidRequest(
            "'contents' must contain at least one turn".to_string(),
        ));
    }
    if let Some(index) = request
        .contents
        .iter()
        .position(|content| content.parts.is_empty())
    {
        return Err(SahayakApiError::InvalidRequest(format!(
            "turn {index} has no parts"
        )));
    }
    Ok(())
}

async fn ensure_success(response: Response) -> Result<Response, SahayakApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = parse_error_message(status, &body);
    Err(SahayakApiError::Status { status, message })
}
