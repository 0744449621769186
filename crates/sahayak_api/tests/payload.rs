use sahayak_api::payload::{
    DiagramRequest, Envelope, MeetingSummaryRequest, Role, TalkingPointsReport,
};
use sahayak_api::{
    Assessment, Content, GenerateRequest, ReadingSample, SahayakApiError, StudentProfile,
    StudentQuery,
};
use serde_json::json;

#[test]
fn generate_request_serializes_model_and_contents() {
    let request = GenerateRequest::new(
        "gemini-1.5-flash",
        vec![
            Content::user("Explain photosynthesis"),
            Content::model("Plants convert light"),
            Content::user("Simpler please"),
        ],
    );

    let value = serde_json::to_value(&request).expect("serialize request");
    assert_eq!(
        value,
        json!({
            "model": "gemini-1.5-flash",
            "contents": [
                {"role": "user", "parts": [{"text": "Explain photosynthesis"}]},
                {"role": "model", "parts": [{"text": "Plants convert light"}]},
                {"role": "user", "parts": [{"text": "Simpler please"}]},
            ]
        })
    );
}

#[test]
fn from_prompt_builds_single_user_turn() {
    let request = GenerateRequest::from_prompt("m", "hello");
    assert_eq!(request.contents.len(), 1);
    assert_eq!(request.contents[0].role, Role::User);
    assert_eq!(request.contents[0].parts[0].text, "hello");
}

#[test]
fn generate_request_round_trips_browser_shape() {
    let body = r#"{"model":"gemini-1.5-flash","contents":[{"role":"user","parts":[{"text":"hi"}]}]}"#;
    let request: GenerateRequest = serde_json::from_str(body).expect("deserialize");
    assert_eq!(request, GenerateRequest::from_prompt("gemini-1.5-flash", "hi"));
}

#[test]
fn diagram_request_carries_prompt() {
    let value = serde_json::to_value(DiagramRequest {
        prompt: "water cycle".to_string(),
    })
    .expect("serialize");
    assert_eq!(value, json!({"prompt": "water cycle"}));
}

#[test]
fn reading_sample_defaults_to_webm() {
    let sample = ReadingSample::new(vec![1, 2, 3], "The cat sat.");
    assert_eq!(sample.mime_type, "audio/webm");
    assert_eq!(sample.file_name, "recording.webm");

    let sample = sample
        .with_file_name("take2.ogg")
        .with_mime_type("audio/ogg");
    assert_eq!(sample.mime_type, "audio/ogg");
    assert_eq!(sample.file_name, "take2.ogg");
}

#[test]
fn student_profile_keeps_untyped_sections() {
    let value = json!({
        "studentId": "STU001",
        "personalInfo": {"firstName": "Asha", "lastName": "Rao", "grade": "5", "section": "B"},
        "academicProfile": {"currentGPA": 3.4, "learningStyle": "Visual"},
    });

    let profile: StudentProfile = serde_json::from_value(value.clone()).expect("profile");
    assert_eq!(profile.student_id, "STU001");
    assert_eq!(profile.personal_info.full_name(), "Asha Rao");
    assert_eq!(profile.personal_info.grade, "5");
    assert_eq!(profile.personal_info.extra["section"], "B");
    assert_eq!(profile.details["academicProfile"]["learningStyle"], "Visual");
    assert_eq!(serde_json::to_value(&profile).expect("serialize"), value);
}

#[test]
fn student_query_omits_unset_filters() {
    assert_eq!(
        serde_json::to_value(StudentQuery::default()).expect("serialize"),
        json!({})
    );
    assert_eq!(
        serde_json::to_value(StudentQuery::grade("4")).expect("serialize"),
        json!({"grade": "4"})
    );
}

#[test]
fn envelope_unwraps_data() {
    let envelope: Envelope<Vec<StudentProfile>> = serde_json::from_value(json!({
        "success": true,
        "data": [{"studentId": "STU002"}],
        "count": 1,
    }))
    .expect("envelope");
    assert_eq!(envelope.count, Some(1));

    let students = envelope.into_data().expect("data");
    assert_eq!(students[0].student_id, "STU002");
    assert_eq!(students[0].personal_info.full_name(), "");
}

#[test]
fn envelope_failure_becomes_upstream_error() {
    let envelope: Envelope<StudentProfile> =
        serde_json::from_value(json!({"success": false, "error": "Database not available"}))
            .expect("envelope");
    let error = envelope.into_data().expect_err("failure");
    assert!(error.is_upstream());
    assert_eq!(error.to_string(), "Database not available");

    let envelope: Envelope<StudentProfile> =
        serde_json::from_value(json!({"success": false})).expect("envelope");
    assert!(envelope.into_data().expect_err("failure").is_upstream());

    let envelope: Envelope<StudentProfile> =
        serde_json::from_value(json!({"success": true})).expect("envelope");
    assert!(matches!(
        envelope.into_data(),
        Err(SahayakApiError::MissingField("data"))
    ));
}

#[test]
fn talking_points_report_exposes_agenda_text() {
    let report: TalkingPointsReport = serde_json::from_value(json!({
        "talking_points": {
            "meeting_summary": {
                "student_name": "Asha Rao",
                "grade": "5",
                "meeting_date": "2024-05-01",
                "total_talking_points": 2,
                "high_priority_items": 1,
                "action_items": 1,
                "overall_recommendation": "Keep going"
            },
            "talking_points_by_category": {
                "academic": [{
                    "priority": "high",
                    "title": "Math support",
                    "content": "Fractions need review",
                    "supporting_data": {"score": 61},
                    "action_required": true
                }],
                "social": []
            },
            "student_data_summary": {"gpa": 3.1}
        },
        "meeting_agenda": "PARENT-TEACHER MEETING AGENDA",
        "generated_at": "2024-05-01"
    }))
    .expect("report");

    assert_eq!(report.agenda_text(), Some("PARENT-TEACHER MEETING AGENDA"));
    let points = &report.talking_points;
    assert_eq!(points.meeting_summary.high_priority_items, 1);
    assert!(points.talking_points_by_category["academic"][0].action_required);
    assert_eq!(points.extra["student_data_summary"]["gpa"], 3.1);

    let missing: TalkingPointsReport = serde_json::from_value(json!({
        "talking_points": {},
        "meeting_agenda": {"error": "Meeting agenda generation not available"}
    }))
    .expect("report");
    assert_eq!(missing.agenda_text(), None);
}

#[test]
fn assessment_from_value_requires_object() {
    let assessment = Assessment::from_value(json!({"id": "a1", "subject": "Math", "score": 85}))
        .expect("object");
    assert_eq!(assessment.id.as_deref(), Some("a1"));
    assert_eq!(
        serde_json::to_value(&assessment).expect("serialize"),
        json!({"id": "a1", "subject": "Math", "score": 85})
    );

    assert!(matches!(
        Assessment::from_value(json!([1, 2])),
        Err(SahayakApiError::InvalidRequest(_))
    ));
}

#[test]
fn meeting_summary_request_shape() {
    let request = MeetingSummaryRequest {
        student_id: "STU001".to_string(),
        notes: "Met with parent last month".to_string(),
    };
    assert_eq!(
        serde_json::to_value(request).expect("serialize"),
        json!({"student_id": "STU001", "notes": "Met with parent last month"})
    );
}
