use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bytes::Bytes;
use futures_util::stream::{self, FusedStream, StreamExt};
use sahayak_api::{SahayakApiError, TokenStream};

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn chunked(chunks: &[&str]) -> Vec<Result<Bytes, SahayakApiError>> {
    chunks
        .iter()
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk.as_bytes())))
        .collect()
}

fn tracked_stream(
    chunks: Vec<Result<Bytes, SahayakApiError>>,
) -> (TokenStream, Arc<AtomicBool>) {
    let dropped = Arc::new(AtomicBool::new(false));
    let flag = DropFlag(Arc::clone(&dropped));
    let source = stream::iter(chunks).map(move |chunk| {
        let _held = &flag;
        chunk
    });
    (TokenStream::new(source), dropped)
}

#[tokio::test]
async fn token_stream_yields_tokens_across_chunks() {
    let stream = TokenStream::new(stream::iter(chunked(&[
        "data: {\"text\":\"He",
        "l\"}\n",
        "\ndata: {\"text\":\"lo\"}\n\n",
    ])));

    let tokens: Vec<String> = stream
        .map(|token| token.expect("token"))
        .collect()
        .await;
    assert_eq!(tokens, vec!["Hel", "lo"]);
}

#[tokio::test]
async fn token_stream_flushes_unterminated_tail() {
    let text = TokenStream::new(stream::iter(chunked(&[
        "data: {\"text\":\"A\"}\n\n",
        "data: {\"text\":\"B\"}",
    ])))
    .collect_text()
    .await
    .expect("tail record");
    assert_eq!(text, "AB");
}

#[tokio::test]
async fn token_stream_terminates_on_upstream_error() {
    let (mut stream, dropped) = tracked_stream(chunked(&[
        "data: {\"text\":\"A\"}\n\ndata: {\"error\":{\"message\":\"boom\"}}\n\n",
        "data: {\"text\":\"B\"}\n\n",
    ]));

    assert_eq!(stream.next().await.expect("first").expect("token"), "A");
    assert!(!dropped.load(Ordering::Acquire));

    let error = stream
        .next()
        .await
        .expect("second item")
        .expect_err("upstream error");
    assert_eq!(error.to_string(), "boom");
    assert!(dropped.load(Ordering::Acquire), "source released on error");
    assert!(!stream.holds_source());

    assert!(stream.next().await.is_none());
    assert!(stream.is_terminated());
}

#[tokio::test]
async fn token_stream_releases_source_on_completion() {
    let (mut stream, dropped) = tracked_stream(chunked(&["data: {\"text\":\"only\"}\n\n"]));

    assert_eq!(stream.next().await.expect("token").expect("ok"), "only");
    assert!(stream.next().await.is_none());
    assert!(dropped.load(Ordering::Acquire));
    assert!(stream.is_terminated());
}

#[tokio::test]
async fn token_stream_propagates_source_errors() {
    let (mut stream, dropped) = tracked_stream(vec![
        Ok(Bytes::from_static(b"data: {\"text\":\"partial\"}\n\n")),
        Err(SahayakApiError::InvalidRequest("connection dropped".to_string())),
        Ok(Bytes::from_static(b"data: {\"text\":\"never\"}\n\n")),
    ]);

    assert_eq!(stream.next().await.expect("token").expect("ok"), "partial");
    let error = stream.next().await.expect("item").expect_err("source error");
    assert!(error.to_string().contains("connection dropped"));
    assert!(dropped.load(Ordering::Acquire));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn token_stream_fails_on_malformed_record() {
    let error = TokenStream::new(stream::iter(chunked(&["data: {\"text\":\"x\"}\n\ndata: nope\n\n"])))
        .collect_text()
        .await
        .expect_err("malformed");
    assert!(matches!(error, SahayakApiError::MalformedRecord { .. }));
}

#[tokio::test]
async fn token_stream_of_empty_body_is_empty() {
    let (mut stream, dropped) = tracked_stream(Vec::new());
    assert!(stream.next().await.is_none());
    assert!(dropped.load(Ordering::Acquire));
}
