//! Framer integration tests
//!
//! Covers chunking behavior, overflow recovery and the callback contract.

use proptest::prelude::*;
use rstest::rstest;
use structclaude::{AgentError, LineFramer, MAX_BUFFER_BYTES};

const INIT: &str = r#"{"type":"system","subtype":"init","session_id":"sess-1"}"#;
const ASSISTANT: &str = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"thinking"}]}}"#;
const RESULT: &str = r#"{"type":"result","subtype":"success","is_error":false,"structured_output":{"done":true,"items":[3,1,2]}}"#;

fn transcript() -> Vec<u8> {
    format!("{INIT}\n{ASSISTANT}\n{RESULT}\n").into_bytes()
}

/// Feed `chunks` in order, stopping at the first result
fn feed_all<'a>(framer: &mut LineFramer, chunks: impl IntoIterator<Item = &'a [u8]>) -> Option<String> {
    for chunk in chunks {
        if let Some(payload) = framer.feed(chunk).unwrap() {
            return Some(payload);
        }
    }
    None
}

#[test]
fn test_split_token_robustness() {
    let mut framer = LineFramer::new();
    assert_eq!(framer.feed(br#"{"type":"result","subtype":"success""#).unwrap(), None);

    let payload = framer
        .feed(b",\"structured_output\":{\"done\":true}}\n")
        .unwrap()
        .expect("result after the line completes");
    assert!(payload.contains("\"done\":true"));
}

#[test]
fn test_three_lines_only_third_terminal() {
    let mut framer = LineFramer::new();
    let mut seen = Vec::new();

    let payload = framer
        .feed_with(&transcript(), |line| seen.push(line.to_string()))
        .unwrap();

    assert_eq!(payload.as_deref(), Some(r#"{"done":true,"items":[3,1,2]}"#));
    assert_eq!(seen, vec![INIT, ASSISTANT, RESULT]);
    assert_eq!(framer.session_id(), Some("sess-1"));
}

#[rstest]
#[case::system(r#"{"type":"system","subtype":"success","structured_output":{"x":1}}"#)]
#[case::assistant(r#"{"type":"assistant","subtype":"success","structured_output":{"x":1}}"#)]
#[case::error_result(r#"{"type":"result","subtype":"error_during_execution","structured_output":{"x":1}}"#)]
#[case::max_turns(r#"{"type":"result","subtype":"error_max_turns","is_error":true}"#)]
fn test_non_success_messages_never_complete(#[case] line: &str) {
    let mut framer = LineFramer::new();
    assert_eq!(framer.feed(format!("{line}\n").as_bytes()).unwrap(), None);
}

#[test]
fn test_overflow_then_recovery() {
    let mut framer = LineFramer::new();
    let oversized = vec![b'x'; MAX_BUFFER_BYTES + 1];

    let err = framer.feed(&oversized).unwrap_err();
    let AgentError::Parse { line_prefix, cause } = err else {
        panic!("expected a parse error");
    };
    assert!(cause.contains("overflow"));
    assert_eq!(line_prefix.len(), 120);
    assert_eq!(framer.buffered_len(), 0);
    assert_eq!(framer.search_offset(), 0);

    let payload = framer.feed(format!("{RESULT}\n").as_bytes()).unwrap();
    assert!(payload.is_some());
}

#[test]
fn test_overflow_accumulated_across_feeds() {
    let mut framer = LineFramer::with_max_buffer(1024);
    assert_eq!(framer.feed(&[b'a'; 600]).unwrap(), None);
    assert!(matches!(framer.feed(&[b'a'; 600]), Err(AgentError::Parse { .. })));
    assert_eq!(framer.buffered_len(), 0);
}

#[test]
fn test_large_payload_in_64k_chunks() {
    let blob = "y".repeat(240 * 1024);
    let line = format!(
        "{{\"type\":\"result\",\"subtype\":\"success\",\"structured_output\":{{\"blob\":\"{blob}\"}}}}\n"
    );
    let bytes = line.as_bytes();

    let whole = LineFramer::new().feed(bytes).unwrap().expect("whole feed");

    let mut framer = LineFramer::new();
    let mut calls = 0;
    let mut chunked = None;
    for chunk in bytes.chunks(64 * 1024) {
        calls += 1;
        if let Some(payload) = framer.feed(chunk).unwrap() {
            chunked = Some(payload);
        }
        // Everything before the newline has been scanned exactly once
        assert_eq!(framer.search_offset(), framer.buffered_len());
    }

    assert_eq!(calls, 4);
    assert_eq!(chunked.as_deref(), Some(whole.as_str()));
    assert_eq!(whole.len(), blob.len() + r#"{"blob":""}"#.len());
}

#[test]
fn test_non_utf8_line_is_skipped() {
    let mut framer = LineFramer::new();
    let mut seen = 0;
    let mut input = vec![0xff, 0xfe, b'{', b'\n'];
    input.extend_from_slice(format!("{RESULT}\n").as_bytes());

    let payload = framer.feed_with(&input, |_| seen += 1).unwrap();
    assert!(payload.is_some());
    assert_eq!(seen, 1);
}

#[test]
fn test_multibyte_character_split_across_chunks() {
    let line = "{\"type\":\"result\",\"subtype\":\"success\",\"structured_output\":\"caf\u{e9} \u{1F600}\"}\n";
    let bytes = line.as_bytes();
    let split = line.find('\u{1F600}').unwrap() + 2;

    let mut framer = LineFramer::new();
    assert_eq!(framer.feed(&bytes[..split]).unwrap(), None);
    let payload = framer.feed(&bytes[split..]).unwrap();
    assert_eq!(payload.as_deref(), Some("\"caf\u{e9} \u{1F600}\""));
}

#[test]
fn test_lines_after_result_stay_buffered() {
    let mut framer = LineFramer::new();
    let first = RESULT.replace("\"done\":true", "\"done\":false");
    let input = format!("{first}\n{RESULT}\npartial");

    let payload = framer.feed(input.as_bytes()).unwrap();
    assert!(payload.unwrap().contains("\"done\":false"));

    // The second result is returned by the next call
    let payload = framer.feed(b"").unwrap();
    assert!(payload.unwrap().contains("\"done\":true"));
    assert_eq!(framer.buffered_len(), "partial".len());
}

#[test]
fn test_noise_between_events_is_ignored() {
    let mut framer = LineFramer::new();
    let input = format!("\n  \nWarning: something odd\n[1,2]\n{{\"no\":\"type\"}}\n{RESULT}\n");
    assert!(framer.feed(input.as_bytes()).unwrap().is_some());
}

proptest! {
    #[test]
    fn prop_chunking_invariance(cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..12)) {
        let input = transcript();

        let whole = feed_all(&mut LineFramer::new(), [input.as_slice()]);

        let mut positions: Vec<usize> = cuts.iter().map(|i| i.index(input.len() + 1)).collect();
        positions.push(0);
        positions.push(input.len());
        positions.sort_unstable();
        positions.dedup();
        let chunks = positions.windows(2).map(|w| &input[w[0]..w[1]]);

        let chunked = feed_all(&mut LineFramer::new(), chunks);
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..16)
    ) {
        let mut framer = LineFramer::with_max_buffer(512);
        for chunk in &chunks {
            let _ = framer.feed(chunk);
            prop_assert!(framer.search_offset() <= framer.buffered_len());
            prop_assert!(framer.buffered_len() <= 512);
        }
    }
}
