// Unit tests for stream-driven autofill

use super::*;
use crate::document::FormDocument;
use crate::types::{Selector, SelectorStrategy};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::oneshot;

const PAGE: &str = r#"
<form>
  <label for="mail">Email address</label>
  <input id="mail" name="email">
  <input name="first_name">
  <textarea id="cover"></textarea>
  <select id="country">
    <option value="de">Germany</option>
    <option value="fr">France</option>
  </select>
  <input type="hidden" easy-apply-id="user-7">
</form>
"#;

const RESPONSE: &str = concat!(
    "Here you go.\n",
    r#"<action> type({"label": "Email Address"}, "ada@example.com") </action>"#,
    r#"<action> type({"id": "broken", "name": 5}, "x") </action>"#,
    r#"<action> type({"name": "first_name"}, "Ada") </action>"#,
    r#"<action> type({"id": "cover"}, "Hello,\n\nAda") </action>"#,
    r#"<action> type({"id": "country"}, "Narnia") </action>"#,
    r#"<action> type({"id": "country"}, "france") </action>"#,
    r#"<action> type({"id": "nowhere"}, "lost") </action>"#,
    r#"<action> type({"id": "cover"}, "half"#,
);

/// Yields its chunks, then fails
struct FailingSource {
    chunks: Vec<Vec<u8>>,
}

#[async_trait]
impl ChunkSource for FailingSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.chunks.is_empty() {
            anyhow::bail!("connection reset");
        }
        Ok(Some(self.chunks.remove(0)))
    }
}

/// Signals when first read, then blocks until released
struct GatedSource {
    started: Option<oneshot::Sender<()>>,
    release: Option<oneshot::Receiver<()>>,
}

#[async_trait]
impl ChunkSource for GatedSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(started) = self.started.take() {
            let _ = started.send(());
        }
        if let Some(release) = self.release.take() {
            let _ = release.await;
        }
        Ok(None)
    }
}

#[tokio::test]
async fn test_replay_source_chunks() {
    let mut source = ReplaySource::new("abcde", 2);
    assert_eq!(source.next_chunk().await.unwrap(), Some(b"ab".to_vec()));
    assert_eq!(source.next_chunk().await.unwrap(), Some(b"cd".to_vec()));
    assert_eq!(source.next_chunk().await.unwrap(), Some(b"e".to_vec()));
    assert_eq!(source.next_chunk().await.unwrap(), None);

    // Zero chunk size still makes progress
    let mut source = ReplaySource::new("ab", 0);
    assert_eq!(source.next_chunk().await.unwrap(), Some(b"a".to_vec()));
}

#[tokio::test]
async fn test_run_applies_stream_in_order() {
    let filler = Autofiller::new(FormDocument::parse(PAGE));
    let mut source = ReplaySource::new(RESPONSE, 7);

    let report = filler.run(&mut source).await.unwrap();

    assert_eq!(report.status, Status::Success);
    assert_eq!(report.malformed, 1);

    let strategies: Vec<SelectorStrategy> = report.filled.iter().map(|f| f.strategy).collect();
    assert_eq!(
        strategies,
        vec![
            SelectorStrategy::Label,
            SelectorStrategy::Name,
            SelectorStrategy::Id,
            SelectorStrategy::Id,
        ]
    );

    let kinds: Vec<&str> = report.skipped.iter().map(|s| s.kind.as_str()).collect();
    assert_eq!(kinds, vec!["no_matching_option", "element_not_found"]);

    // Positions interleave across both lists
    let filled_seq: Vec<usize> = report.filled.iter().map(|f| f.seq).collect();
    let skipped_seq: Vec<usize> = report.skipped.iter().map(|s| s.seq).collect();
    assert_eq!(filled_seq, vec![0, 1, 2, 4]);
    assert_eq!(skipped_seq, vec![3, 5]);

    let doc = filler.surface();
    assert_eq!(doc.value_of("mail").as_deref(), Some("ada@example.com"));
    assert_eq!(doc.value_of("cover").as_deref(), Some("Hello,\n\nAda"));
    assert_eq!(doc.value_of("country").as_deref(), Some("fr"));
    let fields = doc.fields().await.unwrap();
    assert_eq!(fields[1].value, "Ada");
}

#[tokio::test]
async fn test_transport_failure_keeps_applied_fills() {
    let filler = Autofiller::new(FormDocument::parse(PAGE));
    let mut source = FailingSource {
        chunks: vec![br#"<action> type({"id": "mail"}, "kept@example.com") </action>"#.to_vec()],
    };

    let report = filler.run(&mut source).await.unwrap();

    assert_eq!(report.status, Status::Error);
    assert!(report.message.contains("connection reset"));
    assert_eq!(report.filled.len(), 1);
    assert_eq!(
        filler.surface().value_of("mail").as_deref(),
        Some("kept@example.com")
    );
}

#[tokio::test]
async fn test_second_run_is_rejected_while_busy() {
    let filler = Arc::new(Autofiller::new(FormDocument::parse(PAGE)));
    let (started_tx, started_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();

    let first = {
        let filler = filler.clone();
        tokio::spawn(async move {
            let mut source = GatedSource {
                started: Some(started_tx),
                release: Some(release_rx),
            };
            filler.run(&mut source).await
        })
    };
    started_rx.await.unwrap();

    let mut other = ReplaySource::new(RESPONSE, 16);
    let err = filler.run(&mut other).await.unwrap_err();
    assert!(matches!(err, EasyfillError::Busy));
    assert_eq!(err.exit_code(), 4);

    release_tx.send(()).unwrap();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.status, Status::Success);

    // Free again once the first stream ended
    let mut again = ReplaySource::new("", 1);
    assert!(filler.run(&mut again).await.is_ok());
}

#[tokio::test]
async fn test_handle_perform_autofill() {
    let filler = Autofiller::new(FormDocument::parse(PAGE));

    let message = ExtensionMessage::PerformAutofill {
        data: Action {
            selector: Selector::new(SelectorStrategy::Id, "mail"),
            value: "x@y.z".to_string(),
        },
    };
    let reply = filler.handle_message(message).await.unwrap();
    assert_eq!(
        reply,
        Some(Reply::Status(StatusReply::success("Autofill completed")))
    );

    let message = ExtensionMessage::PerformAutofill {
        data: Action {
            selector: Selector::new(SelectorStrategy::Id, "country"),
            value: "Atlantis".to_string(),
        },
    };
    match filler.handle_message(message).await.unwrap() {
        Some(Reply::Status(reply)) => {
            assert_eq!(reply.status, Status::Error);
            assert!(reply.message.contains("Atlantis"));
        }
        other => panic!("Unexpected reply {other:?}"),
    }
}

#[tokio::test]
async fn test_handle_check_for_easy_apply_id() {
    let filler = Autofiller::new(FormDocument::parse(PAGE));
    let reply = filler
        .handle_message(ExtensionMessage::CheckForEasyApplyId)
        .await
        .unwrap();
    assert_eq!(
        reply,
        Some(Reply::EasyApplyId {
            easy_apply_id: Some("user-7".to_string())
        })
    );

    let reply = filler
        .handle_message(ExtensionMessage::StartAuthentication)
        .await
        .unwrap();
    assert!(reply.is_none());
}
