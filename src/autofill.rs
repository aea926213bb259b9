//! Drives one autofill stream end to end: chunks in, parsed actions
//! resolved and applied to the page in stream order, report out.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::errors::{EasyfillError, FillError};
use crate::executor::apply_value;
use crate::messages::{ExtensionMessage, Reply, StatusReply};
use crate::parser::ActionStreamParser;
use crate::resolver::resolve;
use crate::surface::{EASY_APPLY_ID_ATTR, FormSurface};
use crate::types::{Action, FillReport, FilledField, SkippedAction, Status};

/// A streamed response body, read one chunk at a time
#[async_trait]
pub trait ChunkSource: Send {
    /// Next chunk, or `None` once the stream has ended
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Replays a recorded response body in fixed-size chunks
#[derive(Debug, Clone)]
pub struct ReplaySource {
    data: Vec<u8>,
    chunk_size: usize,
    offset: usize,
}

impl ReplaySource {
    pub fn new(data: impl Into<Vec<u8>>, chunk_size: usize) -> Self {
        ReplaySource {
            data: data.into(),
            chunk_size: chunk_size.max(1),
            offset: 0,
        }
    }
}

#[async_trait]
impl ChunkSource for ReplaySource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        let end = (self.offset + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }
}

/// Applies action streams to one page
pub struct Autofiller<S: FormSurface> {
    surface: S,
    in_flight: Mutex<()>,
}

impl<S: FormSurface> Autofiller<S> {
    pub fn new(surface: S) -> Self {
        Autofiller {
            surface,
            in_flight: Mutex::new(()),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Resolve and apply a single action
    pub async fn perform(&self, action: &Action) -> Result<FilledField, FillError> {
        let resolved = resolve(&self.surface, &action.selector)
            .await?
            .ok_or_else(|| FillError::ElementNotFound(action.selector.to_string()))?;

        let value = apply_value(&self.surface, &resolved.element, &action.value).await?;
        info!(
            "Filled {} via {} with {} chars",
            action.selector,
            resolved.strategy,
            value.chars().count()
        );

        Ok(FilledField {
            seq: 0,
            selector: action.selector.clone(),
            strategy: resolved.strategy,
            value,
        })
    }

    /// Consume a response stream, applying every action as soon as it is parsed.
    ///
    /// A second call while a stream is still being consumed fails with
    /// [`EasyfillError::Busy`] and leaves the first one running. A stream
    /// that breaks part way yields a report with `status = error` that
    /// still lists the fills already applied.
    pub async fn run<C: ChunkSource + ?Sized>(
        &self,
        source: &mut C,
    ) -> Result<FillReport, EasyfillError> {
        let _guard = self.in_flight.try_lock().map_err(|_| EasyfillError::Busy)?;

        let span = info_span!("autofill", request_id = %Uuid::new_v4());
        async move {
            let mut parser = ActionStreamParser::new();
            let mut report = FillReport::default();

            loop {
                match source.next_chunk().await {
                    Ok(Some(chunk)) => {
                        debug!("Received {} bytes", chunk.len());
                        for action in parser.feed(&chunk) {
                            self.apply_to_report(action, &mut report).await;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Autofill stream interrupted: {:#}", e);
                        report.status = Status::Error;
                        report.message = format!("Stream interrupted: {:#}", e);
                        break;
                    }
                }
            }

            let summary = parser.finish();
            report.malformed = summary.malformed;
            info!(
                "Autofill finished: {} filled, {} skipped, {} malformed",
                report.filled.len(),
                report.skipped.len(),
                report.malformed
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn apply_to_report(&self, action: Action, report: &mut FillReport) {
        let seq = report.filled.len() + report.skipped.len();
        match self.perform(&action).await {
            Ok(filled) => report.filled.push(FilledField { seq, ..filled }),
            Err(e) => {
                warn!("Skipping action for {}: {}", action.selector, e);
                report.skipped.push(SkippedAction {
                    seq,
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                    selector: action.selector,
                    value: action.value,
                });
            }
        }
    }

    /// Serve a message addressed to the page.
    ///
    /// Returns `None` for messages handled elsewhere.
    pub async fn handle_message(&self, message: ExtensionMessage) -> Result<Option<Reply>> {
        match message {
            ExtensionMessage::PerformAutofill { data } => {
                let reply = match self.perform(&data).await {
                    Ok(_) => StatusReply::success("Autofill completed"),
                    Err(e) => {
                        warn!("Autofill action failed: {}", e);
                        StatusReply::error(e.to_string())
                    }
                };
                Ok(Some(Reply::Status(reply)))
            }
            ExtensionMessage::CheckForEasyApplyId => {
                let easy_apply_id = self.surface.input_attribute(EASY_APPLY_ID_ATTR).await?;
                Ok(Some(Reply::EasyApplyId { easy_apply_id }))
            }
            other => {
                debug!("Ignoring message not handled by the page: {:?}", other);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[path = "autofill_test.rs"]
mod autofill_test;
