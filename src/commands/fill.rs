use anyhow::{Context, Result};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use easyfill::autofill::{Autofiller, ReplaySource};
use easyfill::backend::BackendClient;
use easyfill::config::Settings;
use easyfill::messages::AutofillRequest;
use easyfill::store::Store;
use easyfill::surface::FormSurface;
use easyfill::types::{AutofillMode, FillReport, OutputFormat, Status};

use crate::commands::utils::{self, BrowserArgs, Page, PageArgs};

/// Where the action stream comes from
pub struct StreamOptions {
    /// Recorded response body to replay instead of calling the backend
    pub replay: Option<PathBuf>,
    pub chunk_size: usize,
    pub user_id: Option<String>,
    pub mode: AutofillMode,
}

pub async fn handle_fill(
    settings: &Settings,
    page: PageArgs,
    browser: BrowserArgs,
    stream: StreamOptions,
    format: OutputFormat,
) -> Result<()> {
    let mut store = settings.open_store()?;

    let (report, fields) = match page.open(&browser).await? {
        Page::Snapshot(doc) => {
            let (report, doc) = fill_surface(doc, settings, &mut store, &stream).await?;
            (report, Some(doc.fields().await?))
        }
        Page::Live(session) => {
            let result = fill_surface(session.surface(), settings, &mut store, &stream).await;
            session.close().await?;
            (result?.0, None)
        }
    };

    match format {
        OutputFormat::Json => utils::print_json(&json!({ "report": report, "fields": fields }))?,
        OutputFormat::Simple => print_simple(&report),
    }
    Ok(())
}

async fn fill_surface<S: FormSurface>(
    surface: S,
    settings: &Settings,
    store: &mut Store,
    stream: &StreamOptions,
) -> Result<(FillReport, S)> {
    let filler = Autofiller::new(surface);

    let report = match &stream.replay {
        Some(path) => {
            let body = std::fs::read(path)
                .with_context(|| format!("Failed to read replay file {}", path.display()))?;
            info!("Replaying {} bytes from {}", body.len(), path.display());
            let mut source = ReplaySource::new(body, stream.chunk_size);
            filler.run(&mut source).await?
        }
        None => {
            let user_id = utils::resolve_user_id(stream.user_id.clone(), store)?;
            let fields = match stream.mode {
                AutofillMode::Page => filler.surface().fields().await?,
                AutofillMode::Focused => match filler.surface().focused_field().await? {
                    Some(field) => vec![field],
                    None => anyhow::bail!("No focused field to fill"),
                },
            };

            let request = AutofillRequest {
                mode: stream.mode,
                user_id,
                fields,
            };
            let client = BackendClient::new(settings.backend_url.clone())?;
            let mut response = client.open_autofill_stream(&request).await?;
            filler.run(&mut response).await?
        }
    };

    store.record_report(&report)?;
    Ok((report, filler.into_surface()))
}

fn print_simple(report: &FillReport) {
    let marker = match report.status {
        Status::Success => "✓",
        Status::Error => "✗",
    };
    println!("{} {}", marker, report.message);

    for filled in &report.filled {
        println!("  filled  {} (by {})", filled.selector, filled.strategy);
    }
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.selector, skipped.reason);
    }
    if report.malformed > 0 {
        println!("  {} malformed record(s) ignored", report.malformed);
    }
}
