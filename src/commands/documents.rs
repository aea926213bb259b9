use anyhow::Result;
use serde_json::json;
use tracing::info;

use easyfill::backend::BackendClient;
use easyfill::config::Settings;
use easyfill::types::OutputFormat;

use crate::commands::utils;

/// Fetch the user's documents, store them and optionally change the selection
pub async fn handle_documents(
    settings: &Settings,
    user_id: Option<String>,
    select: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let mut store = settings.open_store()?;
    let user_id = utils::resolve_user_id(user_id, &store)?;

    let client = BackendClient::new(settings.backend_url.clone())?;
    let documents = client.fetch_documents(&user_id).await?;
    info!("Fetched {} document(s)", documents.len());

    store.set_documents(documents)?;
    if !select.is_empty() {
        store.set_selected_documents(select)?;
    }

    match format {
        OutputFormat::Json => utils::print_json(&json!({
            "documents": store.documents(),
            "selected": store.selected_documents(),
        }))?,
        OutputFormat::Simple => {
            if store.documents().is_empty() {
                println!("No documents found");
                return Ok(());
            }
            println!("{:<3} {:<38} {:<30}", "", "Id", "Name");
            println!("{}", "-".repeat(71));
            for doc in store.documents() {
                let marker = if store.selected_documents().contains(&doc.id) {
                    "*"
                } else {
                    ""
                };
                println!("{:<3} {:<38} {:<30}", marker, doc.id, doc.name);
            }
        }
    }
    Ok(())
}
