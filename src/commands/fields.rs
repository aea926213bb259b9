use anyhow::Result;
use tracing::info;

use easyfill::surface::FormSurface;
use easyfill::types::{Field, OutputFormat};

use crate::commands::utils::{self, BrowserArgs, Page, PageArgs};

pub async fn handle_fields(
    page: PageArgs,
    browser: BrowserArgs,
    focused: bool,
    format: OutputFormat,
) -> Result<()> {
    let fields = match page.open(&browser).await? {
        Page::Snapshot(doc) => extract(&doc, focused).await?,
        Page::Live(session) => {
            let fields = extract(&session.surface(), focused).await;
            session.close().await?;
            fields?
        }
    };
    info!("Extracted {} field(s)", fields.len());

    match format {
        OutputFormat::Json => utils::print_json(&fields)?,
        OutputFormat::Simple => print_simple(&fields),
    }
    Ok(())
}

async fn extract<S: FormSurface>(surface: &S, focused: bool) -> Result<Vec<Field>> {
    if focused {
        Ok(surface.focused_field().await?.into_iter().collect())
    } else {
        surface.fields().await
    }
}

fn print_simple(fields: &[Field]) {
    if fields.is_empty() {
        println!("No fields found");
        return;
    }

    println!(
        "{:<10} {:<14} {:<20} {:<20} {:<30}",
        "Tag", "Type", "Id", "Name", "Label"
    );
    println!("{}", "-".repeat(94));
    for field in fields {
        println!(
            "{:<10} {:<14} {:<20} {:<20} {:<30}",
            field.tag, field.input_type, field.id, field.name, field.label
        );
    }
}
