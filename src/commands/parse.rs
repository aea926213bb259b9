use anyhow::{Context, Result};
use std::io::Read;
use tracing::info;

use easyfill::messages::ExtensionMessage;
use easyfill::parser::ActionStreamParser;

/// Parse a recorded response body and print one `performAutofill` message per action
pub async fn handle_parse(input: String, chunk_size: usize) -> Result<()> {
    let body = if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read(&input).with_context(|| format!("Failed to read {}", input))?
    };
    info!("Parsing {} bytes in chunks of {}", body.len(), chunk_size);

    let mut parser = ActionStreamParser::new();
    for chunk in body.chunks(chunk_size.max(1)) {
        for action in parser.feed(chunk) {
            let message = ExtensionMessage::PerformAutofill { data: action };
            println!("{}", serde_json::to_string(&message)?);
        }
    }

    let summary = parser.finish();
    eprintln!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
