//! Writes a value into a resolved element and fires the notifications a
//! page's own scripts expect after user input.

use tracing::debug;

use crate::errors::FillError;
use crate::surface::{ControlKind, DomEvent, FormSurface};

/// Expand the two-character `\n` escape into a real newline
pub fn unescape_newlines(value: &str) -> String {
    value.replace("\\n", "\n")
}

/// Apply `value` to `element` according to its control kind.
///
/// Returns the value actually written. On failure the element is left
/// untouched.
pub async fn apply_value<S: FormSurface + ?Sized>(
    surface: &S,
    element: &S::Element,
    value: &str,
) -> Result<String, FillError> {
    match surface.control_kind(element).await? {
        ControlKind::TextInput { .. } | ControlKind::TextArea => {
            let text = unescape_newlines(value);
            surface.set_value(element, &text).await?;
            surface.dispatch(element, DomEvent::Input).await?;
            surface.dispatch(element, DomEvent::Change).await?;
            Ok(text)
        }
        ControlKind::Select { options } => {
            let wanted = value.to_lowercase();
            let option = options
                .iter()
                .find(|o| o.text.to_lowercase() == wanted)
                .ok_or_else(|| FillError::NoMatchingOption(value.to_string()))?;

            debug!("Selecting option '{}' ({})", option.text, option.value);
            surface.set_value(element, &option.value).await?;
            surface.dispatch(element, DomEvent::Change).await?;
            Ok(option.value.clone())
        }
        ControlKind::Unsupported { tag } => Err(FillError::UnsupportedElementKind(tag)),
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod executor_test;
