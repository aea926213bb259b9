//! Maps an action's selector to a single element on the page.

use anyhow::Result;
use tracing::debug;

use crate::surface::FormSurface;
use crate::types::{Selector, SelectorStrategy};

/// An element located by a selector, with the strategy that found it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<E> {
    pub strategy: SelectorStrategy,
    pub element: E,
}

/// Try each strategy of the selector in precedence order.
///
/// Returns `Ok(None)` when no strategy matches; errors only come from the
/// surface itself.
pub async fn resolve<S: FormSurface + ?Sized>(
    surface: &S,
    selector: &Selector,
) -> Result<Option<Resolved<S::Element>>> {
    for (strategy, value) in selector.strategies() {
        let found = match strategy {
            SelectorStrategy::Id => surface.element_by_id(value).await?,
            SelectorStrategy::Name => surface.elements_by_name(value).await?.into_iter().next(),
            SelectorStrategy::Label => by_label(surface, value).await?,
        };

        match found {
            Some(element) => {
                debug!("Resolved {} by {}", selector, strategy);
                return Ok(Some(Resolved { strategy, element }));
            }
            None => debug!("No element with {} '{}'", strategy, value),
        }
    }

    Ok(None)
}

async fn by_label<S: FormSurface + ?Sized>(surface: &S, text: &str) -> Result<Option<S::Element>> {
    let wanted = text.to_lowercase();
    let labels = surface.labels().await?;

    let Some(label) = labels
        .iter()
        .find(|l| l.text.trim().to_lowercase() == wanted)
    else {
        return Ok(None);
    };

    match label.html_for.as_deref() {
        Some(target) => surface.element_by_id(target).await,
        None => {
            debug!("Label '{}' has no for attribute", text);
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod resolver_test;
