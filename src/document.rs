//! In-memory form document parsed from an HTML snapshot.
//!
//! The snapshot keeps every element in document order together with what
//! filling needs: attributes, control kind, label and form context. Values,
//! focus and dispatched events are mutable state behind a mutex so the
//! document can be shared like a live page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::surface::{
    ControlKind, DomEvent, FormSurface, Label, SelectOption, collapse_whitespace,
};
use crate::types::Field;

/// Index of an element in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(usize);

/// An event fired on the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchedEvent {
    pub target: ElementId,
    pub event: DomEvent,
    pub bubbles: bool,
}

#[derive(Debug)]
struct ElementNode {
    tag: String,
    attrs: HashMap<String, String>,
    kind: ControlKind,
    /// Collapsed text of every associated label
    labels: Vec<String>,
    /// Nearest enclosing form
    form: Option<usize>,
    /// Collapsed text content, only kept for forms
    form_text: String,
}

impl ElementNode {
    fn attr(&self, name: &str) -> &str {
        self.attrs.get(name).map(String::as_str).unwrap_or("")
    }

    fn is_control(&self) -> bool {
        matches!(
            self.kind,
            ControlKind::TextInput { .. } | ControlKind::TextArea | ControlKind::Select { .. }
        )
    }
}

#[derive(Debug, Default)]
struct DocumentState {
    values: Vec<String>,
    events: Vec<DispatchedEvent>,
    focused: Option<ElementId>,
}

/// Parsed HTML page that can be inspected and filled without a browser
#[derive(Debug)]
pub struct FormDocument {
    nodes: Vec<ElementNode>,
    labels: Vec<Label>,
    state: Mutex<DocumentState>,
}

impl FormDocument {
    /// Parse an HTML document
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let elements: Vec<ElementRef> = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();
        let index: HashMap<_, usize> = elements
            .iter()
            .enumerate()
            .map(|(i, el)| (el.id(), i))
            .collect();

        let mut nodes = Vec::with_capacity(elements.len());
        let mut values = Vec::with_capacity(elements.len());
        for el in &elements {
            let (mut node, value) = Self::build_node(el);
            node.form = el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| a.value().name() == "form")
                .and_then(|f| index.get(&f.id()).copied());
            nodes.push(node);
            values.push(value);
        }

        // Associate labels: `for` targets an id, otherwise the first nested control
        let mut labels = Vec::new();
        for el in elements.iter().filter(|el| el.value().name() == "label") {
            let raw_text: String = el.text().collect();
            let html_for = el
                .value()
                .attr("for")
                .filter(|f| !f.is_empty())
                .map(str::to_string);

            let target = match &html_for {
                Some(target_id) => nodes.iter().position(|n| n.attr("id") == target_id.as_str()),
                None => el
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .filter_map(|d| index.get(&d.id()).copied())
                    .find(|&i| nodes[i].is_control()),
            };
            if let Some(i) = target
                && nodes[i].is_control()
            {
                nodes[i].labels.push(collapse_whitespace(&raw_text));
            }

            labels.push(Label {
                text: raw_text,
                html_for,
            });
        }

        let focused = nodes
            .iter()
            .position(|n| n.is_control() && n.attrs.contains_key("autofocus"))
            .map(ElementId);

        debug!(
            "Parsed document with {} elements and {} labels",
            nodes.len(),
            labels.len()
        );

        FormDocument {
            nodes,
            labels,
            state: Mutex::new(DocumentState {
                values,
                events: Vec::new(),
                focused,
            }),
        }
    }

    /// Read and parse an HTML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read HTML file {}", path.display()))?;
        Ok(Self::parse(&html))
    }

    fn build_node(el: &ElementRef) -> (ElementNode, String) {
        let element = el.value();
        let tag = element.name().to_ascii_lowercase();
        let attrs: HashMap<String, String> = element
            .attrs()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();

        let (kind, value) = match tag.as_str() {
            "input" => {
                let input_type = attrs
                    .get("type")
                    .map(|t| t.to_ascii_lowercase())
                    .unwrap_or_else(|| "text".to_string());
                let value = attrs.get("value").cloned().unwrap_or_default();
                (ControlKind::TextInput { input_type }, value)
            }
            "textarea" => (ControlKind::TextArea, el.text().collect()),
            "select" => {
                let mut options = Vec::new();
                let mut selected = None;
                for option in el
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .filter(|d| d.value().name() == "option")
                {
                    let text = collapse_whitespace(&option.text().collect::<String>());
                    let value = option
                        .value()
                        .attr("value")
                        .map(str::to_string)
                        .unwrap_or_else(|| text.clone());
                    if selected.is_none() && option.value().attr("selected").is_some() {
                        selected = Some(value.clone());
                    }
                    options.push(SelectOption { text, value });
                }
                // Only a single select shows its first option when nothing is selected
                let value = match selected {
                    Some(value) => value,
                    None if !attrs.contains_key("multiple") => options
                        .first()
                        .map(|o| o.value.clone())
                        .unwrap_or_default(),
                    None => String::new(),
                };
                (ControlKind::Select { options }, value)
            }
            _ => (
                ControlKind::Unsupported {
                    tag: tag.to_ascii_uppercase(),
                },
                String::new(),
            ),
        };

        let form_text = if tag == "form" {
            collapse_whitespace(&el.text().collect::<String>())
        } else {
            String::new()
        };

        let node = ElementNode {
            tag,
            attrs,
            kind,
            labels: Vec::new(),
            form: None,
            form_text,
        };
        (node, value)
    }

    fn state(&self) -> Result<MutexGuard<'_, DocumentState>> {
        self.state
            .lock()
            .map_err(|_| anyhow::anyhow!("Document state lock poisoned"))
    }

    fn node(&self, element: &ElementId) -> Result<&ElementNode> {
        self.nodes
            .get(element.0)
            .with_context(|| format!("Element {} is not part of this document", element.0))
    }

    fn field_for(&self, i: usize, values: &[String]) -> Field {
        let node = &self.nodes[i];
        let input_type = match &node.kind {
            ControlKind::TextInput { input_type } => input_type.clone(),
            ControlKind::TextArea => "textarea".to_string(),
            ControlKind::Select { .. } if node.attrs.contains_key("multiple") => {
                "select-multiple".to_string()
            }
            ControlKind::Select { .. } => "select-one".to_string(),
            ControlKind::Unsupported { .. } => String::new(),
        };

        Field {
            tag: node.tag.clone(),
            input_type,
            name: node.attr("name").to_string(),
            id: node.attr("id").to_string(),
            value: values.get(i).cloned().unwrap_or_default(),
            placeholder: node.attr("placeholder").to_string(),
            label: node.labels.join(" "),
            form_text: node
                .form
                .map(|f| self.nodes[f].form_text.clone())
                .unwrap_or_default(),
        }
    }

    /// First element with this id
    pub fn find_by_id(&self, id: &str) -> Option<ElementId> {
        if id.is_empty() {
            return None;
        }
        self.nodes
            .iter()
            .position(|n| n.attr("id") == id)
            .map(ElementId)
    }

    /// Current value of an element
    pub fn value(&self, element: ElementId) -> Option<String> {
        self.state.lock().ok()?.values.get(element.0).cloned()
    }

    /// Current value of the first element with this id
    pub fn value_of(&self, id: &str) -> Option<String> {
        self.value(self.find_by_id(id)?)
    }

    /// Events fired so far, oldest first
    pub fn events(&self) -> Vec<DispatchedEvent> {
        self.state
            .lock()
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    /// Move focus to an element
    pub fn focus(&self, element: ElementId) -> Result<()> {
        self.node(&element)?;
        self.state()?.focused = Some(element);
        Ok(())
    }
}

#[async_trait]
impl FormSurface for FormDocument {
    type Element = ElementId;

    async fn fields(&self) -> Result<Vec<Field>> {
        let state = self.state()?;
        Ok(self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_control())
            .map(|(i, _)| self.field_for(i, &state.values))
            .collect())
    }

    async fn focused_field(&self) -> Result<Option<Field>> {
        let state = self.state()?;
        Ok(state
            .focused
            .filter(|el| self.nodes[el.0].is_control())
            .map(|el| self.field_for(el.0, &state.values)))
    }

    async fn element_by_id(&self, id: &str) -> Result<Option<ElementId>> {
        Ok(self.find_by_id(id))
    }

    async fn elements_by_name(&self, name: &str) -> Result<Vec<ElementId>> {
        Ok(self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.attrs.get("name").is_some_and(|v| v == name))
            .map(|(i, _)| ElementId(i))
            .collect())
    }

    async fn labels(&self) -> Result<Vec<Label>> {
        Ok(self.labels.clone())
    }

    async fn control_kind(&self, element: &ElementId) -> Result<ControlKind> {
        Ok(self.node(element)?.kind.clone())
    }

    async fn set_value(&self, element: &ElementId, value: &str) -> Result<()> {
        self.node(element)?;
        let mut state = self.state()?;
        state.values[element.0] = value.to_string();
        Ok(())
    }

    async fn dispatch(&self, element: &ElementId, event: DomEvent) -> Result<()> {
        self.node(element)?;
        self.state()?.events.push(DispatchedEvent {
            target: *element,
            event,
            bubbles: true,
        });
        Ok(())
    }

    async fn input_attribute(&self, attr: &str) -> Result<Option<String>> {
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.tag == "input")
            .find_map(|n| n.attrs.get(attr).cloned()))
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;
