//! Access to the page being filled.
//!
//! Resolution and execution logic is written once against [`FormSurface`];
//! an HTML snapshot ([`crate::document::FormDocument`]) and a live WebDriver
//! page ([`crate::webdriver::WebSurface`]) both implement it.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Field;

/// Attribute the frontend sets on the input that carries the user id
pub const EASY_APPLY_ID_ATTR: &str = "easy-apply-id";

/// One `<option>` of a select control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Visible text
    pub text: String,
    /// Submitted value
    pub value: String,
}

/// A `<label>` element as seen by the label lookup strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Raw text content
    pub text: String,
    /// Target id from the `for` attribute
    pub html_for: Option<String>,
}

/// Concrete kind of an element, as far as filling is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    /// Any `<input>`
    TextInput { input_type: String },
    TextArea,
    Select { options: Vec<SelectOption> },
    /// Anything else, carrying the uppercase tag name
    Unsupported { tag: String },
}

/// Synthetic notifications fired after a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEvent {
    Input,
    Change,
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
        }
    }
}

#[async_trait]
pub trait FormSurface: Send + Sync {
    /// Handle to one element of the page
    type Element: Clone + Send + Sync + std::fmt::Debug;

    /// Every input, textarea and select in document order
    async fn fields(&self) -> Result<Vec<Field>>;

    /// The focused control, if it is one that can be filled
    async fn focused_field(&self) -> Result<Option<Field>>;

    /// First element with this id
    async fn element_by_id(&self, id: &str) -> Result<Option<Self::Element>>;

    /// Elements with this name attribute, in document order
    async fn elements_by_name(&self, name: &str) -> Result<Vec<Self::Element>>;

    /// Every label in document order
    async fn labels(&self) -> Result<Vec<Label>>;

    async fn control_kind(&self, element: &Self::Element) -> Result<ControlKind>;

    /// Set the control's value property
    async fn set_value(&self, element: &Self::Element, value: &str) -> Result<()>;

    /// Fire a bubbling event on the element
    async fn dispatch(&self, element: &Self::Element, event: DomEvent) -> Result<()>;

    /// Value of `attr` on the first input that carries it
    async fn input_attribute(&self, attr: &str) -> Result<Option<String>>;
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
