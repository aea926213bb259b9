//! Live pages driven over WebDriver.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::surface::{ControlKind, DomEvent, FormSurface, Label, SelectOption};
use crate::types::Field;

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    /// Standard port of the browser's driver
    pub fn default_webdriver_url(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "http://localhost:4444",
            BrowserType::Chrome => "http://localhost:9515",
        }
    }

    fn driver_name(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }
}

/// Collects every fillable control with its label and form context
const FIELDS_SCRIPT: &str = r#"
    const collapse = (s) => (s || '').replace(/\s+/g, ' ').trim();
    const describe = (el) => ({
        tag: el.tagName.toLowerCase(),
        type: el.type || '',
        name: el.name || '',
        id: el.id || '',
        value: el.value || '',
        placeholder: el.placeholder || '',
        label: collapse(Array.from(el.labels || []).map(l => l.textContent).join(' ')),
        form_text: el.form ? collapse(el.form.textContent) : ''
    });
    const focusedOnly = arguments[0];
    if (focusedOnly) {
        const el = document.activeElement;
        if (!el || !['INPUT', 'TEXTAREA', 'SELECT'].includes(el.tagName)) return null;
        return describe(el);
    }
    return Array.from(document.querySelectorAll('input, textarea, select')).map(describe);
"#;

const LABELS_SCRIPT: &str = r#"
    return Array.from(document.querySelectorAll('label')).map(l => ({
        text: l.textContent || '',
        html_for: l.htmlFor || null
    }));
"#;

const KIND_SCRIPT: &str = r#"
    const el = arguments[0];
    return {
        tag: el.tagName,
        type: el.type || '',
        options: el.tagName === 'SELECT'
            ? Array.from(el.options).map(o => ({ text: collapse(o.text), value: o.value }))
            : []
    };
    function collapse(s) { return (s || '').replace(/\s+/g, ' ').trim(); }
"#;

const SET_VALUE_SCRIPT: &str = "arguments[0].value = arguments[1];";

const DISPATCH_SCRIPT: &str =
    "arguments[0].dispatchEvent(new Event(arguments[1], { bubbles: true }));";

#[derive(Debug, Deserialize)]
struct ElementKind {
    tag: String,
    #[serde(rename = "type")]
    input_type: String,
    options: Vec<SelectOption>,
}

/// Quote a value for use inside a CSS attribute selector
fn css_attr_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Browser instance for WebDriver automation
pub struct Browser {
    client: Client,
    browser_type: BrowserType,
}

impl Browser {
    /// Start a session on a running WebDriver
    ///
    /// # Arguments
    /// * `browser_type` - Firefox or Chrome
    /// * `webdriver_url` - Driver endpoint, the browser's standard port when `None`
    /// * `headless` - Whether to run in headless mode
    pub async fn connect(
        browser_type: BrowserType,
        webdriver_url: Option<&str>,
        headless: bool,
    ) -> Result<Self> {
        let webdriver_url = webdriver_url.unwrap_or(browser_type.default_webdriver_url());
        info!("Connecting to {:?} WebDriver", browser_type);

        if !Self::is_webdriver_running(webdriver_url).await {
            let driver_name = browser_type.driver_name();
            anyhow::bail!(
                "Cannot connect to {} WebDriver at {}.\n\
                Please ensure {} is running:\n\
                  For Firefox: geckodriver --port 4444\n\
                  For Chrome: chromedriver --port 9515",
                driver_name,
                webdriver_url,
                driver_name
            );
        }

        let mut caps = serde_json::Map::new();
        match &browser_type {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if headless {
                    args.push("--headless".to_string());
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }

        debug!("Connecting to WebDriver at {}", webdriver_url);
        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .with_context(|| format!("Failed to connect to WebDriver at {}", webdriver_url))?;

        Ok(Browser {
            client,
            browser_type,
        })
    }

    async fn is_webdriver_running(url: &str) -> bool {
        let status_url = format!("{}/status", url.trim_end_matches('/'));
        match reqwest::get(&status_url).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    pub fn browser_type(&self) -> BrowserType {
        self.browser_type
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        info!("Navigating to {}", url);
        self.client.goto(url).await?;

        // Wait up to 2 seconds for the page to be ready
        let wait_script = "return document.readyState === 'complete';";
        for _ in 0..20 {
            match self.client.execute(wait_script, vec![]).await {
                Ok(val) if val.as_bool().unwrap_or(false) => break,
                _ => tokio::time::sleep(tokio::time::Duration::from_millis(100)).await,
            }
        }

        Ok(())
    }

    /// The current page as a fillable surface
    pub fn surface(&self) -> WebSurface {
        WebSurface {
            client: self.client.clone(),
        }
    }

    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

/// The page currently loaded in a WebDriver session
#[derive(Clone)]
pub struct WebSurface {
    client: Client,
}

impl WebSurface {
    async fn run(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.client
            .execute(script, args)
            .await
            .context("Failed to execute script")
    }

    async fn find_first(&self, css: &str) -> Result<Option<Element>> {
        let found = self
            .client
            .find_all(Locator::Css(css))
            .await
            .with_context(|| format!("Failed to query {}", css))?;
        Ok(found.into_iter().next())
    }
}

fn element_arg(element: &Element) -> Result<Value> {
    serde_json::to_value(element).context("Failed to serialize element for JS")
}

#[async_trait]
impl FormSurface for WebSurface {
    type Element = Element;

    async fn fields(&self) -> Result<Vec<Field>> {
        let value = self.run(FIELDS_SCRIPT, vec![json!(false)]).await?;
        serde_json::from_value(value).context("Unexpected field list from page")
    }

    async fn focused_field(&self) -> Result<Option<Field>> {
        let value = self.run(FIELDS_SCRIPT, vec![json!(true)]).await?;
        serde_json::from_value(value).context("Unexpected focused field from page")
    }

    async fn element_by_id(&self, id: &str) -> Result<Option<Element>> {
        if id.is_empty() {
            return Ok(None);
        }
        self.find_first(&format!("[id={}]", css_attr_value(id))).await
    }

    async fn elements_by_name(&self, name: &str) -> Result<Vec<Element>> {
        let css = format!("[name={}]", css_attr_value(name));
        self.client
            .find_all(Locator::Css(&css))
            .await
            .with_context(|| format!("Failed to query {}", css))
    }

    async fn labels(&self) -> Result<Vec<Label>> {
        let value = self.run(LABELS_SCRIPT, vec![]).await?;
        serde_json::from_value(value).context("Unexpected label list from page")
    }

    async fn control_kind(&self, element: &Element) -> Result<ControlKind> {
        let value = self.run(KIND_SCRIPT, vec![element_arg(element)?]).await?;
        let kind: ElementKind =
            serde_json::from_value(value).context("Unexpected element description from page")?;

        Ok(match kind.tag.as_str() {
            "INPUT" => ControlKind::TextInput {
                input_type: kind.input_type,
            },
            "TEXTAREA" => ControlKind::TextArea,
            "SELECT" => ControlKind::Select {
                options: kind.options,
            },
            _ => ControlKind::Unsupported { tag: kind.tag },
        })
    }

    async fn set_value(&self, element: &Element, value: &str) -> Result<()> {
        self.run(SET_VALUE_SCRIPT, vec![element_arg(element)?, json!(value)])
            .await?;
        Ok(())
    }

    async fn dispatch(&self, element: &Element, event: DomEvent) -> Result<()> {
        debug!("Dispatching {} event", event.name());
        self.run(DISPATCH_SCRIPT, vec![element_arg(element)?, json!(event.name())])
            .await?;
        Ok(())
    }

    async fn input_attribute(&self, attr: &str) -> Result<Option<String>> {
        match self.find_first(&format!("input[{}]", attr)).await? {
            Some(element) => Ok(element.attr(attr).await?),
            None => Ok(None),
        }
    }
}
