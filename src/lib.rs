//! # easyfill
#![allow(clippy::uninlined_format_args)]
//!
//! Fills web forms with suggestions streamed from an AI backend.
//!
//! The fields of a page are described and sent to the backend, which answers
//! with free text interleaved with fill records:
//!
//! ```text
//! <action> type( {"id": "email"}, "jane@example.com" ) </action>
//! ```
//!
//! Records are parsed incrementally as the body arrives, each selector is
//! resolved to one element, and the value is written with the `input` and
//! `change` notifications a page's own scripts expect.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Describe the fields of a saved page
//! easyfill fields --html application.html --format simple
//!
//! # Log in once through the frontend; the user id is stored
//! easyfill auth
//!
//! # Fill a live page with suggestions from the backend
//! easyfill fill --url "https://jobs.example.com/apply"
//!
//! # Replay a recorded response against a saved page
//! easyfill fill --html application.html --replay response.txt --chunk-size 7
//!
//! # Show the actions contained in a response
//! easyfill parse response.txt
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use easyfill::{Autofiller, FormDocument, ReplaySource};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let page = FormDocument::parse(r#"<input id="email">"#);
//! let filler = Autofiller::new(page);
//!
//! let mut body = ReplaySource::new(
//!     r#"<action> type({"id": "email"}, "jane@example.com") </action>"#,
//!     16,
//! );
//! let report = filler.run(&mut body).await?;
//! assert_eq!(report.filled.len(), 1);
//! # Ok(())
//! # }
//! ```

/// User id pickup from the frontend
pub mod auth;

/// Stream consumption and message handling
pub mod autofill;

/// Backend HTTP client
pub mod backend;

/// Runtime settings
pub mod config;

/// HTML snapshot surface
pub mod document;

pub mod errors;

/// Value application per control kind
pub mod executor;

pub mod messages;

/// Incremental action stream parser
pub mod parser;

/// Selector resolution
pub mod resolver;

/// Persistent state
pub mod store;

/// Page access abstraction
pub mod surface;

/// Shared data types
pub mod types;

/// WebDriver browser control
pub mod webdriver;

pub use autofill::{Autofiller, ChunkSource, ReplaySource};
pub use document::FormDocument;
pub use errors::{EasyfillError, FillError};
pub use parser::ActionStreamParser;
pub use surface::FormSurface;
pub use types::{Action, Field, FillReport, OutputFormat, Selector, SelectorStrategy};
pub use webdriver::{Browser, BrowserType, WebSurface};
