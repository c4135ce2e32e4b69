//! Template resolution engine.
//!
//! ```text
//! IrNode ──► TemplateContext (scope stack, fallback policy)
//!                  │
//! Template ──► Renderer::render ──► serde_json::Value
//!                  │
//!             item Template, once per {@items} element
//! ```

mod cache;
mod context;
mod document;
mod error;
mod fallback;
mod placeholder;
mod renderer;

pub use cache::TemplateCache;
pub use context::TemplateContext;
pub use document::Template;
pub use fallback::FallbackPolicy;
pub use renderer::Renderer;
