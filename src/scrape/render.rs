//! Dynamic-rendering collaborator seam
//!
//! Pages that require script execution are fetched through a renderer
//! (headless browser automation) instead of a plain HTTP GET. The renderer
//! is abstracted behind a single synchronous capability so the fetcher's
//! retry and backoff logic is identical for rendered and plain fetches.

use thiserror::Error;

/// Errors surfaced by a dynamic renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer timed out loading {url}")]
    Timeout { url: String },

    #[error("Renderer failed for {url}: {message}")]
    Failed { url: String, message: String },

    #[error("No renderer is configured")]
    NotConfigured,
}

impl RenderError {
    /// Whether the failure is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Failed { .. })
    }
}

/// Capability interface for rendering script-dependent pages
///
/// `render` blocks until the page is loaded and returns the rendered HTML;
/// the fetcher runs it on a blocking thread. Implementations must be safe
/// to share across worker tasks.
pub trait DynamicRenderer: Send + Sync {
    /// Renders the page at `url` and returns its HTML after script execution
    fn render(&self, url: &str) -> Result<String, RenderError>;
}

/// Renderer stand-in used when dynamic rendering is requested but no
/// browser automation backend is wired up
///
/// Every render attempt fails with [`RenderError::NotConfigured`], which
/// surfaces as a terminal per-URL render error rather than a crash.
pub struct UnconfiguredRenderer;

impl DynamicRenderer for UnconfiguredRenderer {
    fn render(&self, _url: &str) -> Result<String, RenderError> {
        Err(RenderError::NotConfigured)
    }
}
