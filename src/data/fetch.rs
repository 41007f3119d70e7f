//! Text fetching backends.
//!
//! The loader only needs "give me the body at this relative path". On wasm
//! that is a browser `fetch`; natively the data directory is read from disk.

use std::future::Future;

use super::FetchError;

/// Retrieves text documents by path relative to a data root.
pub trait Fetcher {
    /// Fetches the full body of the document at `path`.
    fn fetch_text(&self, path: &str) -> impl Future<Output = Result<String, FetchError>>;
}

/// Joins a base URL or directory with a relative path using a single `/`.
pub fn join_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}

/// Reads documents from a local directory.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base_dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileFetcher {
    /// Creates a fetcher rooted at `base_dir`.
    pub fn new(base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Fetcher for FileFetcher {
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let full = self.base_dir.join(path.trim_start_matches('/'));
        log::debug!("Reading {}", full.display());
        std::fs::read_to_string(&full).map_err(|e| FetchError::Io {
            path: full.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Fetches documents over HTTP with the browser `fetch` API.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct WebFetcher {
    base_url: String,
}

#[cfg(target_arch = "wasm32")]
impl WebFetcher {
    /// Creates a fetcher rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    async fn request(&self, url: &str) -> Result<String, FetchError> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;
        use web_sys::{Request, RequestInit, RequestMode, Response};

        let js_error = |e: wasm_bindgen::JsValue| FetchError::Request {
            path: url.to_string(),
            reason: format!("{:?}", e),
        };

        let window = web_sys::window().ok_or_else(|| FetchError::Request {
            path: url.to_string(),
            reason: "no window available".to_string(),
        })?;

        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);
        let request = Request::new_with_str_and_init(url, &opts).map_err(js_error)?;

        let value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_error)?;
        let response: Response = value.dyn_into().map_err(js_error)?;

        if !response.ok() {
            return Err(FetchError::Status {
                path: url.to_string(),
                status: response.status(),
                status_text: response.status_text(),
            });
        }

        let text = JsFuture::from(response.text().map_err(js_error)?)
            .await
            .map_err(js_error)?;
        text.as_string().ok_or_else(|| FetchError::Request {
            path: url.to_string(),
            reason: "response body is not text".to_string(),
        })
    }
}

#[cfg(target_arch = "wasm32")]
impl Fetcher for WebFetcher {
    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let url = join_path(&self.base_url, path);
        log::debug!("Fetching {}", url);
        self.request(&url).await
    }
}
