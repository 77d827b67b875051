//! Request classification for the worker.

use regex::Regex;

use super::WorkerError;
use crate::api::{Method, Request, RequestMode};

/// How an intercepted request is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Not handled; forwarded untouched
    PassThrough,
    /// Story listing: network first, cached copy or offline payload on failure
    Api,
    /// Page load: network first, app shell on failure
    Navigation,
    /// Everything else: cache first, network on miss
    CacheFirst,
}

#[derive(Debug, Clone)]
pub struct Router {
    api_pattern: Regex,
}

impl Router {
    /// Route story listing calls under `api_base_url` to the API strategy
    pub fn new(api_base_url: &str) -> Result<Self, WorkerError> {
        let pattern = format!(
            r"^{}/stories(\?.*)?$",
            regex::escape(api_base_url.trim_end_matches('/'))
        );
        Ok(Self {
            api_pattern: Regex::new(&pattern)?,
        })
    }

    pub fn is_api(&self, url: &str) -> bool {
        self.api_pattern.is_match(url)
    }

    pub fn route(&self, request: &Request) -> Strategy {
        if request.method != Method::Get {
            return Strategy::PassThrough;
        }
        if self.is_api(&request.url) {
            return Strategy::Api;
        }
        if request.mode == RequestMode::Navigate {
            return Strategy::Navigation;
        }
        Strategy::CacheFirst
    }
}
