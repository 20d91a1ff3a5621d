//! Cache-control policies attached to API responses.
//!
//! Academic records are private to the session and revalidated on every
//! read. Ledger state and health results are never stored by caches.

use actix_web::http::header::{self, HeaderName};

/// How intermediaries may keep a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// `private, no-cache, must-revalidate`
    PrivateRevalidate,
    /// `no-store`
    NoStore,
}

impl CachePolicy {
    /// Header value for this policy.
    pub const fn directive(self) -> &'static str {
        match self {
            Self::PrivateRevalidate => "private, no-cache, must-revalidate",
            Self::NoStore => "no-store",
        }
    }

    /// Header pair suitable for `HttpResponseBuilder::insert_header`.
    pub const fn header(self) -> (HeaderName, &'static str) {
        (header::CACHE_CONTROL, self.directive())
    }
}
