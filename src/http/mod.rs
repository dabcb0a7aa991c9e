//! HTTP access for the catalog and package downloads.

mod client;
mod retry;

pub use client::{HttpClient, USER_AGENT};
pub use retry::{MAX_ATTEMPTS, NonRetryableError, check_retryable, classify_status};
