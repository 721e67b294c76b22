//! HTTP middleware stack for the functions service.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, one transaction per request)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (newsletter functions are called from the shop frontend)

pub mod request_id;

pub use request_id::request_id_middleware;
