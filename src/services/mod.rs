pub mod author_enrichment;
pub mod page_cache;
pub mod rate_limiter;
pub mod session_services;
