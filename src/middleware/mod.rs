pub mod auth_extractor;
pub mod origin_guard;
