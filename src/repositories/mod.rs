pub mod identity_repo;
pub mod post_repository;
