pub mod error;
pub mod index;
pub mod metadata;
pub mod mod_dto;
pub mod paths;
pub mod profile;
pub mod server;
pub mod version;
