pub mod decompression;
pub mod deployment;
pub mod download;
pub mod guard;
pub mod index;
pub mod library;
pub mod mod_manager;
pub mod mod_stager;
pub mod package;
pub mod pak_name;
pub mod profiles;
pub mod registry;
pub mod remote;
pub mod scanner;
pub mod server_sync;
pub mod tasks;
