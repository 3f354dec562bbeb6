pub mod download;
pub mod file_info;
pub mod health;
pub mod upload;
