pub mod chat;
pub mod config;
pub mod generate;
pub mod recall;
pub mod upload;
