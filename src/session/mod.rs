pub mod chat;
pub mod history;
pub mod render;
pub mod storage;
pub mod store;
