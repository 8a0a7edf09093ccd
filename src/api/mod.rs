pub mod chatbot;
pub mod client;
