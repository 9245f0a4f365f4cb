//! Terminal chat client that forwards dental clinical questions to a
//! configured LLM provider (Mistral, OpenAI or Anthropic).

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod display;
pub mod input;
pub mod providers;
