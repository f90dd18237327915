pub mod app;
pub mod auth;
pub mod bus;
pub mod cache;
pub mod command;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod event;
pub mod filter;
pub mod handler;
pub mod middleware;
pub mod optimus;
pub mod queue;
pub mod sso;
pub mod validation;
pub mod vault;

#[cfg(test)]
pub mod testing;
