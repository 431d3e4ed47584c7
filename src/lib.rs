//! taskrelay — Teams form bot that relays submissions to a Logic App.

pub mod bot;
pub mod cards;
pub mod config;
pub mod connector;
pub mod error;
pub mod notifier;
pub mod schema;
pub mod server;
pub mod teams;
