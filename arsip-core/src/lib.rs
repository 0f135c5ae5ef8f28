#![allow(clippy::new_without_default)]

pub mod auth;
pub mod cache;
pub mod caption;
pub mod config;
pub mod error;
pub mod record;
pub mod remote;
pub mod search;
pub mod session;
pub mod sync;
pub mod util;
