// src/lib.rs
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod forms;
pub mod links;
pub mod models;
pub mod pages;
pub mod valuation;
pub mod views;
