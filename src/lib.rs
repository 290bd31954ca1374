//! Postboard: a small community blog with group, profile and follow feeds.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
