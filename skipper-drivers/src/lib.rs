//! WebDriver-backed DOM host for the skipper engine.
//!
//! This crate connects to a WebDriver service and exposes the live page
//! through the engine's [`skipper_engine::DomHost`] and
//! [`skipper_engine::PageSignals`] traits.
//!
//! - [`skipper_browser::driver::SkipperDriver`]: session setup, navigation and readiness
//! - [`skipper_browser::page::WebDriverHost`]: frame-aware DOM access through page scripts
//! - [`skipper_browser::scripts::PageScripts`]: the JavaScript run inside the page
pub mod skipper_browser;
