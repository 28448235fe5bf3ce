//! Widget UI state and rendering.
//!
//! # Structure
//!
//! - [`transcript`]: the chat log container
//! - [`renderer`]: the only writer of the chat log
//! - [`composer`]: the message input field and input validation
//! - [`chrome`]: view-mode and theme state
//! - [`preferences`]: durable key-value storage for the theme
//! - [`events`]: browser events and their dispatch
//! - [`pages`]: server-rendered HTML

pub mod chrome;
pub mod composer;
pub mod events;
pub mod pages;
pub mod preferences;
pub mod renderer;
pub mod transcript;
