//! Terminal session control and the render loop.
//!
//! # Architecture
//!
//! ```text
//! stdin ──reader thread──► mpsc ──► App loop ──► ticks
//!                                     │            invoke root
//! TIOCGWINSZ probe ───────────────────┤            solve layout
//! frame-rate timer ───────────────────┘            compose frame
//!                                                  diff render
//!                                                  drain effects once
//! ```
//!
//! [`App`] owns one running application. [`App::run`] sets the terminal
//! modes, spawns the reader, drives ticks until [`exit`], then tears
//! everything down before returning.

mod app;
mod reader;
mod terminal;

pub use app::{exit, App, RunOptions};
