//! # comet-window
//!
//! Rolling windows of the most recent blocks and transactions.
//!
//! A [`RollingWindow`] holds at most [`MAX_ROWS`] entries, newest first. It is
//! seeded from a snapshot page and then advanced by [`RollingWindow::absorb`],
//! which silently drops out-of-order and duplicate events. [`LiveWindow`]
//! drives a window from a live subscription on a background task.

pub mod live;
pub mod window;


pub use live::LiveWindow;
pub use window::{RollingWindow, WindowEntry, MAX_ROWS};
