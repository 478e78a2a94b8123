//! Parley: an interactive multi-agent chat front-end.
//!
//! The pieces compose around one [`io::IoContext`]: slash commands parse in
//! [`command`], input/output/tool traffic flows through a swappable
//! [`filter::SecurityFilter`], tool execution is gated by
//! [`security::SecurityPolicy`], and model responses stream through
//! [`stream::ResponseHandler`]. A [`session::ChatSession`] ties them into a
//! read-dispatch loop over any [`model::ChatModel`].

pub mod cli;
pub mod command;
pub mod config;
pub mod filter;
pub mod interrupt;
pub mod io;
pub mod model;
pub mod security;
pub mod session;
pub mod stream;
pub mod tools;
