//! Type definitions for the app-server client
//!
//! This module contains all the core types used throughout the client,
//! organized into logical submodules:
//! - `events`: Events delivered to the application
//! - `identifiers`: Newtype wrappers for request and thread ids
//! - `options`: Client configuration and builder
//! - `params`: Request parameter payloads
//! - `thread`: Thread listing types

pub mod events;
pub mod identifiers;
pub mod options;
pub mod params;
pub mod thread;

pub use events::ClientEvent;
pub use identifiers::{RequestId, ThreadId};
pub use options::{ClientOptions, ClientOptionsBuilder};
pub use params::{
    ClientInfo, InitializeParams, ThreadListParams, ThreadResumeParams, ThreadStartParams,
    TurnInterruptParams, TurnStartParams, UserInput,
};
pub use thread::ThreadSummary;
