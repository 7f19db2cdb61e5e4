//! Control protocol for the app server connection

pub mod protocol;

pub use protocol::{
    IncomingMessage, OutgoingMessage, PendingCall, ProtocolDispatcher, ProtocolHandler,
    ResponseOutcome,
};
