//! Client-side state containers.

pub mod unread;

pub use unread::UnreadCounter;
