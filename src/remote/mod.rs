//! HTTP access to the remote collection.

mod client;

pub use client::RemoteClient;
