//! Client for the remote repository contents API: file and directory reads,
//! raw blob reads, and hash-checked create, update and delete.

mod client;
mod dto;

pub use client::{ContentClient, file_body};
pub use dto::{
    CommitInfo, CommitSignature, ContentHash, EntryKind, FileMeta, FileOrDir, Versioned,
    WriteOutcome,
};
