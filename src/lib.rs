//! In-process, request-coalescing HTTP response cache core for a streaming
//! reverse-proxy filter chain.
//!
//! This crate implements the data structures and control flow a filter
//! wires per request — it does not itself speak HTTP, parse wire bytes, or
//! own a worker-thread pool. Three layers compose bottom-up:
//!
//! - [`ring_queue`] / [`entry`]: a lock-free single-producer,
//!   multi-consumer block channel ([`RingBlockQueue`]) and the ordered
//!   chain of them that backs one response ([`StreamingEntry`]), readable
//!   while still being written.
//! - [`writer`] / [`reader`]: the self-delimiting byte framing
//!   ([`EntryWriter`]) and decoding ([`EntryReader`]) on top of that
//!   channel.
//! - [`directory`] / [`coalescing`] / [`filter`]: the bounded LRU
//!   fingerprint map ([`LruDirectory`]), the leader-election/waiter-parking
//!   state machine ([`CoalescingCoordinator`]), and [`FilterGlue`] tying it
//!   all into per-request operations.
//!
//! [`RingBlockQueue`]: ring_queue::RingBlockQueue
//! [`StreamingEntry`]: entry::StreamingEntry
//! [`EntryWriter`]: writer::EntryWriter
//! [`EntryReader`]: reader::EntryReader
//! [`LruDirectory`]: directory::LruDirectory
//! [`CoalescingCoordinator`]: coalescing::CoalescingCoordinator
//! [`FilterGlue`]: filter::FilterGlue

mod backoff;
mod block;
pub mod callback;
pub mod coalescing;
pub mod config;
pub mod directory;
pub mod entry;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod headers;
mod invariants;
pub mod reader;
pub mod ring_queue;
pub mod writer;

pub use callback::{ByteView, DownstreamCallback, UpstreamCallback};
pub use coalescing::{CoalescingCoordinator, LeaderToken};
pub use config::Config;
pub use directory::LruDirectory;
pub use entry::StreamingEntry;
pub use error::{CacheError, NotYetReadable, QueueFull};
pub use filter::{FilterGlue, MissHandle};
pub use fingerprint::{compute_fingerprint, Fingerprint};
pub use headers::{HeaderMap, OwnedHeaderMap};
pub use reader::EntryReader;
pub use ring_queue::RingBlockQueue;
pub use writer::EntryWriter;
