//! Demonstration of the cache core's request-coalescing and streaming
//! behavior against a toy in-memory upstream.
//!
//! Run with: `cargo run --bin demo`

use inline_http_cache::{CacheError, Config, DownstreamCallback, FilterGlue, HeaderMap, OwnedHeaderMap};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

struct PrintingCallback {
    label: String,
    tx: mpsc::Sender<()>,
}

impl DownstreamCallback for PrintingCallback {
    fn emit_headers(&mut self, headers: OwnedHeaderMap, end_stream: bool) {
        println!("  [{}] headers (end_stream={end_stream}):", self.label);
        for (k, v) in headers.iter() {
            println!("    {k}: {v}");
        }
    }
    fn emit_data(&mut self, bytes: &[u8], end_stream: bool) {
        println!(
            "  [{}] data ({} bytes, end_stream={end_stream}): {:?}",
            self.label,
            bytes.len(),
            String::from_utf8_lossy(bytes)
        );
        if end_stream {
            let _ = self.tx.send(());
        }
    }
    fn emit_trailers(&mut self, trailers: OwnedHeaderMap) {
        println!("  [{}] trailers:", self.label);
        for (k, v) in trailers.iter() {
            println!("    {k}: {v}");
        }
        let _ = self.tx.send(());
    }
    fn emit_failure(&mut self, error: CacheError) {
        println!("  [{}] failure: {error}", self.label);
        let _ = self.tx.send(());
    }
}

fn request_headers(path: &str) -> OwnedHeaderMap {
    let mut h = OwnedHeaderMap::new();
    h.push("host", "demo.local");
    h.push("path", path);
    h.push("method", "GET");
    h.push("scheme", "https");
    h.push("user-agent", "cache-demo/1.0");
    h
}

fn main() {
    println!("=== inline-http-cache Demo ===\n");

    demo_cold_then_warm();
    demo_concurrent_coalescing();
    demo_non_cacheable_bypass();

    println!("\n=== All demos completed ===");
}

/// Demo 1: a cache miss fetches upstream; the identical request afterward
/// is served entirely from the directory.
fn demo_cold_then_warm() {
    println!("--- Demo 1: Cold Miss, Then Warm Hit ---");
    let glue = FilterGlue::new(&Config::default());

    let (tx, rx) = mpsc::channel();
    let mut handle = glue
        .on_request_headers(&request_headers("/hello"), "/hello", 64, Box::new(PrintingCallback { label: "leader".into(), tx }))
        .expect("first request is always a miss");

    let mut upstream_headers = OwnedHeaderMap::new();
    upstream_headers.push(":status", "200");
    upstream_headers.push("content-type", "text/plain");
    handle.on_upstream_headers(&upstream_headers, false);
    handle.on_upstream_data(b"hello from upstream", true);
    handle.finish();
    let _ = rx.recv_timeout(Duration::from_secs(1));

    let (tx2, rx2) = mpsc::channel();
    let second = glue.on_request_headers(&request_headers("/hello"), "/hello", 64, Box::new(PrintingCallback { label: "cache-hit".into(), tx: tx2 }));
    assert!(second.is_none(), "second request should never reach the origin");
    let _ = rx2.recv_timeout(Duration::from_secs(1));
    println!("  ✓ cold/warm demo complete\n");
}

/// Demo 2: several concurrent requests for the same fingerprint coalesce
/// onto a single upstream fetch.
fn demo_concurrent_coalescing() {
    println!("--- Demo 2: Concurrent Request Coalescing ---");
    let glue = Arc::new(FilterGlue::new(&Config::default()));

    let (tx, rx) = mpsc::channel();
    let mut handle = glue
        .on_request_headers(&request_headers("/shared"), "/shared", 64, Box::new(PrintingCallback { label: "leader".into(), tx }))
        .unwrap();

    let waiters: Vec<_> = (0..3)
        .map(|i| {
            let glue = Arc::clone(&glue);
            let (wtx, wrx) = mpsc::channel();
            let handle = std::thread::spawn(move || {
                glue.on_request_headers(
                    &request_headers("/shared"),
                    "/shared",
                    64,
                    Box::new(PrintingCallback { label: format!("waiter-{i}"), tx: wtx }),
                )
            });
            (handle, wrx)
        })
        .collect();

    std::thread::sleep(Duration::from_millis(50));

    let mut upstream_headers = OwnedHeaderMap::new();
    upstream_headers.push(":status", "200");
    handle.on_upstream_headers(&upstream_headers, false);
    handle.on_upstream_data(b"one fetch serves everyone", true);
    handle.finish();
    let _ = rx.recv_timeout(Duration::from_secs(1));

    for (h, wrx) in waiters {
        let result = h.join().unwrap();
        assert!(result.is_none(), "coalesced waiters never fetch upstream themselves");
        let _ = wrx.recv_timeout(Duration::from_secs(1));
    }
    println!("  ✓ coalescing demo complete\n");
}

/// Demo 3: a non-2xx response is still delivered to the requester but
/// never cached.
fn demo_non_cacheable_bypass() {
    println!("--- Demo 3: Non-2xx Responses Bypass the Cache ---");
    let glue = FilterGlue::new(&Config::default());

    let (tx, rx) = mpsc::channel();
    let mut handle = glue
        .on_request_headers(&request_headers("/broken"), "/broken", 64, Box::new(PrintingCallback { label: "leader".into(), tx }))
        .unwrap();
    let mut upstream_headers = OwnedHeaderMap::new();
    upstream_headers.push(":status", "503");
    handle.on_upstream_headers(&upstream_headers, true);
    handle.finish();
    let _ = rx.recv_timeout(Duration::from_secs(1));

    let (tx2, _rx2) = mpsc::channel();
    let second = glue.on_request_headers(&request_headers("/broken"), "/broken", 64, Box::new(PrintingCallback { label: "refetch".into(), tx: tx2 }));
    assert!(second.is_some(), "a 503 must never be served from cache");
    println!("  ✓ bypass demo complete\n");
}
