use criterion::{black_box, criterion_group, criterion_main, Criterion};
use inline_http_cache::{LruDirectory, RingBlockQueue, StreamingEntry};
use std::sync::Arc;

fn bench_ring_block_queue_write(c: &mut Criterion) {
    c.bench_function("ring_block_queue_write", |b| {
        b.iter(|| {
            let queue = RingBlockQueue::new(1024);
            for i in 0..1024u32 {
                queue.write(&i.to_le_bytes()).unwrap();
            }
            black_box(&queue);
        });
    });
}

fn bench_ring_block_queue_read(c: &mut Criterion) {
    let queue = RingBlockQueue::new(1024);
    for i in 0..1024u32 {
        queue.write(&i.to_le_bytes()).unwrap();
    }
    c.bench_function("ring_block_queue_read", |b| {
        b.iter(|| {
            let mut out = [0u8; 64];
            for i in 0..1024 {
                black_box(queue.read(i, &mut out).unwrap());
            }
        });
    });
}

fn bench_ring_block_queue_concurrent_fanout(c: &mut Criterion) {
    c.bench_function("ring_block_queue_concurrent_fanout_8_readers", |b| {
        b.iter(|| {
            let queue = Arc::new(RingBlockQueue::new(256));
            for i in 0..256u32 {
                queue.write(&i.to_le_bytes()).unwrap();
            }
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let q = Arc::clone(&queue);
                    std::thread::spawn(move || {
                        let mut out = [0u8; 64];
                        for i in 0..256 {
                            black_box(q.read(i, &mut out).unwrap());
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
        });
    });
}

fn bench_lru_directory_insert(c: &mut Criterion) {
    c.bench_function("lru_directory_insert", |b| {
        b.iter(|| {
            let dir = LruDirectory::new(1024);
            for i in 0..1024u32 {
                dir.insert(i.to_le_bytes().to_vec(), Arc::new(StreamingEntry::new(4)));
            }
            black_box(&dir);
        });
    });
}

fn bench_lru_directory_get(c: &mut Criterion) {
    let dir = LruDirectory::new(1024);
    for i in 0..1024u32 {
        dir.insert(i.to_le_bytes().to_vec(), Arc::new(StreamingEntry::new(4)));
    }
    c.bench_function("lru_directory_get_hit", |b| {
        b.iter(|| {
            for i in 0..1024u32 {
                black_box(dir.get(&i.to_le_bytes().to_vec()));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_ring_block_queue_write,
    bench_ring_block_queue_read,
    bench_ring_block_queue_concurrent_fanout,
    bench_lru_directory_insert,
    bench_lru_directory_get,
);
criterion_main!(benches);
