use memtrack::Backend;
use test_alloc::{Arena, Recorder};
use tracing::info;
use tracing_subscriber::EnvFilter;

// Mixed sizes with interleaved frees and in-place resizes.
fn workload<B: Backend>(arena: &mut Arena<B>) {
    let mut blocks = Vec::new();
    for round in 0..8usize {
        for size in [8, 24, 64, 200] {
            let block = if round % 2 == 0 {
                arena.alloc(size + round)
            } else {
                arena.alloc_zeroed(size + round)
            };
            if let Some(block) = block {
                blocks.push(block);
            }
        }
        if let Some(last) = blocks.last().copied() {
            arena.resize_in_place(last, 300 + round);
        }
        if round % 3 == 2 {
            for block in blocks.drain(..blocks.len() / 2) {
                arena.free(block);
            }
        }
    }
    for block in blocks {
        arena.free(block);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    memtrack::log_selection();

    let mut arena = Arena::new(64 * 1024);
    workload(&mut arena);
    info!(used = arena.used(), live = arena.live_blocks(), "active backend workload done");

    let rec = Recorder::new();
    let mut recorded = Arena::with_backend(64 * 1024, &rec);
    workload(&mut recorded);

    println!("tool: {}", memtrack::TRACK_TOOL);
    println!("events: {}", rec.events().len());
    println!("live blocks: {}", recorded.live_blocks());
    println!("tracked bytes: {}", rec.tracked_bytes());
    println!("violations: {}", rec.violations().len());
    Ok(())
}
