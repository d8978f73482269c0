use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use cast_card::{Author, Cast};
use cast_card_embedded_graphics::{CardRenderer, EgTextMeasurer};
use cast_card_render::{compose_card, plan_text, wrap_text, CardConfig};
use chrono::{DateTime, TimeZone, Utc};

struct TrackingAllocator;

static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_BYTES: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL_ALLOCATOR: TrackingAllocator = TrackingAllocator;

fn note_grow(delta: usize) {
    let live = LIVE_BYTES.fetch_add(delta, Ordering::Relaxed) + delta;
    PEAK_BYTES.fetch_max(live, Ordering::Relaxed);
}

fn note_shrink(delta: usize) {
    let _ = LIVE_BYTES.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |live| {
        Some(live.saturating_sub(delta))
    });
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            note_grow(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        note_shrink(layout.size());
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            note_grow(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                note_grow(new_size - layout.size());
            } else {
                note_shrink(layout.size() - new_size);
            }
        }
        new_ptr
    }
}

#[derive(Clone, Debug)]
struct CaseResult {
    input: &'static str,
    case: &'static str,
    iterations: usize,
    min_ns: u128,
    median_ns: u128,
    max_ns: u128,
    median_peak_heap_bytes: usize,
    max_peak_heap_bytes: usize,
}

fn median<T: Copy>(sorted: &[T]) -> T {
    sorted[sorted.len() / 2]
}

fn run_case<F>(
    input: &'static str,
    case: &'static str,
    warmup_iters: usize,
    measure_iters: usize,
    mut op: F,
) -> CaseResult
where
    F: FnMut() -> usize,
{
    for _ in 0..warmup_iters {
        black_box(op());
    }

    let mut times = Vec::with_capacity(measure_iters);
    let mut peaks = Vec::with_capacity(measure_iters);
    for _ in 0..measure_iters {
        let baseline = LIVE_BYTES.load(Ordering::Relaxed);
        PEAK_BYTES.store(baseline, Ordering::Relaxed);
        let start = Instant::now();
        black_box(op());
        times.push(start.elapsed().as_nanos());
        peaks.push(PEAK_BYTES.load(Ordering::Relaxed).saturating_sub(baseline));
    }
    times.sort_unstable();
    peaks.sort_unstable();

    CaseResult {
        input,
        case,
        iterations: measure_iters,
        min_ns: times[0],
        median_ns: median(&times),
        max_ns: times[times.len() - 1],
        median_peak_heap_bytes: median(&peaks),
        max_peak_heap_bytes: peaks[peaks.len() - 1],
    }
}

fn inputs() -> Vec<(&'static str, String)> {
    let sentence = "onchain summer is back and every cast wants to be a token ";
    vec![
        ("empty", String::new()),
        ("two_lines", "line one\nline two".to_string()),
        ("post_300", sentence.repeat(6).chars().take(300).collect()),
        ("wall_4k", sentence.repeat(70)),
        (
            "paragraphs",
            format!("{0}\n\n{0}\n\n{0}", sentence.repeat(3)),
        ),
    ]
}

fn main() {
    let quick = std::env::args().any(|arg| arg == "--quick");
    let warmup_iters = if quick { 1 } else { 3 };
    let measure_iters = if quick { 3 } else { 15 };

    println!("# cast-card benchmark");
    println!(
        "# mode={} warmup_iters={} measure_iters={}",
        if quick { "quick" } else { "full" },
        warmup_iters,
        measure_iters
    );
    println!("input,case,iterations,min_ns,median_ns,max_ns,median_peak_heap_bytes,max_peak_heap_bytes");

    let cfg = CardConfig::default();
    let measurer = EgTextMeasurer::new();
    let renderer = CardRenderer::new(cfg.clone()).unwrap_or_else(|e| panic!("config: {}", e));
    let generated_at: DateTime<Utc> = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("fixed timestamp"));
    let author = Author::new("bench", Some("Bench Marker".to_string()))
        .unwrap_or_else(|e| panic!("author: {}", e));
    let max_width = cfg.layout.content_max_width() as f32;

    let mut results = Vec::new();
    for (input, text) in inputs() {
        let cast = Cast::new(text.clone(), "0xbench", author.clone(), generated_at);

        results.push(run_case(input, "wrap_text", warmup_iters, measure_iters, || {
            wrap_text(&text, &cfg.fonts.body, max_width, &measurer).len()
        }));
        results.push(run_case(input, "plan_text", warmup_iters, measure_iters, || {
            plan_text(&text, &cfg.fonts.body, &cfg.layout, &measurer)
                .visible_lines
                .len()
        }));
        results.push(run_case(
            input,
            "compose_card",
            warmup_iters,
            measure_iters,
            || {
                compose_card(&cast, "BENCH", generated_at, &cfg, &measurer)
                    .unwrap_or_else(|e| panic!("compose failed: {}", e))
                    .commands
                    .len()
            },
        ));
        results.push(run_case(
            input,
            "render_png",
            warmup_iters,
            measure_iters,
            || {
                renderer
                    .render(&cast, "BENCH", generated_at)
                    .unwrap_or_else(|e| panic!("render failed: {}", e))
                    .png
                    .len()
            },
        ));
    }

    for result in &results {
        println!(
            "{},{},{},{},{},{},{},{}",
            result.input,
            result.case,
            result.iterations,
            result.min_ns,
            result.median_ns,
            result.max_ns,
            result.median_peak_heap_bytes,
            result.max_peak_heap_bytes
        );
    }
}
