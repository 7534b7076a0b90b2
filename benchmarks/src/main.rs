use std::{
    cmp,
    hint::black_box,
    time::{Duration, Instant},
};

use rand_core::{RngCore, SeedableRng};
use randquik::{Backend, ChaCha, Rounds};

fn main() {
    println!("label,min,p10,p50,p90,max,min_repeats,max_repeats");
    for bench in collect_benchmarks() {
        let label = bench.label.clone();
        let NanosPerOp {
            min,
            p10,
            p50,
            p90,
            max,
            min_repeats,
            max_repeats,
        } = run_benchmark(bench);
        println!(
            "{label},{min:.2},{p10:.2},{p50:.2},{p90:.2},{max:.2},{min_repeats},{max_repeats}"
        );
        assert!(min <= p10 && p10 <= p50 && p50 <= p90 && p90 <= max);
        assert!(min_repeats <= max_repeats);
    }
}

fn backends() -> Vec<(&'static str, Backend)> {
    let mut backends = vec![("scalar", Backend::scalar())];
    if let Some(ssse3) = Backend::x86_ssse3() {
        backends.push(("ssse3", ssse3));
    }
    if let Some(avx2) = Backend::x86_avx2() {
        backends.push(("avx2", avx2));
    }
    if let Some(neon) = Backend::aarch64_neon() {
        backends.push(("neon", neon));
    }
    backends
}

fn collect_benchmarks() -> Vec<Benchmark> {
    let mut benchmarks = Vec::new();

    for (name, backend) in backends() {
        benchmarks.push(bench_next_u32(name, backend));
    }
    benchmarks.push(bench_next_u32_rand_chacha());

    // Bulk fills: 512 bytes exercises the carry-over fast path, 2 MiB is
    // what the writer pipeline hands to each producer.
    for size in [512, 1 << 21] {
        for (name, backend) in backends() {
            benchmarks.push(bench_bulk(name, backend, size));
        }
        benchmarks.push(bench_bulk_rand_chacha(size));
    }

    benchmarks
}

#[test]
fn test_benchmarks() {
    for mut bench in collect_benchmarks() {
        (bench.work)(1);
    }
}

const SAMPLES: usize = 100;
const MIN_DURATION: Duration = Duration::from_millis(3);
const MIN_REPEATS: u32 = 1_000;

struct Benchmark {
    label: String,
    work: Box<dyn FnMut(u32)>,
}

struct NanosPerOp {
    min: f64,
    p10: f64,
    p50: f64,
    p90: f64,
    max: f64,
    min_repeats: u32,
    max_repeats: u32,
}

fn run_benchmark(mut bench: Benchmark) -> NanosPerOp {
    let mut times = Vec::with_capacity(SAMPLES);
    let mut min_repeats = u32::MAX;
    let mut max_repeats = 0;
    for _ in 0..SAMPLES {
        let (dt, repeats) = one_sample(&mut bench);
        min_repeats = cmp::min(min_repeats, repeats);
        max_repeats = cmp::max(max_repeats, repeats);
        times.push((dt.as_nanos() as f64) / (repeats as f64));
    }
    times.sort_by(f64::total_cmp);
    let n = times.len();
    NanosPerOp {
        min: times[0],
        p10: times[n / 10],
        p50: times[n / 2],
        p90: times[(n * 9) / 10],
        max: times[n - 1],
        min_repeats,
        max_repeats,
    }
}

fn one_sample(bench: &mut Benchmark) -> (Duration, u32) {
    let mut repeats = MIN_REPEATS;
    loop {
        let t0 = Instant::now();
        (bench.work)(repeats);
        let dt = t0.elapsed();
        if dt >= MIN_DURATION {
            return (dt, repeats);
        }
        let Some(more) = repeats.checked_mul(2) else {
            eprintln!(
                "warning: benchmark {} did not reach min. duration after {} repeats",
                bench.label, repeats
            );
            return (dt, repeats);
        };
        repeats = more;
    }
}

const KEY: &[u8; 32] = b"thisisjustabenchthisisjustabench";
const IV: &[u8; 16] = b"\0\0\0\0\0\0\0\0RandQuik";

fn bench_next_u32(backend_name: &str, backend: Backend) -> Benchmark {
    let backend = black_box(backend);
    let mut cha = ChaCha::with_backend(KEY, IV, Rounds::R20, backend);
    Benchmark {
        label: format!("next_u32/{backend_name}"),
        work: Box::new(move |n| {
            for _ in 0..n {
                black_box(cha.next_u32());
            }
        }),
    }
}

fn bench_next_u32_rand_chacha() -> Benchmark {
    let mut rng = rand_chacha::ChaCha20Rng::from_seed(*KEY);
    Benchmark {
        label: "next_u32/rand_chacha".to_string(),
        work: Box::new(move |n| {
            for _ in 0..n {
                black_box(rng.next_u32());
            }
        }),
    }
}

fn bench_bulk(backend_name: &str, backend: Backend, size: usize) -> Benchmark {
    let mut cha = ChaCha::with_backend(KEY, IV, Rounds::R20, backend);
    let mut dest = vec![0; size];
    Benchmark {
        label: format!("bulk{size}/{backend_name}"),
        work: Box::new(move |n| {
            for _ in 0..n {
                cha.fill_bytes(&mut dest);
                black_box(&mut dest);
            }
        }),
    }
}

fn bench_bulk_rand_chacha(size: usize) -> Benchmark {
    let mut rng = rand_chacha::ChaCha20Rng::from_seed(*KEY);
    let mut dest = vec![0; size];
    Benchmark {
        label: format!("bulk{size}/rand_chacha"),
        work: Box::new(move |n| {
            for _ in 0..n {
                rng.fill_bytes(&mut dest);
                black_box(&mut dest);
            }
        }),
    }
}
