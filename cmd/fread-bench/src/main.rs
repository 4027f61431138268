//! File reader throughput
//!
//! Two runs, each with the read-ahead buffer equal to the chunk size:
//!
//! - RUN A: 4 MiB chunks
//! - RUN B: 16 MiB chunks
//!
//! Usage:
//!     ./target/release/fread-bench <file_a> <file_b>

use std::time::Instant;

use dstream::{FileConfig, FileReader, StreamResult, StreamSource};

const MIB: usize = 1024 * 1024;

struct BenchResult {
    bytes: u64,
    secs: f64,
}

fn bench_one(path: &str, chunk_size: usize, read_ahead: usize) -> StreamResult<BenchResult> {
    let config = FileConfig::new(path, chunk_size).read_ahead(read_ahead);
    let mut reader = FileReader::with_config(&config)?;
    let mut buf = reader.chunk_buffer();

    let mut bytes: u64 = 0;
    let start = Instant::now();
    loop {
        let n = reader.read_into(&mut buf)?;
        bytes += n as u64;
        if n < chunk_size {
            break;
        }
    }

    Ok(BenchResult {
        bytes,
        secs: start.elapsed().as_secs_f64(),
    })
}

fn report(label: &str, path: &str, chunk_size: usize, read_ahead: usize) {
    match bench_one(path, chunk_size, read_ahead) {
        Ok(r) => {
            let mib = r.bytes as f64 / MIB as f64;
            println!("{}", label);
            println!("  file: {}", path);
            println!("  bytes_read: {}", r.bytes);
            println!("  chunk_sz: {}", chunk_size);
            println!("  read_ahead: {}", read_ahead);
            println!("  time_s: {:.6}", r.secs);
            println!("  throughput_MiB_s: {:.1}\n", mib / r.secs);
        }
        Err(e) => {
            eprintln!("{}: {}", label, e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <file_a> <file_b>", args[0]);
        std::process::exit(2);
    }

    println!("=== dstream File Reader Benchmark ===\n");
    report("RUN A chunk mb 4", &args[1], 4 * MIB, 4 * MIB);
    report("RUN B chunk mb 16", &args[2], 16 * MIB, 16 * MIB);
}
