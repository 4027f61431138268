//! File reader smoke tool
//!
//! Drains a file chunk by chunk and reports what the reader saw.
//!
//! Usage:
//!     cargo build --release -p dstream-file-read
//!     ./target/release/file-read [path] [chunk_size]
//!
//! Defaults: ./test_data.bin, 4 MiB chunks. `DSTREAM_READ_AHEAD` overrides
//! the read-ahead buffer size.

use dstream::{FileConfig, FileReader, StreamSource};

const DEFAULT_PATH: &str = "./test_data.bin";
const DEFAULT_CHUNK: usize = 4 * 1024 * 1024;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_PATH);
    let chunk_size: usize = match args.get(2) {
        Some(s) => match s.parse() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("Invalid chunk size {}", s);
                std::process::exit(1);
            }
        },
        None => DEFAULT_CHUNK,
    };

    let mut reader = match FileReader::with_config(&FileConfig::from_env(path, chunk_size)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("File: {}", reader.path().display());
    println!("Size: {} bytes", reader.size());
    println!("Chunks: {}", reader.chunk_count());
    println!("Chunk size: {}", reader.chunk_size());

    let mut buf = reader.chunk_buffer();
    let mut total: u64 = 0;
    loop {
        match reader.read_into(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n as u64;
                println!("Read chunk: {} bytes", n);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    println!("Total read: {} bytes", total);
}
