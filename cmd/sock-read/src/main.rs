//! Socket reader monitor
//!
//! Reads from a UDP or raw capture reader until Ctrl+C or a fixed
//! duration, printing one line per packet or timeout and a summary at exit.
//!
//! Usage:
//!     sock-read [--addr dev:ip:port] [--sz <pkt_sz_max>] [--dur-sec <sec>] [--raw]
//!
//!     # until Ctrl+C
//!     sock-read --addr enp3s0:192.168.250.196:9999 --sz 7184
//!     # fixed duration
//!     sock-read --addr lo:127.0.0.1:9999 --dur-sec 1.45
//!     # raw capture (needs CAP_NET_RAW)
//!     sudo sock-read --addr enp3s0:192.168.250.196:9999 --sz 7184 --raw
//!
//! Send traffic with:
//!     echo -n hello | nc -u -q0 127.0.0.1 9999

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dstream::config::defaults;
use dstream::{open_socket_reader, parse_addr, SocketConfig, SocketMode, StreamError};

static RUNNING: AtomicBool = AtomicBool::new(true);

#[cfg(unix)]
extern "C" fn handle_sigint(_: std::os::raw::c_int) {
    RUNNING.store(false, Ordering::Relaxed);
}

/// Install the Ctrl+C handler without SA_RESTART so a blocked receive
/// returns early and the loop can observe `RUNNING`.
#[cfg(unix)]
fn install_sigint() {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    let action = SigAction::new(SigHandler::Handler(handle_sigint), SaFlags::empty(), SigSet::empty());
    if let Err(e) = unsafe { sigaction(Signal::SIGINT, &action) } {
        eprintln!("warning: failed to install SIGINT handler: {}", e);
    }
}

#[cfg(not(unix))]
fn install_sigint() {}

/// `S.mmms`
struct Secs(Duration);

impl fmt::Display for Secs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}s", self.0.as_secs(), self.0.subsec_millis())
    }
}

struct Options {
    config: SocketConfig,
    duration: Option<Duration>,
}

fn usage(prog: &str) {
    eprintln!(
        "Usage: {prog} [--addr dev:ip:port] [--sz <pkt_sz_max>] [--dur-sec <sec>] [--raw]\n   \
         1) until Ctrl+C: {prog} --addr enp3s0:192.168.250.196:9999 --sz 7184\n   \
         2) Fixed dur: {prog} --addr lo:127.0.0.1:9999 --dur-sec 1.45\n   \
         3) Raw socket: {prog} --addr enp3s0:192.168.250.196:9999 --sz 7184 --raw\n",
    );
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut config = SocketConfig::from_env()
        .device(defaults::DEVICE)
        .address(defaults::ADDRESS)
        .port(defaults::PORT)
        .chunk_size(defaults::SOCKET_CHUNK_SIZE);
    let mut duration = None;

    let mut it = args.iter().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--addr" => {
                let v = it.next().ok_or("--addr requires argument")?;
                let (dev, ip, port) =
                    parse_addr(v).map_err(|e| format!("Invalid addr: {} ({})", v, e))?;
                config = config.device(dev).address(ip).port(port);
            }
            "--sz" => {
                let v = it.next().ok_or("--sz requires argument")?;
                match v.parse::<usize>() {
                    Ok(n) if n > 0 => config = config.chunk_size(n),
                    _ => return Err(format!("Invalid size: {}", v)),
                }
            }
            "--dur-sec" => {
                let v = it.next().ok_or("--dur-sec requires argument")?;
                match v.parse::<f64>() {
                    Ok(s) if s > 0.0 && s.is_finite() => duration = Some(Duration::from_secs_f64(s)),
                    _ => return Err(format!("Invalid duration: {}", v)),
                }
            }
            "--raw" => config = config.mode(SocketMode::Raw),
            other => return Err(format!("Unknown option: {}", other)),
        }
    }

    Ok(Options { config, duration })
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("sock-read");

    let opts = match parse_args(&args) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            usage(prog);
            std::process::exit(1);
        }
    };
    let config = &opts.config;

    install_sigint();

    let mut reader = match open_socket_reader(config) {
        Ok(r) => r,
        Err(e @ StreamError::Resource { .. }) => {
            eprintln!("Socket error: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    print!(
        "Starting reader: {} [{}:{}] chunk_size={} timeout={}ms",
        reader.type_tag(),
        config.address,
        config.port,
        config.chunk_size,
        config.timeout_ms
    );
    if config.mode == SocketMode::Raw {
        print!(" dev={}", config.device);
    }
    match opts.duration {
        Some(d) => println!(" duration={}s\n", d.as_secs_f64()),
        None => println!(" (until Ctrl+C)\n"),
    }

    let mut buf = reader.chunk_buffer();
    let mut total_bytes: u64 = 0;
    let mut packets: u64 = 0;
    let mut timeouts: u64 = 0;
    let start = Instant::now();
    let mut last_packet = start;

    while RUNNING.load(Ordering::Relaxed) {
        if let Some(limit) = opts.duration {
            let elapsed = start.elapsed();
            if elapsed >= limit {
                println!("\nDuration limit reached ({})", Secs(elapsed));
                break;
            }
        }

        match reader.read_into(&mut buf) {
            // Interrupted; RUNNING decides whether to go on
            Ok(0) => continue,
            Ok(n) => {
                let now = Instant::now();
                let gap = now - last_packet;
                last_packet = now;
                total_bytes += n as u64;
                packets += 1;
                println!(
                    "[{}] Packet #{}: {} bytes (gap: {})",
                    Secs(now - start),
                    packets,
                    n,
                    Secs(gap)
                );
            }
            Err(e) if e.is_recoverable() => {
                let now = Instant::now();
                timeouts += 1;
                println!(
                    "[{}] TIMEOUT #{} - no traffic for {}",
                    Secs(now - start),
                    timeouts,
                    Secs(now - last_packet)
                );
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    let total = start.elapsed();
    println!("\n=== Session Summary ===");
    println!("Total duration: {}", Secs(total));
    println!("Packets received: {}", packets);
    println!("Total bytes: {}", total_bytes);
    println!("Timeouts: {}", timeouts);
    if packets > 0 {
        println!("Average packet size: {:.1} bytes", total_bytes as f64 / packets as f64);
        let secs = total.as_millis() as f64 / 1000.0;
        if secs > 0.0 {
            println!("Throughput: {:.2} Mbps", total_bytes as f64 * 8.0 / (secs * 1e6));
        }
    }

    drop(reader);
    if !RUNNING.load(Ordering::Relaxed) {
        println!("\nShutdown requested (Ctrl+C)");
    }
}
