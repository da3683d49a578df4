use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use etherparse::{NetHeaders, PacketHeaders};

use rawlink::{Error, Socket, TimestampPrecision};

/// Command line options.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Network interface name.
    #[clap(short, long)]
    interface: String,

    /// Receive buffer length in bytes.
    #[clap(short, long, default_value_t = 65536)]
    buffer: usize,

    /// Enable promiscuous mode.
    #[clap(short, long)]
    promisc: bool,

    /// Request nanosecond timestamps.
    #[clap(short, long)]
    nanos: bool,

    /// Stop after this many frames.
    #[clap(short, long)]
    count: Option<u64>,

    /// Enable debug printing (parsed IP addresses).
    #[clap(short, long)]
    debug: bool,
}

/// Try to parse Ethernet/IP headers using etherparse and return a formatted string.
fn print_addrs(frame: &[u8]) -> Result<String> {
    let packet_header = PacketHeaders::from_ethernet_slice(frame)?;

    let ip_header = &packet_header
        .net
        .ok_or(anyhow::anyhow!("Error: IP header not found"))?;

    match ip_header {
        NetHeaders::Ipv4(hdr, _) => Ok(format!(
            "IP: {} > {}",
            Ipv4Addr::from(hdr.source),
            Ipv4Addr::from(hdr.destination)
        )),
        NetHeaders::Ipv6(hdr, _) => Ok(format!(
            "IP: {} > {}",
            Ipv6Addr::from(hdr.source),
            Ipv6Addr::from(hdr.destination)
        )),
        _ => bail!("Error: IP header not found"),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let term = Arc::new(AtomicBool::new(false));
    {
        let term = term.clone();
        ctrlc::set_handler(move || {
            term.store(true, Ordering::SeqCst);
        })
        .expect("Error setting Ctrl-C handler");
    }

    let mut socket = Socket::open(&args.interface, args.buffer)
        .with_context(|| format!("opening {}", args.interface))?;
    println!(
        "listening on {} (link type: {})",
        socket.device(),
        socket.link_type()
    );

    if args.promisc {
        match socket.set_promiscuous(true) {
            Ok(()) => println!("* promiscuous mode: ON"),
            Err(Error::NotSupported) => eprintln!("* promiscuous mode not supported here"),
            Err(e) => return Err(e).context("enabling promiscuous mode"),
        }
    }
    if args.nanos {
        match socket.set_timestamp_precision(TimestampPrecision::Nano) {
            Ok(()) => println!("* timestamps: nanosecond"),
            Err(Error::NotSupported) => eprintln!("* nanosecond timestamps not supported here"),
            Err(e) => return Err(e).context("setting timestamp precision"),
        }
    }

    let mut buf = vec![0u8; args.buffer.max(2048)];
    let mut seen = 0u64;
    while !term.load(Ordering::SeqCst) {
        match socket.recv(&mut buf) {
            Ok((len, ts)) => {
                seen += 1;
                if args.debug {
                    if let Ok(info) = print_addrs(&buf[..len]) {
                        println!("{}.{:09} {} ({} bytes)", ts.secs, ts.nanos, info, len);
                    }
                }
                if args.count.is_some_and(|count| seen >= count) {
                    break;
                }
            }
            Err(Error::Interrupted) | Err(Error::NoPacket) => continue,
            Err(e) => return Err(e).context("receive failed"),
        }
    }

    let stats = socket.stats();
    println!(
        "{} packets captured, {} bytes, {} dropped by kernel",
        stats.rx_packets, stats.rx_bytes, stats.rx_dropped
    );
    Ok(())
}
