use std::io;
use std::net::UdpSocket;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use hfspy::{FrameInterpreter, HdlcDecoder, RecordFormatter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Viewer for hands-free session trace records")]
struct Opts {
    #[arg(long = "udp", default_value = "0.0.0.0:7702", value_name = "ADDR")]
    udp_addr: String,

    /// Print one JSON object per record.
    #[arg(long)]
    json: bool,

    /// Do not prefix lines with the local receive time.
    #[arg(long = "no-timestamps")]
    no_timestamps: bool,

    /// The producer was configured without record timestamps.
    #[arg(long)]
    untimed: bool,

    /// Only show these groups: sm, queue, timer, dict.
    #[arg(long, value_delimiter = ',')]
    filter: Vec<String>,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let mut formatter = RecordFormatter::new(!opts.no_timestamps, opts.json);
    if !opts.filter.is_empty() {
        let unknown = formatter.set_filters(&opts.filter);
        if !unknown.is_empty() {
            bail!("unknown filter group(s): {}", unknown.join(", "));
        }
    }

    let socket = UdpSocket::bind(&opts.udp_addr)
        .with_context(|| format!("binding udp://{}", opts.udp_addr))?;
    eprintln!("hfspy listening on udp://{}", opts.udp_addr);

    let mut decoder = HdlcDecoder::new();
    let mut interpreter = FrameInterpreter::new(!opts.untimed);
    let mut buf = [0u8; 4096];
    let mut last_peer = None;
    let mut gaps = 0;

    loop {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("receiving trace datagram"),
        };
        if last_peer != Some(peer) {
            eprintln!("telemetry from {peer}");
            last_peer = Some(peer);
        }

        for frame in decoder.push_bytes(&buf[..len]) {
            match frame {
                Ok(frame) => {
                    let record = interpreter.interpret(&frame);
                    if let Some(line) = formatter.format(&record, Local::now()) {
                        println!("{line}");
                    }
                }
                Err(err) => eprintln!("decoder error: {err}"),
            }
        }
        if decoder.gaps() != gaps {
            gaps = decoder.gaps();
            eprintln!("sequence gap detected ({gaps} so far)");
        }
    }
}
