//! Hands-free session against a simulated phone.
//!
//! Runs a complete session on the real runtime: pairing lookup, service
//! level negotiation, an outgoing call with DTMF, an incoming call answered
//! on the PC, then a user disconnect. Pass `--trace 127.0.0.1:7702` and run
//! `hfspy` alongside to watch the state machine live.

mod phone;

use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use handsfree::{
    BdAddr, Collaborators, HandsFreeConfig, HandsFreeRuntime, HfpConfig, HfpState, Notification,
};
use hf_trace::{TraceConfig, Tracer, UdpBackend};

use phone::{Phone, SpeakerVoice, Wire};

#[derive(Parser, Debug)]
#[command(name = "handsfree-sim", about = "Hands-free session against a simulated phone")]
struct Args {
    /// Address of the simulated phone
    #[arg(long, default_value = "00:1A:7D:DA:71:13")]
    phone: BdAddr,

    /// Name the phone is paired under
    #[arg(long, default_value = "Pixel")]
    name: String,

    /// Phone response latency in milliseconds
    #[arg(long, default_value_t = 50)]
    latency_ms: u64,

    /// Leave call audio on the phone
    #[arg(long)]
    headset_off: bool,

    /// Stream trace frames to this UDP address
    #[arg(long)]
    trace: Option<String>,
}

const STEP: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let trace = match &args.trace {
        Some(addr) => {
            let backend = UdpBackend::connect(addr.as_str())
                .with_context(|| format!("opening trace socket to {addr}"))?;
            info!("tracing to {addr}");
            Some(Tracer::new(TraceConfig::default(), backend).into_handle().hook())
        }
        None => None,
    };

    let config = HandsFreeConfig::default().with_hfp(
        HfpConfig::builder()
            .connect_poll_interval(Duration::from_secs(10))
            .negotiation_timeout(Duration::from_secs(3))
            .pc_sound(!args.headset_off)
            .build(),
    );

    let phone = Phone::new(args.phone, args.name.clone(), Duration::from_millis(args.latency_ms));
    let user = phone.user();
    let (notes_tx, notes) = mpsc::channel();
    let host = move |note: &Notification| {
        info!("host <- {} [{}]", note.status, note.state);
        let _ = notes_tx.send(note.clone());
    };

    let runtime = HandsFreeRuntime::start_traced(
        config,
        Collaborators::new(phone.transport(), SpeakerVoice::default(), host),
        trace,
    )
    .context("starting the session")?;
    let gateway = phone
        .spawn(runtime.submitter())
        .context("starting the phone")?;

    let in_call = if args.headset_off {
        HfpState::InCallHeadsetOff
    } else {
        HfpState::InCallHeadsetOn
    };

    info!("selecting {}", args.phone);
    runtime.select_device(args.phone)?;
    await_state(&notes, HfpState::HfpConnected)?;

    info!("dialling 5550100");
    runtime.start_call("5550100")?;
    await_state(&notes, in_call)?;
    for digit in "42#".chars() {
        runtime.send_dtmf(digit)?;
    }
    runtime.end_call()?;
    await_state(&notes, HfpState::HfpConnected)?;

    info!("incoming call");
    user.send(Wire::Incoming {
        number: "5551234".into(),
        name: "Alice".into(),
    })
    .context("phone thread is gone")?;
    await_state(&notes, HfpState::Ringing)?;
    runtime.answer()?;
    await_state(&notes, in_call)?;
    user.send(Wire::RemoteHangUp).context("phone thread is gone")?;
    await_state(&notes, HfpState::HfpConnected)?;

    runtime.disconnect()?;
    await_state(&notes, HfpState::Disconnected)?;

    let engine = runtime.shutdown();
    let _ = user.send(Wire::Quit);
    if gateway.join().is_err() {
        bail!("phone thread panicked");
    }
    if let Some(engine) = engine {
        info!("session finished in {}", engine.state());
    }
    Ok(())
}

/// Waits for a notification reporting `state`.
fn await_state(notes: &Receiver<Notification>, state: HfpState) -> Result<()> {
    let deadline = Instant::now() + STEP;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match notes.recv_timeout(left) {
            Ok(note) if note.state == state => return Ok(()),
            Ok(_) => {}
            Err(_) => bail!("session never reached {state}"),
        }
    }
}
