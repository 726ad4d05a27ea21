use hf_trace::dict::{machine_info_payload, symbol_payload, MachineInfo};
use hf_trace::records::{dict, queue, sm, timer};
use hf_trace::{MemoryBackend, PayloadBuilder, TraceConfig, Tracer};

use crate::{Entry, FrameInterpreter, HdlcDecoder, Record, RecordGroup};

/// Emits records through a real tracer and interprets what comes out.
struct Loopback {
    backend: MemoryBackend,
    tracer: Tracer<MemoryBackend>,
    decoder: HdlcDecoder,
    interpreter: FrameInterpreter,
}

impl Loopback {
    fn new(include_timestamp: bool) -> Self {
        let backend = MemoryBackend::new();
        let config = TraceConfig {
            include_timestamp,
            ..TraceConfig::default()
        };
        Self {
            tracer: Tracer::new(config, backend.clone()),
            backend,
            decoder: HdlcDecoder::new(),
            interpreter: FrameInterpreter::new(include_timestamp),
        }
    }

    fn emit(&mut self, record_type: u8, payload: &[u8], timed: bool) -> Record {
        self.backend.clear();
        self.tracer.record(record_type, payload, timed).unwrap();
        let frames = self.decoder.push_bytes(&self.backend.bytes());
        let frame = frames.into_iter().next().unwrap().unwrap();
        self.interpreter.interpret(&frame)
    }

    fn announce(&mut self) {
        let info = MachineInfo {
            name: "hfp".into(),
            high_capacity: 8,
            low_capacity: 32,
        };
        self.emit(dict::MACHINE_INFO, &machine_info_payload(&info), false);
        self.emit(dict::STATE, &symbol_payload(2, "Connecting"), false);
        self.emit(dict::STATE, &symbol_payload(3, "Connected"), false);
        self.emit(dict::EVENT, &symbol_payload(3, "Connected"), false);
        self.emit(dict::TIMER, &symbol_payload(1, "negotiation"), false);
    }
}

fn payload(build: impl FnOnce(&mut PayloadBuilder)) -> Vec<u8> {
    let mut builder = PayloadBuilder::new();
    build(&mut builder);
    builder.into_vec()
}

#[test]
fn dictionaries_name_later_records() {
    let mut lb = Loopback::new(true);
    lb.announce();
    assert_eq!(lb.interpreter.machine_name(), Some("hfp"));

    let record = lb.emit(sm::TRAN, &payload(|p| { p.u16(3).u16(2).u16(3); }), true);
    assert!(record.timestamp_us.is_some());
    assert_eq!(
        record.entry,
        Entry::Transition {
            event: "Connected".into(),
            from: "Connecting".into(),
            to: "Connected".into(),
        }
    );
    assert_eq!(record.entry.group(), RecordGroup::StateMachine);
}

#[test]
fn unknown_ids_fall_back_to_numbers() {
    let mut lb = Loopback::new(true);
    let record = lb.emit(sm::UNHANDLED, &payload(|p| { p.u16(7).u16(12); }), true);
    assert_eq!(
        record.entry,
        Entry::Unhandled {
            state: "State(7)".into(),
            event: "Event(12)".into(),
        }
    );
    assert!(record.entry.is_problem());
}

#[test]
fn queue_and_timer_records() {
    let mut lb = Loopback::new(true);
    lb.announce();

    let post = lb.emit(queue::POST, &payload(|p| { p.u16(3).u8(1).u16(2); }), true);
    assert_eq!(
        post.entry,
        Entry::Post {
            event: "Connected".into(),
            priority: "high".into(),
            depth: 2,
        }
    );

    let arm = lb.emit(timer::ARM, &payload(|p| { p.u16(1).u32(1000).u32(0); }), true);
    assert_eq!(
        arm.entry,
        Entry::TimerArm {
            timer: "negotiation".into(),
            ticks: 1000,
            interval: 0,
        }
    );

    let fire = lb.emit(timer::FIRE, &payload(|p| { p.u16(1).u8(0); }), true);
    assert_eq!(
        fire.entry,
        Entry::TimerFire {
            timer: "negotiation".into(),
            periodic: false,
        }
    );
}

#[test]
fn untimed_producer() {
    let mut lb = Loopback::new(false);
    lb.announce();
    let record = lb.emit(sm::DISPATCH, &payload(|p| { p.u16(2).u16(3); }), true);
    assert_eq!(record.timestamp_us, None);
    assert_eq!(
        record.entry,
        Entry::Dispatch {
            state: "Connecting".into(),
            event: "Connected".into(),
        }
    );
}

#[test]
fn truncated_and_unknown_records_are_raw() {
    let mut lb = Loopback::new(false);
    let truncated = lb.emit(sm::TRAN, &[0x01, 0x00], true);
    assert_eq!(
        truncated.entry,
        Entry::Raw {
            record_type: sm::TRAN,
            data: "0100".into(),
        }
    );

    let unknown = lb.emit(0x99, &[0xAB], true);
    assert_eq!(unknown.entry.group(), RecordGroup::Unknown);
}
