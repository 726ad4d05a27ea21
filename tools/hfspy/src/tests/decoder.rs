use hf_trace::{MemoryBackend, TraceConfig, Tracer};

use crate::{DecodeError, Frame, HdlcDecoder};

#[test]
fn decoder_roundtrip() {
    let backend = MemoryBackend::new();
    let mut tracer = Tracer::new(TraceConfig::default(), backend.clone());
    tracer.record(0x42, &[0xDE, 0x7E, 0x7D, 0xEF], true).unwrap();

    let mut decoder = HdlcDecoder::new();
    let decoded = decoder.push_bytes(&backend.bytes());

    assert_eq!(decoded.len(), 1);
    let Frame {
        seq,
        record_type,
        payload,
    } = decoded[0].clone().unwrap();
    assert_eq!(seq, 1);
    assert_eq!(record_type, 0x42);
    // 4-byte timestamp, then the data with flag and escape restored
    assert_eq!(payload.len(), 8);
    assert_eq!(&payload[4..], &[0xDE, 0x7E, 0x7D, 0xEF]);
}

#[test]
fn frames_split_across_chunks() {
    let backend = MemoryBackend::new();
    let mut tracer = Tracer::new(TraceConfig::default(), backend.clone());
    tracer.record(1, &[1, 2, 3], false).unwrap();
    tracer.record(2, &[4, 5], false).unwrap();
    let bytes = backend.bytes();

    let mut decoder = HdlcDecoder::new();
    let (head, tail) = bytes.split_at(4);
    assert!(decoder.push_bytes(head).is_empty());
    let frames: Vec<Frame> = decoder
        .push_bytes(tail)
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].payload, vec![4, 5]);
    assert_eq!(decoder.gaps(), 0);
}

#[test]
fn bad_checksum_does_not_hide_later_frames() {
    let backend = MemoryBackend::new();
    let mut tracer = Tracer::new(TraceConfig::default(), backend.clone());
    tracer.record(9, &[], false).unwrap();

    let mut bytes = vec![0x01, 0x10, 0x00, 0x7E];
    bytes.extend(backend.bytes());

    let mut decoder = HdlcDecoder::new();
    let results = decoder.push_bytes(&bytes);
    assert!(matches!(results[0], Err(DecodeError::InvalidChecksum { .. })));
    assert_eq!(results[1].as_ref().unwrap().record_type, 9);
}

#[test]
fn short_frame_is_rejected() {
    let mut decoder = HdlcDecoder::new();
    let results = decoder.push_bytes(&[0x01, 0x7E]);
    assert_eq!(results, vec![Err(DecodeError::FrameTooShort(1))]);
}

#[test]
fn counts_sequence_gaps() {
    let backend = MemoryBackend::new();
    let mut tracer = Tracer::new(TraceConfig::default(), backend.clone());
    for record in 0..3 {
        tracer.record(record, &[], false).unwrap();
    }
    let frames = backend.frames();

    let mut decoder = HdlcDecoder::new();
    decoder.push_bytes(&frames[0]);
    decoder.push_bytes(&frames[2]);
    assert_eq!(decoder.gaps(), 1);
}
