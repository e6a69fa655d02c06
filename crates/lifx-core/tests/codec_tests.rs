//! Frame codec tests for LIFX core

use lifx_core::{
    codec, DecodingError, EncodingError, FirmwareInfo, Header, Hsbk, LightStatus, MacAddress,
    Message, MessageType, Waveform, WaveformOptions, HEADER_SIZE, POWER_ON,
};

fn bulb() -> MacAddress {
    MacAddress::parse("d0:73:d5:aa:bb:cc").expect("valid mac")
}

// ============================================================================
// Discovery frames
// ============================================================================

#[test]
fn test_discovery_broadcast_bytes() {
    let header = Header::broadcast(0x0000_2a2a).with_res_required(true);
    let frame = codec::encode(&header, &Message::GetService).expect("encode failed");

    let expected: [u8; 36] = [
        0x24, 0x00, // size 36
        0x00, 0x34, // protocol 1024, addressable, tagged
        0x2a, 0x2a, 0x00, 0x00, // source
        0, 0, 0, 0, 0, 0, 0, 0, // target
        0, 0, 0, 0, 0, 0, // site
        0x01, // res_required
        0x00, // sequence
        0, 0, 0, 0, 0, 0, 0, 0, // timestamp
        0x02, 0x00, // GetService
        0x00, 0x00,
    ];
    assert_eq!(&frame[..], &expected[..]);
}

#[test]
fn test_decode_state_service_reply() {
    let header = Header::to_device(bulb(), 77, 3);
    let frame = codec::encode(
        &header,
        &Message::StateService {
            service: 1,
            port: 56700,
        },
    )
    .expect("encode failed");

    assert_eq!(frame.len(), HEADER_SIZE + 5);
    let (decoded_header, message) = codec::decode(&frame).expect("decode failed");
    assert_eq!(decoded_header.target, bulb());
    assert_eq!(decoded_header.sequence, 3);
    assert_eq!(
        message,
        Message::StateService {
            service: 1,
            port: 56700
        }
    );
}

// ============================================================================
// Light control frames
// ============================================================================

#[test]
fn test_light_state_roundtrip() {
    let status = LightStatus {
        color: Hsbk::new(21845, 65535, 32768, 3500),
        power: POWER_ON,
        label: "Living Room".to_string(),
    };
    let header = Header::to_device(bulb(), 1, 200);
    let frame = codec::encode(&header, &Message::LightState(status.clone())).expect("encode failed");
    assert_eq!(frame.len(), HEADER_SIZE + 52);

    let (h, m) = codec::decode(&frame).expect("decode failed");
    assert_eq!(h, header);
    assert_eq!(m, Message::LightState(status));
}

#[test]
fn test_waveform_roundtrip() {
    let opts = WaveformOptions {
        transient: true,
        color: Hsbk::new(0, 65535, 65535, 3500),
        period: 800,
        cycles: 5.0,
        skew_ratio: 16384,
        waveform: Waveform::Sine,
    };
    let header = Header::to_device(bulb(), 1, 1).with_ack_required(true);
    let frame = codec::encode(&header, &Message::LightSetWaveform(opts)).expect("encode failed");
    assert_eq!(frame.len(), HEADER_SIZE + 21);

    let (h, m) = codec::decode(&frame).expect("decode failed");
    assert!(h.ack_required);
    assert!(!h.res_required);
    assert_eq!(m, Message::LightSetWaveform(opts));
}

#[test]
fn test_label_is_nul_padded() {
    let frame = codec::encode(
        &Header::default(),
        &Message::SetLabel {
            label: "Hall".to_string(),
        },
    )
    .expect("encode failed");

    let payload = &frame[HEADER_SIZE..];
    assert_eq!(payload.len(), 32);
    assert_eq!(&payload[..4], b"Hall");
    assert!(payload[4..].iter().all(|&b| b == 0));
}

#[test]
fn test_firmware_reserved_bytes_zero() {
    let fw = FirmwareInfo {
        build: 1,
        version: 0x0002_0050,
    };
    let frame = codec::encode(&Header::default(), &Message::StateHostFirmware(fw))
        .expect("encode failed");
    let payload = &frame[HEADER_SIZE..];
    assert_eq!(&payload[8..16], &[0u8; 8]);
    assert_eq!(&payload[16..20], &0x0002_0050u32.to_le_bytes());
}

// ============================================================================
// Error handling
// ============================================================================

#[test]
fn test_encode_error_writes_nothing() {
    let result = codec::encode(
        &Header::default(),
        &Message::StateLabel {
            label: "a label that is definitely longer than 32 bytes".to_string(),
        },
    );
    assert!(matches!(result, Err(EncodingError::LabelTooLong(_))));
}

#[test]
fn test_every_truncation_is_an_error() {
    let frame = codec::encode(
        &Header::to_device(bulb(), 5, 5),
        &Message::LightState(LightStatus::default()),
    )
    .expect("encode failed");

    for len in 0..frame.len() {
        let err = codec::decode(&frame[..len]).expect_err("truncated frame decoded");
        match err {
            DecodingError::BufferTooSmall { .. } => assert!(len < HEADER_SIZE),
            DecodingError::Truncated { declared, have } => {
                assert_eq!(declared, frame.len());
                assert_eq!(have, len);
            }
            other => panic!("unexpected error for len {}: {:?}", len, other),
        }
    }
}

#[test]
fn test_unknown_message_preserved() {
    let message = Message::Unknown {
        message_type: 701,
        payload: bytes::Bytes::from_static(b"future"),
    };
    let frame = codec::encode(&Header::default(), &message).expect("encode failed");
    let (_, decoded) = codec::decode(&frame).expect("decode failed");
    assert_eq!(decoded, message);
    assert_eq!(MessageType::from_u16(701), None);
}
