//! LIFX binary codec
//!
//! Frames are a 36-byte [`Header`] followed by a fixed-layout payload whose
//! shape depends on the message type. All integers are little-endian and
//! reserved payload fields are written as zeros.
//!
//! Encoding validates every caller-supplied field first, so an invalid
//! message never produces a partial frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::message::{Message, MessageType};
use crate::types::*;
use crate::{DecodingError, EncodingError, Header, HEADER_SIZE};

/// Largest frame the 16-bit size field can describe
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Encode a header and message into one frame
pub fn encode(header: &Header, message: &Message) -> Result<Bytes, EncodingError> {
    header.validate()?;
    validate_message(message)?;

    let mut payload = BytesMut::with_capacity(payload_capacity(message));
    encode_payload(&mut payload, message);

    let total = HEADER_SIZE + payload.len();
    if total > MAX_FRAME_SIZE {
        return Err(EncodingError::FrameTooLarge(total));
    }

    let mut buf = BytesMut::with_capacity(total);
    header.write(&mut buf, total as u16, message.message_type());
    buf.extend_from_slice(&payload);
    Ok(buf.freeze())
}

/// Decode one frame.
///
/// Bytes past the size declared in the header are ignored.
pub fn decode(bytes: &[u8]) -> Result<(Header, Message), DecodingError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DecodingError::BufferTooSmall {
            needed: HEADER_SIZE,
            have: bytes.len(),
        });
    }

    let declared = u16::from_le_bytes([bytes[0], bytes[1]]);
    if (declared as usize) < HEADER_SIZE {
        return Err(DecodingError::InvalidSize(declared));
    }
    if bytes.len() < declared as usize {
        return Err(DecodingError::Truncated {
            declared: declared as usize,
            have: bytes.len(),
        });
    }

    let mut buf = &bytes[..declared as usize];
    let (header, _, message_type) = Header::read(&mut buf);
    let message = decode_payload(message_type, buf)?;
    Ok((header, message))
}

/// Peek at the message type without decoding the payload
pub fn peek_message_type(bytes: &[u8]) -> Option<u16> {
    if bytes.len() < HEADER_SIZE {
        return None;
    }
    Some(u16::from_le_bytes([bytes[32], bytes[33]]))
}

// ============================================================================
// VALIDATION
// ============================================================================

fn validate_message(message: &Message) -> Result<(), EncodingError> {
    match message {
        Message::SetLabel { label } | Message::StateLabel { label } => validate_label(label),
        Message::StateLocation(m) | Message::StateGroup(m) => validate_label(&m.label),
        Message::LightState(status) => validate_label(&status.label),
        Message::LightSetColor { color, .. } => validate_kelvin(color),
        Message::LightSetWaveform(opts) => validate_waveform(opts),
        Message::LightSetWaveformOptional(opts) => validate_waveform(&opts.waveform),
        Message::MultiZoneSetColorZones(zones) => validate_kelvin(&zones.color),
        _ => Ok(()),
    }
}

fn validate_label(label: &str) -> Result<(), EncodingError> {
    if label.len() > LABEL_SIZE {
        return Err(EncodingError::LabelTooLong(label.len()));
    }
    if let Some(at) = label.bytes().position(|b| b == 0) {
        return Err(EncodingError::LabelContainsNul(at));
    }
    Ok(())
}

fn validate_kelvin(color: &Hsbk) -> Result<(), EncodingError> {
    if !(KELVIN_MIN..=KELVIN_MAX).contains(&color.kelvin) {
        return Err(EncodingError::KelvinOutOfRange(color.kelvin));
    }
    Ok(())
}

fn validate_waveform(opts: &WaveformOptions) -> Result<(), EncodingError> {
    validate_kelvin(&opts.color)?;
    if !opts.cycles.is_finite() || opts.cycles < 0.0 {
        return Err(EncodingError::InvalidCycles(opts.cycles));
    }
    Ok(())
}

// ============================================================================
// ENCODING
// ============================================================================

fn payload_capacity(message: &Message) -> usize {
    match message {
        Message::Unknown { payload, .. } => payload.len(),
        other => other.kind().map(MessageType::payload_size).unwrap_or(0),
    }
}

fn encode_payload(buf: &mut BytesMut, message: &Message) {
    match message {
        Message::GetService
        | Message::GetHostInfo
        | Message::GetHostFirmware
        | Message::GetWifiInfo
        | Message::GetWifiFirmware
        | Message::GetPower
        | Message::GetLabel
        | Message::GetVersion
        | Message::GetInfo
        | Message::SetReboot
        | Message::Acknowledgement
        | Message::GetLocation
        | Message::GetGroup
        | Message::LightGet
        | Message::LightGetPower
        | Message::LightGetInfrared => {}

        Message::StateService { service, port } => {
            buf.put_u8(*service);
            buf.put_u32_le(*port);
        }
        Message::StateHostInfo(info) | Message::StateWifiInfo(info) => {
            buf.put_f32_le(info.signal);
            buf.put_u32_le(info.tx);
            buf.put_u32_le(info.rx);
            buf.put_i16_le(0);
        }
        Message::StateHostFirmware(fw) | Message::StateWifiFirmware(fw) => {
            buf.put_u64_le(fw.build);
            buf.put_u64_le(0);
            buf.put_u32_le(fw.version);
        }
        Message::SetPower { level } | Message::StatePower { level } => {
            buf.put_u16_le(*level);
        }
        Message::SetLabel { label } | Message::StateLabel { label } => {
            put_label(buf, label);
        }
        Message::StateVersion {
            vendor,
            product,
            version,
        } => {
            buf.put_u32_le(*vendor);
            buf.put_u32_le(*product);
            buf.put_u32_le(*version);
        }
        Message::StateInfo {
            time,
            uptime,
            downtime,
        } => {
            buf.put_u64_le(*time);
            buf.put_u64_le(*uptime);
            buf.put_u64_le(*downtime);
        }
        Message::StateLocation(m) | Message::StateGroup(m) => {
            buf.put_slice(&m.id);
            put_label(buf, &m.label);
            buf.put_u64_le(m.updated_at);
        }
        Message::EchoRequest { payload } | Message::EchoResponse { payload } => {
            buf.put_slice(payload);
        }
        Message::LightSetColor { color, duration } => {
            buf.put_u8(0);
            put_hsbk(buf, color);
            buf.put_u32_le(*duration);
        }
        Message::LightSetWaveform(opts) => {
            put_waveform(buf, opts);
        }
        Message::LightSetWaveformOptional(opts) => {
            put_waveform(buf, &opts.waveform);
            buf.put_u8(opts.set_hue as u8);
            buf.put_u8(opts.set_saturation as u8);
            buf.put_u8(opts.set_brightness as u8);
            buf.put_u8(opts.set_kelvin as u8);
        }
        Message::LightState(status) => {
            put_hsbk(buf, &status.color);
            buf.put_i16_le(0);
            buf.put_u16_le(status.power);
            put_label(buf, &status.label);
            buf.put_u64_le(0);
        }
        Message::LightSetPower { level, duration } => {
            buf.put_u16_le(*level);
            buf.put_u32_le(*duration);
        }
        Message::LightStatePower { level } => {
            buf.put_u16_le(*level);
        }
        Message::LightStateInfrared { brightness } | Message::LightSetInfrared { brightness } => {
            buf.put_u16_le(*brightness);
        }
        Message::MultiZoneSetColorZones(zones) => {
            buf.put_u8(zones.start_index);
            buf.put_u8(zones.end_index);
            put_hsbk(buf, &zones.color);
            buf.put_u32_le(zones.duration);
            buf.put_u8(zones.apply as u8);
        }
        Message::MultiZoneGetColorZones {
            start_index,
            end_index,
        } => {
            buf.put_u8(*start_index);
            buf.put_u8(*end_index);
        }
        Message::MultiZoneStateZone(zone) => {
            buf.put_u8(zone.count);
            buf.put_u8(zone.index);
            put_hsbk(buf, &zone.color);
        }
        Message::MultiZoneStateMultiZone(block) => {
            buf.put_u8(block.count);
            buf.put_u8(block.index);
            for color in &block.colors {
                put_hsbk(buf, color);
            }
        }
        Message::Unknown { payload, .. } => {
            buf.put_slice(payload);
        }
    }
}

fn put_hsbk(buf: &mut BytesMut, color: &Hsbk) {
    buf.put_u16_le(color.hue);
    buf.put_u16_le(color.saturation);
    buf.put_u16_le(color.brightness);
    buf.put_u16_le(color.kelvin);
}

fn put_label(buf: &mut BytesMut, label: &str) {
    let bytes = label.as_bytes();
    buf.put_slice(bytes);
    buf.put_bytes(0, LABEL_SIZE - bytes.len());
}

fn put_waveform(buf: &mut BytesMut, opts: &WaveformOptions) {
    buf.put_u8(0);
    buf.put_u8(opts.transient as u8);
    put_hsbk(buf, &opts.color);
    buf.put_u32_le(opts.period);
    buf.put_f32_le(opts.cycles);
    buf.put_i16_le(opts.skew_ratio);
    buf.put_u8(opts.waveform as u8);
}

// ============================================================================
// DECODING
// ============================================================================

fn decode_payload(message_type: u16, mut buf: &[u8]) -> Result<Message, DecodingError> {
    let kind = match MessageType::from_u16(message_type) {
        Some(kind) => kind,
        None => {
            return Ok(Message::Unknown {
                message_type,
                payload: Bytes::copy_from_slice(buf),
            })
        }
    };

    let needed = kind.payload_size();
    if buf.len() < needed {
        return Err(DecodingError::PayloadTooShort {
            name: kind.name(),
            needed,
            have: buf.len(),
        });
    }

    let buf = &mut buf;
    let message = match kind {
        MessageType::GetService => Message::GetService,
        MessageType::StateService => Message::StateService {
            service: buf.get_u8(),
            port: buf.get_u32_le(),
        },
        MessageType::GetHostInfo => Message::GetHostInfo,
        MessageType::StateHostInfo => Message::StateHostInfo(get_signal(buf)),
        MessageType::GetHostFirmware => Message::GetHostFirmware,
        MessageType::StateHostFirmware => Message::StateHostFirmware(get_firmware(buf)),
        MessageType::GetWifiInfo => Message::GetWifiInfo,
        MessageType::StateWifiInfo => Message::StateWifiInfo(get_signal(buf)),
        MessageType::GetWifiFirmware => Message::GetWifiFirmware,
        MessageType::StateWifiFirmware => Message::StateWifiFirmware(get_firmware(buf)),
        MessageType::GetPower => Message::GetPower,
        MessageType::SetPower => Message::SetPower {
            level: buf.get_u16_le(),
        },
        MessageType::StatePower => Message::StatePower {
            level: buf.get_u16_le(),
        },
        MessageType::GetLabel => Message::GetLabel,
        MessageType::SetLabel => Message::SetLabel {
            label: get_label(buf),
        },
        MessageType::StateLabel => Message::StateLabel {
            label: get_label(buf),
        },
        MessageType::GetVersion => Message::GetVersion,
        MessageType::StateVersion => Message::StateVersion {
            vendor: buf.get_u32_le(),
            product: buf.get_u32_le(),
            version: buf.get_u32_le(),
        },
        MessageType::GetInfo => Message::GetInfo,
        MessageType::StateInfo => Message::StateInfo {
            time: buf.get_u64_le(),
            uptime: buf.get_u64_le(),
            downtime: buf.get_u64_le(),
        },
        MessageType::SetReboot => Message::SetReboot,
        MessageType::Acknowledgement => Message::Acknowledgement,
        MessageType::GetLocation => Message::GetLocation,
        MessageType::StateLocation => Message::StateLocation(get_membership(buf)),
        MessageType::GetGroup => Message::GetGroup,
        MessageType::StateGroup => Message::StateGroup(get_membership(buf)),
        MessageType::EchoRequest => Message::EchoRequest {
            payload: get_echo(buf),
        },
        MessageType::EchoResponse => Message::EchoResponse {
            payload: get_echo(buf),
        },
        MessageType::LightGet => Message::LightGet,
        MessageType::LightSetColor => {
            buf.advance(1);
            Message::LightSetColor {
                color: get_hsbk(buf),
                duration: buf.get_u32_le(),
            }
        }
        MessageType::LightSetWaveform => Message::LightSetWaveform(get_waveform(buf)?),
        MessageType::LightSetWaveformOptional => {
            let waveform = get_waveform(buf)?;
            Message::LightSetWaveformOptional(WaveformOptionalOptions {
                waveform,
                set_hue: buf.get_u8() != 0,
                set_saturation: buf.get_u8() != 0,
                set_brightness: buf.get_u8() != 0,
                set_kelvin: buf.get_u8() != 0,
            })
        }
        MessageType::LightState => {
            let color = get_hsbk(buf);
            buf.advance(2);
            let power = buf.get_u16_le();
            let label = get_label(buf);
            buf.advance(8);
            Message::LightState(LightStatus {
                color,
                power,
                label,
            })
        }
        MessageType::LightGetPower => Message::LightGetPower,
        MessageType::LightSetPower => Message::LightSetPower {
            level: buf.get_u16_le(),
            duration: buf.get_u32_le(),
        },
        MessageType::LightStatePower => Message::LightStatePower {
            level: buf.get_u16_le(),
        },
        MessageType::LightGetInfrared => Message::LightGetInfrared,
        MessageType::LightStateInfrared => Message::LightStateInfrared {
            brightness: buf.get_u16_le(),
        },
        MessageType::LightSetInfrared => Message::LightSetInfrared {
            brightness: buf.get_u16_le(),
        },
        MessageType::MultiZoneSetColorZones => {
            let start_index = buf.get_u8();
            let end_index = buf.get_u8();
            let color = get_hsbk(buf);
            let duration = buf.get_u32_le();
            let raw = buf.get_u8();
            let apply = ZoneApply::from_u8(raw).ok_or(DecodingError::InvalidField {
                field: "apply",
                value: raw as u64,
            })?;
            Message::MultiZoneSetColorZones(ColorZones {
                start_index,
                end_index,
                color,
                duration,
                apply,
            })
        }
        MessageType::MultiZoneGetColorZones => Message::MultiZoneGetColorZones {
            start_index: buf.get_u8(),
            end_index: buf.get_u8(),
        },
        MessageType::MultiZoneStateZone => Message::MultiZoneStateZone(ZoneColor {
            count: buf.get_u8(),
            index: buf.get_u8(),
            color: get_hsbk(buf),
        }),
        MessageType::MultiZoneStateMultiZone => {
            let count = buf.get_u8();
            let index = buf.get_u8();
            let mut colors = [Hsbk::default(); ZONES_PER_MESSAGE];
            for color in colors.iter_mut() {
                *color = get_hsbk(buf);
            }
            Message::MultiZoneStateMultiZone(MultiZoneColors {
                count,
                index,
                colors,
            })
        }
    };

    Ok(message)
}

fn get_hsbk(buf: &mut &[u8]) -> Hsbk {
    Hsbk {
        hue: buf.get_u16_le(),
        saturation: buf.get_u16_le(),
        brightness: buf.get_u16_le(),
        kelvin: buf.get_u16_le(),
    }
}

fn get_label(buf: &mut &[u8]) -> String {
    let label = label_from_bytes(&buf[..LABEL_SIZE]);
    buf.advance(LABEL_SIZE);
    label
}

fn get_echo(buf: &mut &[u8]) -> [u8; ECHO_SIZE] {
    let mut payload = [0u8; ECHO_SIZE];
    buf.copy_to_slice(&mut payload);
    payload
}

fn get_signal(buf: &mut &[u8]) -> SignalInfo {
    let info = SignalInfo {
        signal: buf.get_f32_le(),
        tx: buf.get_u32_le(),
        rx: buf.get_u32_le(),
    };
    buf.advance(2);
    info
}

fn get_firmware(buf: &mut &[u8]) -> FirmwareInfo {
    let build = buf.get_u64_le();
    buf.advance(8);
    FirmwareInfo {
        build,
        version: buf.get_u32_le(),
    }
}

fn get_membership(buf: &mut &[u8]) -> Membership {
    let mut id = [0u8; 16];
    buf.copy_to_slice(&mut id);
    Membership {
        id,
        label: get_label(buf),
        updated_at: buf.get_u64_le(),
    }
}

fn get_waveform(buf: &mut &[u8]) -> Result<WaveformOptions, DecodingError> {
    buf.advance(1);
    let transient = buf.get_u8() != 0;
    let color = get_hsbk(buf);
    let period = buf.get_u32_le();
    let cycles = buf.get_f32_le();
    let skew_ratio = buf.get_i16_le();
    let raw = buf.get_u8();
    let waveform = Waveform::from_u8(raw).ok_or(DecodingError::InvalidField {
        field: "waveform",
        value: raw as u64,
    })?;

    Ok(WaveformOptions {
        transient,
        color,
        period,
        cycles,
        skew_ratio,
        waveform,
    })
}
