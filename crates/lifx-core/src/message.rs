//! Protocol message definitions

use bytes::Bytes;

use crate::types::{
    ColorZones, FirmwareInfo, Hsbk, LightStatus, Membership, MultiZoneColors, SignalInfo,
    WaveformOptionalOptions, WaveformOptions, ZoneColor, ECHO_SIZE, ZONES_PER_MESSAGE,
};

/// Message type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    GetService = 2,
    StateService = 3,
    GetHostInfo = 12,
    StateHostInfo = 13,
    GetHostFirmware = 14,
    StateHostFirmware = 15,
    GetWifiInfo = 16,
    StateWifiInfo = 17,
    GetWifiFirmware = 18,
    StateWifiFirmware = 19,
    GetPower = 20,
    SetPower = 21,
    StatePower = 22,
    GetLabel = 23,
    SetLabel = 24,
    StateLabel = 25,
    GetVersion = 32,
    StateVersion = 33,
    GetInfo = 34,
    StateInfo = 35,
    SetReboot = 38,
    Acknowledgement = 45,
    GetLocation = 48,
    StateLocation = 50,
    GetGroup = 51,
    StateGroup = 53,
    EchoRequest = 58,
    EchoResponse = 59,
    LightGet = 101,
    LightSetColor = 102,
    LightSetWaveform = 103,
    LightState = 107,
    LightGetPower = 116,
    LightSetPower = 117,
    LightStatePower = 118,
    LightSetWaveformOptional = 119,
    LightGetInfrared = 120,
    LightStateInfrared = 121,
    LightSetInfrared = 122,
    MultiZoneSetColorZones = 501,
    MultiZoneGetColorZones = 502,
    MultiZoneStateZone = 503,
    MultiZoneStateMultiZone = 506,
}

impl MessageType {
    pub fn from_u16(val: u16) -> Option<Self> {
        match val {
            2 => Some(MessageType::GetService),
            3 => Some(MessageType::StateService),
            12 => Some(MessageType::GetHostInfo),
            13 => Some(MessageType::StateHostInfo),
            14 => Some(MessageType::GetHostFirmware),
            15 => Some(MessageType::StateHostFirmware),
            16 => Some(MessageType::GetWifiInfo),
            17 => Some(MessageType::StateWifiInfo),
            18 => Some(MessageType::GetWifiFirmware),
            19 => Some(MessageType::StateWifiFirmware),
            20 => Some(MessageType::GetPower),
            21 => Some(MessageType::SetPower),
            22 => Some(MessageType::StatePower),
            23 => Some(MessageType::GetLabel),
            24 => Some(MessageType::SetLabel),
            25 => Some(MessageType::StateLabel),
            32 => Some(MessageType::GetVersion),
            33 => Some(MessageType::StateVersion),
            34 => Some(MessageType::GetInfo),
            35 => Some(MessageType::StateInfo),
            38 => Some(MessageType::SetReboot),
            45 => Some(MessageType::Acknowledgement),
            48 => Some(MessageType::GetLocation),
            50 => Some(MessageType::StateLocation),
            51 => Some(MessageType::GetGroup),
            53 => Some(MessageType::StateGroup),
            58 => Some(MessageType::EchoRequest),
            59 => Some(MessageType::EchoResponse),
            101 => Some(MessageType::LightGet),
            102 => Some(MessageType::LightSetColor),
            103 => Some(MessageType::LightSetWaveform),
            107 => Some(MessageType::LightState),
            116 => Some(MessageType::LightGetPower),
            117 => Some(MessageType::LightSetPower),
            118 => Some(MessageType::LightStatePower),
            119 => Some(MessageType::LightSetWaveformOptional),
            120 => Some(MessageType::LightGetInfrared),
            121 => Some(MessageType::LightStateInfrared),
            122 => Some(MessageType::LightSetInfrared),
            501 => Some(MessageType::MultiZoneSetColorZones),
            502 => Some(MessageType::MultiZoneGetColorZones),
            503 => Some(MessageType::MultiZoneStateZone),
            506 => Some(MessageType::MultiZoneStateMultiZone),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Fixed payload length of this message type
    pub fn payload_size(self) -> usize {
        use MessageType::*;
        match self {
            StateService => 5,
            StateHostInfo | StateWifiInfo => 14,
            StateHostFirmware | StateWifiFirmware => 20,
            SetPower | StatePower => 2,
            SetLabel | StateLabel => 32,
            StateVersion => 12,
            StateInfo => 24,
            StateLocation | StateGroup => 56,
            EchoRequest | EchoResponse => ECHO_SIZE,
            LightSetColor => 13,
            LightSetWaveform => 21,
            LightSetWaveformOptional => 25,
            LightState => 52,
            LightSetPower => 6,
            LightStatePower => 2,
            LightStateInfrared | LightSetInfrared => 2,
            MultiZoneSetColorZones => 15,
            MultiZoneGetColorZones => 2,
            MultiZoneStateZone => 10,
            MultiZoneStateMultiZone => 2 + 8 * ZONES_PER_MESSAGE,
            GetService | GetHostInfo | GetHostFirmware | GetWifiInfo | GetWifiFirmware
            | GetPower | GetLabel | GetVersion | GetInfo | SetReboot | Acknowledgement
            | GetLocation | GetGroup | LightGet | LightGetPower | LightGetInfrared => 0,
        }
    }

    /// True for `State*` messages, which carry device state
    pub fn is_state(self) -> bool {
        use MessageType::*;
        matches!(
            self,
            StateService
                | StateHostInfo
                | StateHostFirmware
                | StateWifiInfo
                | StateWifiFirmware
                | StatePower
                | StateLabel
                | StateVersion
                | StateInfo
                | StateLocation
                | StateGroup
                | LightState
                | LightStatePower
                | LightStateInfrared
                | MultiZoneStateZone
                | MultiZoneStateMultiZone
        )
    }
}

/// A decoded LIFX payload.
///
/// Unknown message types decode to [`Message::Unknown`] so that protocol
/// extensions pass through instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    GetService,
    StateService { service: u8, port: u32 },
    GetHostInfo,
    StateHostInfo(SignalInfo),
    GetHostFirmware,
    StateHostFirmware(FirmwareInfo),
    GetWifiInfo,
    StateWifiInfo(SignalInfo),
    GetWifiFirmware,
    StateWifiFirmware(FirmwareInfo),
    GetPower,
    SetPower { level: u16 },
    StatePower { level: u16 },
    GetLabel,
    SetLabel { label: String },
    StateLabel { label: String },
    GetVersion,
    StateVersion { vendor: u32, product: u32, version: u32 },
    /// Time and uptime query
    GetInfo,
    StateInfo { time: u64, uptime: u64, downtime: u64 },
    SetReboot,
    Acknowledgement,
    GetLocation,
    StateLocation(Membership),
    GetGroup,
    StateGroup(Membership),
    EchoRequest { payload: [u8; ECHO_SIZE] },
    EchoResponse { payload: [u8; ECHO_SIZE] },
    LightGet,
    LightSetColor { color: Hsbk, duration: u32 },
    LightSetWaveform(WaveformOptions),
    LightSetWaveformOptional(WaveformOptionalOptions),
    LightState(LightStatus),
    LightGetPower,
    LightSetPower { level: u16, duration: u32 },
    LightStatePower { level: u16 },
    LightGetInfrared,
    LightStateInfrared { brightness: u16 },
    LightSetInfrared { brightness: u16 },
    MultiZoneSetColorZones(ColorZones),
    /// Zones `start_index..=end_index`; answered with one
    /// `MultiZoneStateMultiZone` per eight zones
    MultiZoneGetColorZones { start_index: u8, end_index: u8 },
    MultiZoneStateZone(ZoneColor),
    MultiZoneStateMultiZone(MultiZoneColors),
    /// Payload of a type this crate does not know
    Unknown { message_type: u16, payload: Bytes },
}

impl Message {
    /// Typed message kind, `None` for [`Message::Unknown`]
    pub fn kind(&self) -> Option<MessageType> {
        use MessageType as T;
        let kind = match self {
            Message::GetService => T::GetService,
            Message::StateService { .. } => T::StateService,
            Message::GetHostInfo => T::GetHostInfo,
            Message::StateHostInfo(_) => T::StateHostInfo,
            Message::GetHostFirmware => T::GetHostFirmware,
            Message::StateHostFirmware(_) => T::StateHostFirmware,
            Message::GetWifiInfo => T::GetWifiInfo,
            Message::StateWifiInfo(_) => T::StateWifiInfo,
            Message::GetWifiFirmware => T::GetWifiFirmware,
            Message::StateWifiFirmware(_) => T::StateWifiFirmware,
            Message::GetPower => T::GetPower,
            Message::SetPower { .. } => T::SetPower,
            Message::StatePower { .. } => T::StatePower,
            Message::GetLabel => T::GetLabel,
            Message::SetLabel { .. } => T::SetLabel,
            Message::StateLabel { .. } => T::StateLabel,
            Message::GetVersion => T::GetVersion,
            Message::StateVersion { .. } => T::StateVersion,
            Message::GetInfo => T::GetInfo,
            Message::StateInfo { .. } => T::StateInfo,
            Message::SetReboot => T::SetReboot,
            Message::Acknowledgement => T::Acknowledgement,
            Message::GetLocation => T::GetLocation,
            Message::StateLocation(_) => T::StateLocation,
            Message::GetGroup => T::GetGroup,
            Message::StateGroup(_) => T::StateGroup,
            Message::EchoRequest { .. } => T::EchoRequest,
            Message::EchoResponse { .. } => T::EchoResponse,
            Message::LightGet => T::LightGet,
            Message::LightSetColor { .. } => T::LightSetColor,
            Message::LightSetWaveform(_) => T::LightSetWaveform,
            Message::LightSetWaveformOptional(_) => T::LightSetWaveformOptional,
            Message::LightState(_) => T::LightState,
            Message::LightGetPower => T::LightGetPower,
            Message::LightSetPower { .. } => T::LightSetPower,
            Message::LightStatePower { .. } => T::LightStatePower,
            Message::LightGetInfrared => T::LightGetInfrared,
            Message::LightStateInfrared { .. } => T::LightStateInfrared,
            Message::LightSetInfrared { .. } => T::LightSetInfrared,
            Message::MultiZoneSetColorZones(_) => T::MultiZoneSetColorZones,
            Message::MultiZoneGetColorZones { .. } => T::MultiZoneGetColorZones,
            Message::MultiZoneStateZone(_) => T::MultiZoneStateZone,
            Message::MultiZoneStateMultiZone(_) => T::MultiZoneStateMultiZone,
            Message::Unknown { .. } => return None,
        };
        Some(kind)
    }

    /// Numeric message type written to the header
    pub fn message_type(&self) -> u16 {
        match self {
            Message::Unknown { message_type, .. } => *message_type,
            other => other.kind().map(MessageType::code).unwrap_or_default(),
        }
    }

    /// Message name for logging
    pub fn name(&self) -> &'static str {
        match self.kind() {
            Some(kind) => kind.name(),
            None => "Unknown",
        }
    }

    /// Read-only queries whose whole purpose is the response
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Message::GetService
                | Message::GetHostInfo
                | Message::GetHostFirmware
                | Message::GetWifiInfo
                | Message::GetWifiFirmware
                | Message::GetPower
                | Message::GetLabel
                | Message::GetVersion
                | Message::GetInfo
                | Message::GetLocation
                | Message::GetGroup
                | Message::EchoRequest { .. }
                | Message::LightGet
                | Message::LightGetPower
                | Message::LightGetInfrared
                | Message::MultiZoneGetColorZones { .. }
        )
    }

    /// True for `State*` messages, which carry device state
    pub fn is_state(&self) -> bool {
        self.kind().map(MessageType::is_state).unwrap_or(false)
    }

    /// The message a device sends back when `res_required` is set
    pub fn response_type(&self) -> Option<MessageType> {
        use MessageType as T;
        let response = match self {
            Message::GetService => T::StateService,
            Message::GetHostInfo => T::StateHostInfo,
            Message::GetHostFirmware => T::StateHostFirmware,
            Message::GetWifiInfo => T::StateWifiInfo,
            Message::GetWifiFirmware => T::StateWifiFirmware,
            Message::GetPower | Message::SetPower { .. } => T::StatePower,
            Message::GetLabel | Message::SetLabel { .. } => T::StateLabel,
            Message::GetVersion => T::StateVersion,
            Message::GetInfo => T::StateInfo,
            Message::GetLocation => T::StateLocation,
            Message::GetGroup => T::StateGroup,
            Message::EchoRequest { .. } => T::EchoResponse,
            Message::LightGet
            | Message::LightSetColor { .. }
            | Message::LightSetWaveform(_)
            | Message::LightSetWaveformOptional(_) => T::LightState,
            Message::LightGetPower | Message::LightSetPower { .. } => T::LightStatePower,
            Message::LightGetInfrared | Message::LightSetInfrared { .. } => {
                T::LightStateInfrared
            }
            Message::MultiZoneGetColorZones { .. } | Message::MultiZoneSetColorZones(_) => {
                T::MultiZoneStateMultiZone
            }
            _ => return None,
        };
        Some(response)
    }

    /// Build an echo request, padding or cutting `data` to 64 bytes
    pub fn echo_request(data: &[u8]) -> Self {
        let mut payload = [0u8; ECHO_SIZE];
        let len = data.len().min(ECHO_SIZE);
        payload[..len].copy_from_slice(&data[..len]);
        Message::EchoRequest { payload }
    }

    /// Ask for zones `start_index..=end_index`, or the eight zones from
    /// `start_index` when no end is given
    pub fn get_color_zones(start_index: u8, end_index: Option<u8>) -> Self {
        Message::MultiZoneGetColorZones {
            start_index,
            end_index: end_index.unwrap_or(start_index.saturating_add(7)),
        }
    }
}

impl MessageType {
    pub fn name(self) -> &'static str {
        use MessageType::*;
        match self {
            GetService => "GetService",
            StateService => "StateService",
            GetHostInfo => "GetHostInfo",
            StateHostInfo => "StateHostInfo",
            GetHostFirmware => "GetHostFirmware",
            StateHostFirmware => "StateHostFirmware",
            GetWifiInfo => "GetWifiInfo",
            StateWifiInfo => "StateWifiInfo",
            GetWifiFirmware => "GetWifiFirmware",
            StateWifiFirmware => "StateWifiFirmware",
            GetPower => "GetPower",
            SetPower => "SetPower",
            StatePower => "StatePower",
            GetLabel => "GetLabel",
            SetLabel => "SetLabel",
            StateLabel => "StateLabel",
            GetVersion => "GetVersion",
            StateVersion => "StateVersion",
            GetInfo => "GetInfo",
            StateInfo => "StateInfo",
            SetReboot => "SetReboot",
            Acknowledgement => "Acknowledgement",
            GetLocation => "GetLocation",
            StateLocation => "StateLocation",
            GetGroup => "GetGroup",
            StateGroup => "StateGroup",
            EchoRequest => "EchoRequest",
            EchoResponse => "EchoResponse",
            LightGet => "LightGet",
            LightSetColor => "LightSetColor",
            LightSetWaveform => "LightSetWaveform",
            LightState => "LightState",
            LightGetPower => "LightGetPower",
            LightSetPower => "LightSetPower",
            LightStatePower => "LightStatePower",
            LightSetWaveformOptional => "LightSetWaveformOptional",
            LightGetInfrared => "LightGetInfrared",
            LightStateInfrared => "LightStateInfrared",
            LightSetInfrared => "LightSetInfrared",
            MultiZoneSetColorZones => "MultiZoneSetColorZones",
            MultiZoneGetColorZones => "MultiZoneGetColorZones",
            MultiZoneStateZone => "MultiZoneStateZone",
            MultiZoneStateMultiZone => "MultiZoneStateMultiZone",
        }
    }
}
