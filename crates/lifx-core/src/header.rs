//! Frame header encoding/decoding
//!
//! LIFX frame header (36 bytes, all integers little-endian):
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Bytes 0-1:   Size (uint16, header + payload)                    │
//! │ Bytes 2-3:   [11:0] Protocol (1024)                             │
//! │              [12]   Addressable                                 │
//! │              [13]   Tagged                                      │
//! │              [15:14] Origin                                     │
//! │ Bytes 4-7:   Source (uint32, chosen by the client)              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Bytes 8-15:  Target (6-byte MAC + 2 zero bytes)                 │
//! │ Bytes 16-21: Reserved / site                                    │
//! │ Byte 22:     [0] res_required  [1] ack_required  [7:2] reserved │
//! │ Byte 23:     Sequence                                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Bytes 24-31: Timestamp (echoed by devices)                      │
//! │ Bytes 32-33: Message type                                       │
//! │ Bytes 34-35: Reserved                                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The size and message type are frame properties: [`crate::codec::encode`]
//! derives them from the payload, so [`Header`] does not store them.

use bytes::{Buf, BufMut};

use crate::{EncodingError, MacAddress, HEADER_SIZE, PROTOCOL_NUMBER};

const PROTOCOL_MASK: u16 = 0x0FFF;
const ADDRESSABLE_BIT: u16 = 1 << 12;
const TAGGED_BIT: u16 = 1 << 13;
const ORIGIN_MAX: u8 = 0b11;

const RES_REQUIRED_BIT: u8 = 0b01;
const ACK_REQUIRED_BIT: u8 = 0b10;

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol number, 12 bits
    pub protocol: u16,
    pub addressable: bool,
    /// Set on untargeted frames such as discovery broadcasts
    pub tagged: bool,
    /// Origin indicator, 2 bits
    pub origin: u8,
    /// Identifies the controller that sent a request
    pub source: u32,
    pub target: MacAddress,
    pub site: [u8; 6],
    pub ack_required: bool,
    pub res_required: bool,
    pub sequence: u8,
    pub timestamp: u64,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            protocol: PROTOCOL_NUMBER,
            addressable: true,
            tagged: false,
            origin: 0,
            source: 0,
            target: MacAddress::BROADCAST,
            site: [0; 6],
            ack_required: false,
            res_required: false,
            sequence: 0,
            timestamp: 0,
        }
    }
}

impl Header {
    /// Header for an untargeted frame reaching every device
    pub fn broadcast(source: u32) -> Self {
        Self {
            tagged: true,
            source,
            ..Self::default()
        }
    }

    /// Header for a frame addressed to one device
    pub fn to_device(target: MacAddress, source: u32, sequence: u8) -> Self {
        Self {
            source,
            target,
            sequence,
            ..Self::default()
        }
    }

    pub fn with_ack_required(mut self, ack: bool) -> Self {
        self.ack_required = ack;
        self
    }

    pub fn with_res_required(mut self, res: bool) -> Self {
        self.res_required = res;
        self
    }

    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence;
        self
    }

    /// Check every sub-byte field against its bit width
    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.protocol > PROTOCOL_MASK {
            return Err(EncodingError::FieldOutOfRange {
                field: "protocol",
                value: self.protocol as u64,
                max: PROTOCOL_MASK as u64,
            });
        }
        if self.origin > ORIGIN_MAX {
            return Err(EncodingError::FieldOutOfRange {
                field: "origin",
                value: self.origin as u64,
                max: ORIGIN_MAX as u64,
            });
        }
        Ok(())
    }

    /// Write the header. Call [`Header::validate`] first.
    pub(crate) fn write(&self, buf: &mut impl BufMut, size: u16, message_type: u16) {
        buf.put_u16_le(size);

        let mut flags = self.protocol & PROTOCOL_MASK;
        if self.addressable {
            flags |= ADDRESSABLE_BIT;
        }
        if self.tagged {
            flags |= TAGGED_BIT;
        }
        flags |= ((self.origin & ORIGIN_MAX) as u16) << 14;
        buf.put_u16_le(flags);

        buf.put_u32_le(self.source);

        buf.put_slice(self.target.as_bytes());
        buf.put_u16_le(0);
        buf.put_slice(&self.site);

        let mut response = 0u8;
        if self.res_required {
            response |= RES_REQUIRED_BIT;
        }
        if self.ack_required {
            response |= ACK_REQUIRED_BIT;
        }
        buf.put_u8(response);
        buf.put_u8(self.sequence);

        buf.put_u64_le(self.timestamp);
        buf.put_u16_le(message_type);
        buf.put_u16_le(0);
    }

    /// Read a header from a buffer holding at least [`HEADER_SIZE`] bytes.
    ///
    /// Returns the header, the declared frame size, and the message type.
    pub(crate) fn read(buf: &mut impl Buf) -> (Self, u16, u16) {
        debug_assert!(buf.remaining() >= HEADER_SIZE);

        let size = buf.get_u16_le();
        let flags = buf.get_u16_le();
        let source = buf.get_u32_le();

        let mut target = [0u8; 6];
        buf.copy_to_slice(&mut target);
        buf.advance(2);
        let mut site = [0u8; 6];
        buf.copy_to_slice(&mut site);

        let response = buf.get_u8();
        let sequence = buf.get_u8();
        let timestamp = buf.get_u64_le();
        let message_type = buf.get_u16_le();
        buf.advance(2);

        let header = Self {
            protocol: flags & PROTOCOL_MASK,
            addressable: flags & ADDRESSABLE_BIT != 0,
            tagged: flags & TAGGED_BIT != 0,
            origin: (flags >> 14) as u8,
            source,
            target: MacAddress::new(target),
            site,
            ack_required: response & ACK_REQUIRED_BIT != 0,
            res_required: response & RES_REQUIRED_BIT != 0,
            sequence,
            timestamp,
        };

        (header, size, message_type)
    }
}
