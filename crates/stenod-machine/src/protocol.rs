//! Stenura packet framing.
//!
//! Requests are an 18-byte header: `SOH, seq, len, action, p1..p5, crc`
//! (u16 fields little-endian). Responses are 14 bytes: `SOH, seq, len,
//! action, err, p1, p2, crc`. When `len` exceeds the header size a data
//! section follows, raw bytes plus their own CRC. The header CRC covers
//! `seq` through the last parameter inclusive.

use crate::crc::crc16;
use crate::error::MachineError;

pub const SOH: u8 = 0x01;

pub const REQUEST_HEADER_LEN: usize = 18;
pub const RESPONSE_HEADER_LEN: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Action {
    Close = 0x02,
    Delete = 0x03,
    DiskStatus = 0x07,
    Open = 0x0A,
    ReadC = 0x0B,
    Reset = 0x14,
    Term = 0x15,
    GetDos = 0x18,
    Diag = 0x19,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub seq: u8,
    pub action: Action,
    pub params: [u16; 5],
    pub data: Option<Vec<u8>>,
}

impl Request {
    pub fn new(seq: u8, action: Action, params: [u16; 5]) -> Self {
        Self {
            seq,
            action,
            params,
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let data_len = self.data.as_ref().map_or(0, |d| d.len() + 2);
        let total = REQUEST_HEADER_LEN + data_len;
        let mut out = Vec::with_capacity(total);

        out.push(SOH);
        out.push(self.seq);
        out.extend_from_slice(&(total as u16).to_le_bytes());
        out.extend_from_slice(&(self.action as u16).to_le_bytes());
        for param in self.params {
            out.extend_from_slice(&param.to_le_bytes());
        }
        let crc = crc16(&out[1..REQUEST_HEADER_LEN - 2]);
        out.extend_from_slice(&crc.to_le_bytes());

        if let Some(data) = &self.data {
            out.extend_from_slice(data);
            out.extend_from_slice(&crc16(data).to_le_bytes());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub seq: u8,
    pub action: u16,
    pub error: u16,
    pub p1: u16,
    pub p2: u16,
    pub data: Option<Vec<u8>>,
}

impl Response {
    /// Parse a 14-byte response header (starting at the SOH byte).
    /// Returns the response plus the number of data-section bytes still
    /// to be read (data plus its two CRC bytes).
    pub fn decode_header(header: &[u8; RESPONSE_HEADER_LEN]) -> Result<(Self, usize), MachineError> {
        let seq = header[1];
        let len = u16::from_le_bytes([header[2], header[3]]);

        if (len as usize) < RESPONSE_HEADER_LEN {
            return Err(MachineError::BadLength { len });
        }
        let trailing = len as usize - RESPONSE_HEADER_LEN;
        if trailing > 0 && trailing < 3 {
            // A data section must hold at least one byte plus its CRC.
            return Err(MachineError::BadLength { len });
        }

        let crc = u16::from_le_bytes([header[12], header[13]]);
        if crc16(&header[1..12]) != crc {
            return Err(MachineError::BadCrc { seq });
        }

        Ok((
            Response {
                seq,
                action: u16::from_le_bytes([header[4], header[5]]),
                error: u16::from_le_bytes([header[6], header[7]]),
                p1: u16::from_le_bytes([header[8], header[9]]),
                p2: u16::from_le_bytes([header[10], header[11]]),
                data: None,
            },
            trailing,
        ))
    }

    /// Attach and verify a data section (`trailing` bytes as returned by
    /// [`Response::decode_header`]).
    pub fn attach_data(&mut self, section: &[u8]) -> Result<(), MachineError> {
        let (data, crc_bytes) = section.split_at(section.len() - 2);
        let crc = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
        if crc16(data) != crc {
            return Err(MachineError::BadCrc { seq: self.seq });
        }
        self.data = Some(data.to_vec());
        Ok(())
    }

    /// Encode a response; the test-side mirror of `decode_header`.
    pub fn encode(&self) -> Vec<u8> {
        let data_len = self.data.as_ref().map_or(0, |d| d.len() + 2);
        let total = RESPONSE_HEADER_LEN + data_len;
        let mut out = Vec::with_capacity(total);

        out.push(SOH);
        out.push(self.seq);
        out.extend_from_slice(&(total as u16).to_le_bytes());
        out.extend_from_slice(&self.action.to_le_bytes());
        out.extend_from_slice(&self.error.to_le_bytes());
        out.extend_from_slice(&self.p1.to_le_bytes());
        out.extend_from_slice(&self.p2.to_le_bytes());
        let crc = crc16(&out[1..12]);
        out.extend_from_slice(&crc.to_le_bytes());

        if let Some(data) = &self.data {
            out.extend_from_slice(data);
            out.extend_from_slice(&crc16(data).to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout() {
        let req = Request::new(7, Action::ReadC, [1, 1, 512, 0, 42]);
        let bytes = req.encode();
        assert_eq!(bytes.len(), REQUEST_HEADER_LEN);
        assert_eq!(bytes[0], SOH);
        assert_eq!(bytes[1], 7);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 18);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 0x0B);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[10], bytes[11]]), 512);
        assert_eq!(u16::from_le_bytes([bytes[14], bytes[15]]), 42);

        let crc = u16::from_le_bytes([bytes[16], bytes[17]]);
        assert_eq!(crc16(&bytes[1..16]), crc);
    }

    #[test]
    fn open_request_carries_data_section() {
        let req = Request::new(1, Action::Open, [b'A' as u16, 0, 0, 0, 0])
            .with_data(&b"REALTIME.000"[..]);
        let bytes = req.encode();
        assert_eq!(bytes.len(), 18 + 12 + 2);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 32);
        assert_eq!(&bytes[18..30], b"REALTIME.000");
        let data_crc = u16::from_le_bytes([bytes[30], bytes[31]]);
        assert_eq!(crc16(b"REALTIME.000"), data_crc);
    }

    #[test]
    fn response_round_trip() {
        let resp = Response {
            seq: 9,
            action: 0x0B,
            error: 0,
            p1: 8,
            p2: 0,
            data: Some(vec![0xC0, 0xC8, 0xC0, 0xC0, 0xC0, 0xC0, 0xC0, 0xC1]),
        };
        let bytes = resp.encode();

        let mut header = [0u8; RESPONSE_HEADER_LEN];
        header.copy_from_slice(&bytes[..RESPONSE_HEADER_LEN]);
        let (mut decoded, trailing) = Response::decode_header(&header).unwrap();
        assert_eq!(trailing, 10);
        decoded
            .attach_data(&bytes[RESPONSE_HEADER_LEN..])
            .unwrap();
        assert_eq!(decoded, resp);
    }

    #[test]
    fn short_length_is_rejected() {
        let resp = Response {
            seq: 2,
            action: 0x0B,
            error: 0,
            p1: 0,
            p2: 0,
            data: None,
        };
        let mut bytes = resp.encode();
        bytes[2] = 4;
        bytes[3] = 0;
        let mut header = [0u8; RESPONSE_HEADER_LEN];
        header.copy_from_slice(&bytes[..RESPONSE_HEADER_LEN]);
        assert!(matches!(
            Response::decode_header(&header),
            Err(MachineError::BadLength { len: 4 })
        ));
    }

    #[test]
    fn corrupt_header_crc_is_rejected() {
        let resp = Response {
            seq: 3,
            action: 0x0B,
            error: 0,
            p1: 0,
            p2: 0,
            data: None,
        };
        let mut bytes = resp.encode();
        bytes[8] ^= 0xFF;
        let mut header = [0u8; RESPONSE_HEADER_LEN];
        header.copy_from_slice(&bytes[..RESPONSE_HEADER_LEN]);
        assert!(matches!(
            Response::decode_header(&header),
            Err(MachineError::BadCrc { seq: 3 })
        ));
    }

    #[test]
    fn corrupt_data_crc_is_rejected() {
        let resp = Response {
            seq: 4,
            action: 0x0B,
            error: 0,
            p1: 4,
            p2: 0,
            data: Some(vec![1, 2, 3, 4]),
        };
        let mut bytes = resp.encode();
        let last = bytes.len() - 3;
        bytes[last] ^= 0xFF;
        let mut header = [0u8; RESPONSE_HEADER_LEN];
        header.copy_from_slice(&bytes[..RESPONSE_HEADER_LEN]);
        let (mut decoded, trailing) = Response::decode_header(&header).unwrap();
        assert!(matches!(
            decoded.attach_data(&bytes[RESPONSE_HEADER_LEN..RESPONSE_HEADER_LEN + trailing]),
            Err(MachineError::BadCrc { seq: 4 })
        ));
    }
}
