//! ECHONET Lite frames for the low-voltage smart electric energy meter.
//!
//! Frame layout (byte offsets):
//! ```text
//! ┌──────┬──────┬──────┬──────┬─────┬─────┬─────┬─────┬───────────┐
//! │ EHD  │ TID  │ SEOJ │ DEOJ │ ESV │ OPC │ EPC │ PDC │ EDT       │
//! │ 0..2 │ 2..4 │ 4..7 │ 7..10│ 10  │ 11  │ 12  │ 13  │ 14..      │
//! └──────┴──────┴──────┴──────┴─────┴─────┴─────┴─────┴───────────┘
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::types::Reading;

/// ECHONET Lite header for the specified message format.
pub const EHD: [u8; 2] = [0x10, 0x81];

/// Controller object (this driver).
pub const CONTROLLER_OBJECT: u32 = 0x05_FF01;

/// Low-voltage smart electric energy meter object.
pub const SMART_METER_OBJECT: u32 = 0x02_8801;

/// Property value read request.
pub const ESV_GET: u8 = 0x62;

/// Property value read response.
pub const ESV_GET_RES: u8 = 0x72;

/// Measured instantaneous electric power, in watts.
pub const EPC_INSTANTANEOUS_POWER: u8 = 0xE7;

/// Transaction id sent with every request.
pub const DEFAULT_TRANSACTION_ID: u16 = 0x0001;

/// Index of the hex payload within an `ERXUDP` line.
pub const PAYLOAD_FIELD: usize = 8;

const SEOJ_OFFSET: usize = 4;
const ESV_OFFSET: usize = 10;
const EPC_OFFSET: usize = 12;

/// Shortest frame that can carry a 4-byte power value.
const MIN_POWER_FRAME: usize = 18;

/// Builds a Get request for the instantaneous power property.
#[must_use]
pub fn instantaneous_power_request(tid: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(14);
    buf.put_slice(&EHD);
    buf.put_u16(tid);
    put_object(&mut buf, CONTROLLER_OBJECT);
    put_object(&mut buf, SMART_METER_OBJECT);
    buf.put_u8(ESV_GET);
    buf.put_u8(1); // OPC
    buf.put_u8(EPC_INSTANTANEOUS_POWER);
    buf.put_u8(0); // PDC
    buf.freeze()
}

fn put_object(buf: &mut BytesMut, object: u32) {
    buf.put_slice(&object.to_be_bytes()[1..]);
}

fn object_at(frame: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([0, frame[offset], frame[offset + 1], frame[offset + 2]])
}

/// Extracts the hex payload field from a notification line.
pub fn payload_field(line: &str) -> Result<&str, DecodeError> {
    let fields: Vec<&str> = line.split(' ').collect();
    fields
        .get(PAYLOAD_FIELD)
        .map(|field| field.trim())
        .ok_or(DecodeError::MissingPayload(fields.len()))
}

/// Decodes the instantaneous power from an `ERXUDP` notification line.
///
/// Any frame that is not a smart meter's Get response for property `E7`
/// yields a [`DecodeError`].
pub fn decode_instantaneous_power(line: &str) -> Result<Reading, DecodeError> {
    let payload = payload_field(line)?;
    let frame = hex::decode(payload).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;

    if frame.len() <= ESV_OFFSET {
        return Err(DecodeError::TooShort {
            min: MIN_POWER_FRAME,
            got: frame.len(),
        });
    }

    let seoj = object_at(&frame, SEOJ_OFFSET);
    if seoj != SMART_METER_OBJECT {
        return Err(DecodeError::UnexpectedObject(seoj));
    }
    let esv = frame[ESV_OFFSET];
    if esv != ESV_GET_RES {
        return Err(DecodeError::UnexpectedService(esv));
    }

    if frame.len() < MIN_POWER_FRAME {
        return Err(DecodeError::TooShort {
            min: MIN_POWER_FRAME,
            got: frame.len(),
        });
    }
    let epc = frame[EPC_OFFSET];
    if epc != EPC_INSTANTANEOUS_POWER {
        return Err(DecodeError::UnexpectedProperty(epc));
    }

    let tail = &frame[frame.len() - 4..];
    let watts = u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]]);
    Ok(Reading::new(watts))
}
