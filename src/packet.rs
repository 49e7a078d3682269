//! Wire formats for the three packet kinds. All fields little-endian at
//! hard-contract offsets; buffers are disambiguated by length alone.

use std::error::Error;
use std::fmt;

use arrayvec::ArrayString;
use heapless::Vec as BoundedVec;

use crate::clock::Calendar;
use crate::earth::Geodetic;

pub const MAX_ROUTE_TRANSFERS: usize = 30;
pub const TRANSFER_BYTES: usize = 10;
pub const FORWARD_PACKET_BYTES: usize = 312;
pub const RETURN_PACKET_BYTES: usize = 303;
pub const RAW_PACKET_BYTES: usize = 108;
pub const VARIABLE_NAME_BYTES: usize = 30;

const ROUTE_BYTES: usize = MAX_ROUTE_TRANSFERS * TRANSFER_BYTES;
const SENTINEL_NODE: u16 = u16::MAX;
const SENTINEL_START: u64 = u64::MAX;

/// One hop of a store-and-forward route: receiving node and the earliest
/// elapsed time its transfer may begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub node: u16,
    pub start_s: u64,
}

/// Route hops actually present in a packet (the wire tail is sentinel
/// padded out to thirty entries).
pub type Route = BoundedVec<Transfer, MAX_ROUTE_TRANSFERS>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer length matches none of the three wire formats.
    Length { actual: usize },
    /// More than thirty hops handed to an encoder.
    RouteOverflow { hops: usize },
    /// Variable-name field is not valid UTF-8.
    Name,
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::Length { actual } => write!(
                f,
                "buffer of {} bytes is not a forward (312), return (303) or raw (k*108) packet",
                actual
            ),
            PacketError::RouteOverflow { hops } => {
                write!(f, "route of {} hops exceeds {}", hops, MAX_ROUTE_TRANSFERS)
            }
            PacketError::Name => write!(f, "variable name is not valid UTF-8"),
        }
    }
}

impl Error for PacketError {}

/// Packet kind recovered from a buffer length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Forward,
    Return,
    RawBatch(usize),
}

impl PacketKind {
    pub fn classify(len: usize) -> Result<Self, PacketError> {
        match len {
            FORWARD_PACKET_BYTES => Ok(PacketKind::Forward),
            RETURN_PACKET_BYTES => Ok(PacketKind::Return),
            n if n > 0 && n % RAW_PACKET_BYTES == 0 => Ok(PacketKind::RawBatch(n / RAW_PACKET_BYTES)),
            actual => Err(PacketError::Length { actual }),
        }
    }
}

/// Instruction for a future measurement at an absolute simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensingEvent {
    pub target: u16,
    pub elapsed_s: u64,
}

/// Source-to-visitor control packet (312 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardPacket {
    pub route: Route,
    pub event: SensingEvent,
    pub feedback_origin: u16,
}

impl ForwardPacket {
    pub fn new(route: Route, event: SensingEvent, feedback_origin: u16) -> Self {
        Self {
            route,
            event,
            feedback_origin,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(FORWARD_PACKET_BYTES);
        encode_route(&self.route, &mut payload);
        payload.extend_from_slice(&self.event.target.to_le_bytes());
        payload.extend_from_slice(&self.event.elapsed_s.to_le_bytes());
        payload.extend_from_slice(&self.feedback_origin.to_le_bytes());
        payload
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() != FORWARD_PACKET_BYTES {
            return Err(PacketError::Length {
                actual: payload.len(),
            });
        }
        Ok(Self {
            route: decode_route(payload),
            event: SensingEvent {
                target: read_u16(payload, ROUTE_BYTES),
                elapsed_s: read_u64(payload, ROUTE_BYTES + 2),
            },
            feedback_origin: read_u16(payload, ROUTE_BYTES + 10),
        })
    }
}

/// Sink-to-source feedback packet (303 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnPacket {
    pub route: Route,
    pub success: bool,
    pub origin_constellation: u16,
}

impl ReturnPacket {
    pub fn new(route: Route, success: bool, origin_constellation: u16) -> Self {
        Self {
            route,
            success,
            origin_constellation,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(RETURN_PACKET_BYTES);
        encode_route(&self.route, &mut payload);
        payload.push(u8::from(self.success));
        payload.extend_from_slice(&self.origin_constellation.to_le_bytes());
        payload
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() != RETURN_PACKET_BYTES {
            return Err(PacketError::Length {
                actual: payload.len(),
            });
        }
        Ok(Self {
            route: decode_route(payload),
            success: payload[ROUTE_BYTES] != 0,
            origin_constellation: read_u16(payload, ROUTE_BYTES + 1),
        })
    }
}

/// One scalar Earth-surface measurement (108 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct RawPacket {
    pub elapsed_s: u64,
    pub calendar: Calendar,
    pub geodetic: Geodetic,
    pub measurement: f64,
    pub resolution_m: f64,
    pub name: ArrayString<VARIABLE_NAME_BYTES>,
    pub informer_index: u16,
}

impl RawPacket {
    pub fn new(
        elapsed_s: u64,
        calendar: Calendar,
        geodetic: Geodetic,
        measurement: f64,
        resolution_m: f64,
        variable: &str,
        informer_index: u16,
    ) -> Self {
        let mut name = ArrayString::new();
        for c in variable.chars().take(VARIABLE_NAME_BYTES) {
            let _ = name.try_push(c);
        }
        Self {
            elapsed_s,
            calendar,
            geodetic,
            measurement,
            resolution_m,
            name,
            informer_index,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(RAW_PACKET_BYTES);
        payload.extend_from_slice(&self.elapsed_s.to_le_bytes());
        for field in [
            self.calendar.year,
            self.calendar.month,
            self.calendar.day,
            self.calendar.hour,
            self.calendar.minute,
            self.calendar.second,
            self.calendar.microsecond,
        ] {
            payload.extend_from_slice(&field.to_le_bytes());
        }
        for field in [
            self.geodetic.latitude_rad,
            self.geodetic.longitude_rad,
            self.geodetic.altitude_m,
            self.measurement,
            self.resolution_m,
        ] {
            payload.extend_from_slice(&field.to_le_bytes());
        }
        // Right-padded with spaces, not NUL terminated.
        let mut name_bytes = [b' '; VARIABLE_NAME_BYTES];
        name_bytes[..self.name.len()].copy_from_slice(self.name.as_bytes());
        payload.extend_from_slice(&name_bytes);
        payload.extend_from_slice(&self.informer_index.to_le_bytes());
        payload
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() != RAW_PACKET_BYTES {
            return Err(PacketError::Length {
                actual: payload.len(),
            });
        }
        let name_str = std::str::from_utf8(&payload[76..106]).map_err(|_| PacketError::Name)?;
        let mut name = ArrayString::new();
        let _ = name.try_push_str(name_str.trim_end());
        Ok(Self {
            elapsed_s: read_u64(payload, 0),
            calendar: Calendar {
                year: read_i32(payload, 8),
                month: read_i32(payload, 12),
                day: read_i32(payload, 16),
                hour: read_i32(payload, 20),
                minute: read_i32(payload, 24),
                second: read_i32(payload, 28),
                microsecond: read_i32(payload, 32),
            },
            geodetic: Geodetic::new(
                read_f64(payload, 36),
                read_f64(payload, 44),
                read_f64(payload, 52),
            ),
            measurement: read_f64(payload, 60),
            resolution_m: read_f64(payload, 68),
            name,
            informer_index: read_u16(payload, 106),
        })
    }
}

/// Splits a node data buffer into raw packets. Buffers are always whole
/// multiples of 108 bytes; anything else is an invariant violation at the
/// decode boundary.
pub fn decode_raw_buffer(buffer: &[u8]) -> Result<Vec<RawPacket>, PacketError> {
    if buffer.is_empty() || buffer.len() % RAW_PACKET_BYTES != 0 {
        return Err(PacketError::Length {
            actual: buffer.len(),
        });
    }
    buffer.chunks(RAW_PACKET_BYTES).map(RawPacket::decode).collect()
}

/// Builds a bounded route from hop tuples.
pub fn route_from_hops(hops: &[(u16, u64)]) -> Result<Route, PacketError> {
    let mut route = Route::new();
    for &(node, start_s) in hops {
        route
            .push(Transfer { node, start_s })
            .map_err(|_| PacketError::RouteOverflow { hops: hops.len() })?;
    }
    Ok(route)
}

fn encode_route(route: &Route, payload: &mut Vec<u8>) {
    for transfer in route.iter() {
        payload.extend_from_slice(&transfer.node.to_le_bytes());
        payload.extend_from_slice(&transfer.start_s.to_le_bytes());
    }
    for _ in route.len()..MAX_ROUTE_TRANSFERS {
        payload.extend_from_slice(&SENTINEL_NODE.to_le_bytes());
        payload.extend_from_slice(&SENTINEL_START.to_le_bytes());
    }
}

fn decode_route(payload: &[u8]) -> Route {
    let mut route = Route::new();
    for slot in 0..MAX_ROUTE_TRANSFERS {
        let offset = slot * TRANSFER_BYTES;
        let node = read_u16(payload, offset);
        if node == SENTINEL_NODE {
            break;
        }
        let start_s = read_u64(payload, offset + 2);
        if route.push(Transfer { node, start_s }).is_err() {
            break;
        }
    }
    route
}

fn read_u16(payload: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([payload[offset], payload[offset + 1]])
}

fn read_i32(payload: &[u8], offset: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&payload[offset..offset + 4]);
    i32::from_le_bytes(bytes)
}

fn read_u64(payload: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&payload[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn read_f64(payload: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&payload[offset..offset + 8]);
    f64::from_le_bytes(bytes)
}
