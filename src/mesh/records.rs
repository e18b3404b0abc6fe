//! Persistence entities and the store seam.
//!
//! The host owns the actual database. The bridge stages [`Record`]s and
//! hands them over in batches; lookups go through [`Query`].

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Message(MessageRecord),
    TraceRoute(TraceRouteRecord),
    Node(NodeRecord),
    Channel(ChannelRecord),
    MyInfo { num: u32 },
    Metadata(MetadataRecord),
    Position(PositionRecord),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRecord {
    /// Packet id; doubles as correlation id for acks.
    pub id: u32,
    pub from: u32,
    pub to: u32,
    pub channel: u32,
    pub text: String,
    pub reply_id: Option<u32>,
    pub emoji: bool,
    pub outgoing: bool,
    /// Unix seconds.
    pub time: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceRouteRecord {
    pub id: u32,
    pub to: u32,
    pub channel: u32,
    /// Intermediate hops, filled in when the response arrives.
    pub route: Vec<u32>,
    pub received: bool,
    pub sent_at: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRecord {
    pub num: u32,
    pub long_name: String,
    pub short_name: String,
    /// Unix seconds, 0 if never heard.
    pub last_heard: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelRecord {
    pub index: i32,
    pub name: String,
    pub role: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataRecord {
    pub num: u32,
    pub firmware_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionRecord {
    pub num: u32,
    pub latitude_i: i32,
    pub longitude_i: i32,
    pub altitude: Option<i32>,
    pub time: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    NodeByNum(u32),
    /// Nodes with `last_heard >= since`, optionally skipping one node.
    NodesHeardSince { since: u32, excluding: Option<u32> },
    TraceRoute(u32),
}

/// Host persistence. Failures are logged by callers, never fatal.
pub trait Store: Send + Sync {
    fn save(&self, records: &[Record]) -> Result<()>;
    fn query(&self, query: &Query) -> Result<Vec<Record>>;
}

pub(crate) fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}
