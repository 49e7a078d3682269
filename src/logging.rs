//! CSV sinks for the per-node time series, the network edge matrix and
//! completed channel traces.

use std::fs::{self, File};
use std::path::Path;

use serde::Serialize;

use crate::channel::ChannelTraceRow;

/// One per-node row of the simulation time series.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    pub tick: u64,
    pub index: u16,
    pub constellation: u16,
    pub mode: u8,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub energy: f64,
    pub charging: bool,
    pub area: f64,
    pub num_neighbors: u16,
}

/// One live channel edge, keyed by `(rx, tx, time)`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EdgeRecord {
    pub tick: u64,
    pub tx: u16,
    pub rx: u16,
}

/// Batched CSV writers under one output directory.
pub struct DataLog {
    nodes: csv::Writer<File>,
    network: csv::Writer<File>,
    channels: csv::Writer<File>,
}

impl DataLog {
    pub fn create(directory: &Path) -> Result<Self, csv::Error> {
        fs::create_dir_all(directory)?;
        Ok(Self {
            nodes: csv::Writer::from_path(directory.join("nodes.csv"))?,
            network: csv::Writer::from_path(directory.join("network.csv"))?,
            channels: csv::Writer::from_path(directory.join("channels.csv"))?,
        })
    }

    pub fn log_node(&mut self, record: &NodeRecord) -> Result<(), csv::Error> {
        self.nodes.serialize(record)
    }

    pub fn log_edge(&mut self, record: &EdgeRecord) -> Result<(), csv::Error> {
        self.network.serialize(record)
    }

    pub fn log_channel_trace(&mut self, rows: &[ChannelTraceRow]) -> Result<(), csv::Error> {
        for row in rows {
            self.channels.serialize(row)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.nodes.flush()?;
        self.network.flush()?;
        self.channels.flush()
    }
}
