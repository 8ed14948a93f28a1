//! Order-log replay.
//!
//! Reads a CSV log with the header
//!
//! ```text
//! action,order_id,side,price,qty,timestamp
//! place,1,bid,5000,10,2024-01-02T09:30:00.000000001Z
//! cancel,1,,,,
//! ```
//!
//! into [`Command`]s. `side`, `price` and `qty` are required for `place` rows
//! and ignored for `cancel` rows. `timestamp` is optional RFC 3339; when it is
//! missing the row number is used so replayed orders keep their file order.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::command::{CancelOrder, Command, PlaceOrder, Side};
use crate::error::ReplayError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    #[serde(alias = "add", alias = "new")]
    Place,
    #[serde(alias = "delete", alias = "del")]
    Cancel,
}

#[derive(Debug, Deserialize)]
struct Row {
    action: Action,
    order_id: u64,
    side: Option<Side>,
    price: Option<u32>,
    qty: Option<u32>,
    timestamp: Option<DateTime<Utc>>,
}

impl Row {
    fn into_command(self, line: u64) -> Result<Command, ReplayError> {
        match self.action {
            Action::Cancel => Ok(Command::Cancel(CancelOrder {
                order_id: self.order_id,
            })),
            Action::Place => {
                let side = self.side.ok_or(ReplayError::InvalidRow {
                    line,
                    reason: "place row without side",
                })?;
                let price = self.price.ok_or(ReplayError::InvalidRow {
                    line,
                    reason: "place row without price",
                })?;
                let qty = self.qty.ok_or(ReplayError::InvalidRow {
                    line,
                    reason: "place row without qty",
                })?;
                let timestamp = match self.timestamp {
                    Some(ts) => ts.timestamp_nanos_opt().ok_or(ReplayError::InvalidRow {
                        line,
                        reason: "timestamp out of range",
                    })? as u64,
                    None => line,
                };
                Ok(Command::Place(PlaceOrder {
                    order_id: self.order_id,
                    side,
                    price,
                    qty,
                    timestamp,
                }))
            }
        }
    }
}

/// Parse every row of a CSV order log.
pub fn read_commands<R: Read>(reader: R) -> Result<Vec<Command>, ReplayError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut commands = Vec::new();
    for record in rdr.deserialize::<Row>() {
        let row = record?;
        // Header is line 1
        let line = commands.len() as u64 + 2;
        commands.push(row.into_command(line)?);
    }
    debug!(rows = commands.len(), "parsed order log");
    Ok(commands)
}

/// Load an order log from disk.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Command>, ReplayError> {
    let path = path.as_ref();
    let commands = read_commands(File::open(path)?)?;
    info!(path = %path.display(), commands = commands.len(), "loaded order log");
    Ok(commands)
}
