//! Streaming reader for a top-level JSON array.
//!
//! The file is tokenized on a blocking thread with `serde_json`'s streaming
//! deserializer; each array element is handed to the async side over a bounded
//! channel as soon as it is parsed. The channel bound is the back-pressure: the
//! parser parks while the writers are behind. Nothing beyond one element is
//! buffered, so arbitrarily large dumps stream in constant memory.

use anyhow::{anyhow, Context, Result};
use serde::de::{self, Deserializer as _, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Read buffer for source files.
const READ_BUFFER_BYTES: usize = 1 << 20;
const HALT_MARKER: &str = "card stream halted";

/// How the parser finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Elements handed to the consumer.
    pub delivered: u64,
    /// True when the limit was reached or the consumer hung up before the array ended.
    pub stopped_early: bool,
}

/// Async handle over the parser thread.
pub struct ArrayStream {
    rx: mpsc::Receiver<Value>,
    handle: JoinHandle<Result<ReadOutcome>>,
}

impl ArrayStream {
    /// Next element in file order, `None` once the parser is done (or failed).
    pub async fn next(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Stop consuming and wait for the parser's verdict. A malformed document or
    /// I/O failure surfaces here.
    pub async fn finish(self) -> Result<ReadOutcome> {
        let ArrayStream { rx, handle } = self;
        drop(rx);
        handle
            .await
            .map_err(|e| anyhow!("card stream reader task failed: {e}"))?
    }
}

pub fn open_source(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("open card source {}", path.display()))?;
    Ok(BufReader::with_capacity(READ_BUFFER_BYTES, file))
}

/// Spawn the parser over `reader`. At most `limit` elements are delivered.
pub fn spawn_array_reader<R>(reader: R, limit: Option<u64>, capacity: usize) -> ArrayStream
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::task::spawn_blocking(move || read_array(reader, limit, &tx));
    ArrayStream { rx, handle }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    Limit,
    ConsumerGone,
}

struct Forward<'a> {
    tx: &'a mpsc::Sender<Value>,
    limit: Option<u64>,
    delivered: u64,
    halted: Option<Halt>,
}

impl<'de, 'a, 'b> Visitor<'de> for &'a mut Forward<'b> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON array of card objects")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        loop {
            if self.limit.is_some_and(|limit| self.delivered >= limit) {
                // An array that holds exactly `limit` elements ended normally.
                if let Ok(None) = seq.next_element::<de::IgnoredAny>() {
                    return Ok(());
                }
                self.halted = Some(Halt::Limit);
                return Err(de::Error::custom(HALT_MARKER));
            }
            let Some(value) = seq.next_element::<Value>()? else {
                return Ok(());
            };
            if self.tx.blocking_send(value).is_err() {
                self.halted = Some(Halt::ConsumerGone);
                return Err(de::Error::custom(HALT_MARKER));
            }
            self.delivered += 1;
        }
    }
}

fn read_array<R: Read>(reader: R, limit: Option<u64>, tx: &mpsc::Sender<Value>) -> Result<ReadOutcome> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let mut forward = Forward {
        tx,
        limit,
        delivered: 0,
        halted: None,
    };

    let parsed = (&mut de).deserialize_seq(&mut forward);
    if let Some(halt) = forward.halted {
        tracing::debug!(
            target: "import",
            delivered = forward.delivered,
            reason = ?halt,
            "card stream stopped before end of array"
        );
        return Ok(ReadOutcome {
            delivered: forward.delivered,
            stopped_early: true,
        });
    }

    parsed.with_context(|| {
        format!(
            "malformed card array after {} records",
            forward.delivered
        )
    })?;
    de.end().context("trailing data after card array")?;
    Ok(ReadOutcome {
        delivered: forward.delivered,
        stopped_early: false,
    })
}
