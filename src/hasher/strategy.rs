/// Hashing strategies, chosen per item from highest priority down:
///
/// 1. `Native`: buffer the content and digest it in one shot. Bounded by
///    `native_max_size` since the whole content is held in memory.
/// 2. `Worker`: stream chunks to the background hash worker.
/// 3. `Sync`: stream chunks into an incremental digest on the calling task,
///    bounded by `sync_max_size`.
///
/// Empty content always goes to `Sync`: single-shot digests of empty input
/// are not trusted on every host.
use tracing::debug;

use super::source::ContentReader;
use super::worker::HashWorker;
use super::{Abort, ItemContext};
use crate::config::HasherConfig;
use crate::crypto::hash::{Digester, HashAlgorithm};
use crate::error::{Result, VerifyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Native,
    Worker,
    Sync,
}

/// Result of hashing one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ItemResult {
    Completed(String),
    Cancelled,
    Skipped,
}

impl From<Abort> for ItemResult {
    fn from(abort: Abort) -> Self {
        match abort {
            Abort::Cancel => Self::Cancelled,
            Abort::Skip => Self::Skipped,
        }
    }
}

pub fn select(config: &HasherConfig, size: u64) -> Result<Strategy> {
    if size == 0 {
        return Ok(Strategy::Sync);
    }
    if config.native_enabled && size <= config.native_max_size {
        return Ok(Strategy::Native);
    }
    if config.worker_enabled {
        return Ok(Strategy::Worker);
    }
    if size <= config.sync_max_size {
        return Ok(Strategy::Sync);
    }
    Err(VerifyError::FileTooBigToBeHashedWithoutWorker { size })
}

/// Where streamed chunks go.
enum Sink<'w> {
    Buffer(Vec<u8>, HashAlgorithm),
    Digest(Digester),
    Worker(&'w HashWorker),
}

impl Sink<'_> {
    async fn push(&mut self, chunk: Vec<u8>) -> Result<()> {
        match self {
            Self::Buffer(buf, _) => buf.extend_from_slice(&chunk),
            Self::Digest(digester) => {
                digester.update(&chunk);
            }
            Self::Worker(worker) => worker.update(chunk).await?,
        }
        Ok(())
    }

    async fn finish(self) -> Result<String> {
        match self {
            Self::Buffer(buf, algorithm) => Ok(algorithm.digest_hex(&buf)),
            Self::Digest(digester) => Ok(digester.finalize_hex()),
            Self::Worker(worker) => worker.finalize().await,
        }
    }
}

/// Hash one item with the given strategy.
///
/// `worker` must be `Some` for `Strategy::Worker`.
pub(crate) async fn run(
    strategy: Strategy,
    reader: &mut ContentReader,
    ctx: &ItemContext<'_>,
    config: &HasherConfig,
    worker: Option<&HashWorker>,
) -> Result<ItemResult> {
    let mut sink = match (strategy, worker) {
        (Strategy::Native, _) => {
            Sink::Buffer(Vec::with_capacity(ctx.size as usize), config.algorithm)
        }
        (Strategy::Sync, _) => Sink::Digest(config.algorithm.digester()),
        (Strategy::Worker, Some(worker)) => {
            worker.start(config.algorithm).await?;
            Sink::Worker(worker)
        }
        (Strategy::Worker, None) => {
            return Err(VerifyError::FileTooBigToBeHashedWithoutWorker { size: ctx.size })
        }
    };

    let mut offset: u64 = 0;
    loop {
        if let Some(abort) = ctx.abort() {
            debug!(file = %ctx.file, offset, "Hashing aborted");
            return Ok(abort.into());
        }
        let chunk = reader.read_chunk(config.chunk_size).await?;
        if chunk.is_empty() {
            break;
        }
        offset += chunk.len() as u64;
        sink.push(chunk).await?;
        ctx.progress(offset);
    }

    // An abort requested while the last chunk was reported still wins.
    if let Some(abort) = ctx.abort() {
        return Ok(abort.into());
    }
    if offset == 0 {
        ctx.progress(0);
    }

    sink.finish().await.map(ItemResult::Completed)
}
