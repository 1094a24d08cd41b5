/// Background hashing worker.
///
/// A dedicated OS thread owns the incremental hash state and is driven by
/// control messages. The channel is bounded, so a fast reader cannot queue
/// more than a couple of chunks ahead of the hashing thread. Dropping the
/// handle closes the channel and the thread exits.
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::crypto::hash::{Digester, HashAlgorithm};
use crate::error::{Result, VerifyError};

const QUEUE_DEPTH: usize = 2;

pub enum WorkerMessage {
    /// Begin a new digest, discarding any previous state.
    Start(HashAlgorithm),
    Update(Vec<u8>),
    /// Finish the current digest and send back its hex encoding.
    Finalize(oneshot::Sender<String>),
    Reset,
}

pub struct HashWorker {
    tx: mpsc::Sender<WorkerMessage>,
}

impl HashWorker {
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        thread::Builder::new()
            .name("hash-worker".into())
            .spawn(move || run(rx))?;
        debug!("Hash worker started");
        Ok(Self { tx })
    }

    async fn send(&self, msg: WorkerMessage) -> Result<()> {
        self.tx.send(msg).await.map_err(|_| stopped())
    }

    pub async fn start(&self, algorithm: HashAlgorithm) -> Result<()> {
        self.send(WorkerMessage::Start(algorithm)).await
    }

    pub async fn update(&self, chunk: Vec<u8>) -> Result<()> {
        self.send(WorkerMessage::Update(chunk)).await
    }

    pub async fn finalize(&self) -> Result<String> {
        let (reply, digest) = oneshot::channel();
        self.send(WorkerMessage::Finalize(reply)).await?;
        digest.await.map_err(|_| stopped())
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(WorkerMessage::Reset).await
    }
}

fn stopped() -> VerifyError {
    VerifyError::Io(std::io::Error::other("hash worker stopped"))
}

fn run(mut rx: mpsc::Receiver<WorkerMessage>) {
    let mut state: Option<Digester> = None;

    while let Some(msg) = rx.blocking_recv() {
        match msg {
            WorkerMessage::Start(algorithm) => state = Some(algorithm.digester()),
            WorkerMessage::Update(chunk) => {
                if let Some(digester) = state.as_mut() {
                    digester.update(&chunk);
                }
            }
            WorkerMessage::Finalize(reply) => {
                // Finalize without Start drops the reply; the caller sees `stopped`.
                if let Some(digester) = state.take() {
                    let _ = reply.send(digester.finalize_hex());
                }
            }
            WorkerMessage::Reset => state = None,
        }
    }

    debug!("Hash worker exiting");
}
