//! Child-process worker transport
//!
//! Launches real OS processes and speaks the length-prefixed binary
//! frame format over their stdio pipes. The child side calls
//! [`worker_main`] to serve as a worker: it announces readiness,
//! constructs actors on `initialize`, and runs until the host closes the
//! channel.
//!
//! Malformed inbound frames are dropped and reported; only a closed or
//! truncated channel stops the pumps.

use crate::error::{LaunchError, PortError};
use crate::launch::{EntryPoint, MessagePort, WorkerLauncher};
use crate::system::{ActorSystem, InboxPort, Peer, SystemConfig};
use protocol::frame::{self, LENGTH_PREFIX, MAX_FRAME_BYTES};
use protocol::{Frame, TransferList};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Argument appended to worker process invocations
pub const WORKER_FLAG: &str = "--worker";

/// Whether this process was started as a worker. Binaries that can play
/// both roles check this before deciding whether to call [`worker_main`].
pub fn is_worker_invocation() -> bool {
    std::env::args().any(|arg| arg == WORKER_FLAG)
}

/// Launches workers as OS child processes over stdio pipes
pub struct ChildProcessLauncher;

impl WorkerLauncher for ChildProcessLauncher {
    fn launch(
        &self,
        entry: &EntryPoint,
        host: Box<dyn MessagePort>,
    ) -> Result<Box<dyn MessagePort>, LaunchError> {
        if entry.location.is_empty() {
            return Err(LaunchError::UnableToLoad {
                location: entry.location.clone(),
                module: entry.module,
                reason: "empty entry point location".to_string(),
            });
        }

        let mut command = Command::new(&entry.location);
        command.arg(WORKER_FLAG);
        if entry.module {
            command.arg("--module");
        }
        command.stdin(Stdio::piped()).stdout(Stdio::piped());

        let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
            location: entry.location.clone(),
            source,
        })?;
        info!(location = %entry.location, pid = ?child.id(), "spawned worker process");

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_frames(stdin, rx));
        tokio::spawn(read_frames(stdout, host));
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!(%status, "worker process exited"),
                Err(e) => warn!(error = %e, "failed to await worker process"),
            }
        });

        Ok(Box::new(PipePort { tx }))
    }
}

/// Outbound port over a byte pipe. Frame contents are serialized, so the
/// transfer list has nothing to move here.
struct PipePort {
    tx: mpsc::UnboundedSender<Frame>,
}

impl MessagePort for PipePort {
    fn post(&self, frame: Frame, _transfer: TransferList) -> Result<(), PortError> {
        self.tx.send(frame).map_err(|_| PortError::Closed)
    }
}

async fn write_frames<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Frame>,
) {
    while let Some(outbound) = rx.recv().await {
        let buf = match frame::to_bytes(&outbound) {
            Ok(buf) => buf,
            Err(e) => {
                error!(error = %e, tag = outbound.tag(), "dropping unencodable frame");
                continue;
            }
        };
        if let Err(e) = writer.write_all(&buf).await {
            warn!(error = %e, "frame channel write failed; stopping");
            break;
        }
        if let Err(e) = writer.flush().await {
            warn!(error = %e, "frame channel flush failed; stopping");
            break;
        }
    }
}

async fn read_frames<R: AsyncRead + Unpin>(mut reader: R, sink: Box<dyn MessagePort>) {
    loop {
        let mut prefix = [0u8; LENGTH_PREFIX];
        if reader.read_exact(&mut prefix).await.is_err() {
            debug!("frame channel closed");
            break;
        }

        let len = u32::from_le_bytes(prefix) as usize;
        if len > MAX_FRAME_BYTES {
            error!(len, "oversized frame on channel; stopping");
            break;
        }

        let mut body = vec![0u8; len];
        if let Err(e) = reader.read_exact(&mut body).await {
            warn!(error = %e, "frame body truncated; stopping");
            break;
        }

        match frame::decode_body(&body) {
            Ok(inbound) => {
                if sink.post(inbound, Vec::new()).is_err() {
                    debug!("inbound sink closed; stopping");
                    break;
                }
            }
            // A bad frame is dropped; the channel stays up.
            Err(e) => error!(error = %e, "dropping malformed frame"),
        }
    }
}

/// Serve this process as a worker over its stdio pipes. Returns when the
/// host closes the channel.
pub async fn worker_main(config: SystemConfig) {
    info!("worker process starting");

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(write_frames(tokio::io::stdout(), rx));

    let system = ActorSystem::hosted(config, Box::new(PipePort { tx }));
    let sink = Box::new(InboxPort {
        tx: system.inbound_sender(),
        from: Peer::Host,
    });
    read_frames(tokio::io::stdin(), sink).await;

    info!("host channel closed; worker exiting");
    system.shutdown();
}
