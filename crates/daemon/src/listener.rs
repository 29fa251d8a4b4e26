// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection I/O tasks.
//!
//! Each accepted socket gets a reader task (lines and OOB frames →
//! events) and a writer task (outbound queue → socket). Neither task
//! touches world state; the engine loop owns all of that.

use loam_core::{oob, ConnectionId, Event};
use loam_engine::OutMsg;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Longest accepted input frame; anything beyond is dropped to keep a
/// hostile peer from ballooning memory.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Spawn the reader and writer tasks for one accepted socket.
pub fn spawn_io(
    conn: ConnectionId,
    stream: TcpStream,
    out_rx: mpsc::UnboundedReceiver<OutMsg>,
    event_tx: mpsc::UnboundedSender<Event>,
) {
    let (read_half, write_half) = stream.into_split();
    tokio::spawn(read_loop(conn, read_half, event_tx));
    tokio::spawn(write_loop(conn, write_half, out_rx));
}

async fn read_loop(
    conn: ConnectionId,
    read_half: tokio::net::tcp::OwnedReadHalf,
    event_tx: mpsc::UnboundedSender<Event>,
) {
    let mut reader = BufReader::new(read_half);
    let mut buf = String::new();

    loop {
        buf.clear();
        match reader.read_line(&mut buf).await {
            Ok(0) => break,
            Ok(n) if n > MAX_LINE_BYTES => {
                debug!(%conn, bytes = n, "oversized frame dropped");
                continue;
            }
            Ok(_) => {
                let frame = buf.trim_end_matches(['\r', '\n']);
                let event = match oob::parse_frame(frame) {
                    Some(Ok(envelope)) => Event::Oob { conn, envelope },
                    Some(Err(e)) => Event::OobInvalid {
                        conn,
                        error: e.to_string(),
                    },
                    None => Event::Line {
                        conn,
                        line: frame.to_string(),
                    },
                };
                if event_tx.send(event).is_err() {
                    break; // engine loop is gone
                }
            }
            Err(e) => {
                debug!(%conn, error = %e, "read failed");
                break;
            }
        }
    }

    trace!(%conn, "reader done");
    let _ = event_tx.send(Event::Closed { conn });
}

async fn write_loop(
    conn: ConnectionId,
    mut write_half: tokio::net::tcp::OwnedWriteHalf,
    mut out_rx: mpsc::UnboundedReceiver<OutMsg>,
) {
    while let Some(msg) = out_rx.recv().await {
        let payload = match msg {
            OutMsg::Line(line) => format!("{line}\r\n"),
            OutMsg::Oob(frame) => format!("{frame}\r\n"),
            OutMsg::Close => break,
        };
        if write_half.write_all(payload.as_bytes()).await.is_err() {
            break;
        }
    }
    let _ = write_half.shutdown().await;
    trace!(%conn, "writer done");
}
