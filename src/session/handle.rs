// Session main loop

use std::sync::{Arc, Mutex};

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::chunks::{
    ChunkHeader, DemuxedEvent, Demuxer, Muxer, SimpleChunkProducer, UserControlEvent,
    RTMP_TYPE_ACKNOWLEDGEMENT,
};
use crate::handshake::{HandshakeRole, Handshaker};
use crate::log::Logger;
use crate::proto::{dispatch_message, AckController, ProtocolMessage};
use crate::server::{AppResolver, RtmpServerConfiguration};
use crate::store::StreamStore;
use crate::vecbuf::VecBuf;
use crate::{log_debug, log_info, log_warning};

use super::cleanup::do_session_cleanup;
use super::context::SessionContext;
use super::handle_command::handle_command_message;
use super::handle_data::{handle_data_message, handle_meta_message};
use super::ping::send_pong;

const READ_BUFFER_SIZE: usize = 4096;

/// Runs one server session over the given transport halves:
/// handshake, then the chunk loop until the connection goes away.
pub async fn handle_session_connection<TR, TW>(
    logger: Arc<Logger>,
    config: Arc<RtmpServerConfiguration>,
    store: Arc<StreamStore>,
    resolver: Arc<AppResolver>,
    session_id: u64,
    mut read_stream: TR,
    write_stream: TW,
) where
    TR: AsyncRead + Unpin + Send,
    TW: AsyncWrite + Unpin + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel::<Bytes>();

    let writer = tokio::spawn(run_session_writer(write_stream, receiver, logger.clone()));

    let muxer = Arc::new(Mutex::new(Muxer::new(Box::new(SimpleChunkProducer::new(
        sender.clone(),
    )))));

    let mut ctx = SessionContext::new(
        session_id,
        logger.clone(),
        config.clone(),
        store,
        resolver,
        muxer,
    );

    // Handshake phase

    let mut handshaker = if config.crypto_handshake {
        Handshaker::new_crypto(HandshakeRole::Server, ctx.epoch)
    } else {
        Handshaker::new_plain(HandshakeRole::Server, ctx.epoch)
    };

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut outcome = None;

    while outcome.is_none() {
        let n = match read_stream.read(&mut buf).await {
            Ok(0) => {
                if config.log_requests {
                    log_debug!(logger, "Connection closed during handshake");
                }
                finish_session(ctx, sender, writer, "connection closed").await;
                return;
            }
            Ok(n) => n,
            Err(e) => {
                if config.log_requests {
                    log_debug!(logger, format!("Read error during handshake: {}", e));
                }
                finish_session(ctx, sender, writer, "read error").await;
                return;
            }
        };

        match handshaker.data_received(&buf[..n]) {
            Ok((out, progress)) => {
                if !out.is_empty() {
                    let _ = sender.send(Bytes::from(out));
                }
                outcome = progress;
            }
            Err(e) => {
                if config.log_requests {
                    log_info!(logger, format!("Handshake failed: {}", e));
                }
                finish_session(ctx, sender, writer, "handshake failed").await;
                return;
            }
        }
    }

    if config.log_requests {
        if let Some(outcome) = outcome {
            log_debug!(
                logger,
                format!(
                    "Handshake done (round trip: {:.1} ms)",
                    outcome.round_trip * 1000.0
                )
            );
        }
    }

    // Chunk phase

    let mut demuxer = Demuxer::new();
    let mut ack = AckController::new();

    let leftover = handshaker.take_leftover().to_vec();

    if process_chunk_data(&mut ctx, &mut demuxer, &mut ack, &leftover).await {
        loop {
            let n = match read_stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    if config.log_requests {
                        log_debug!(logger, format!("Read error: {}", e));
                    }
                    break;
                }
            };

            if !process_chunk_data(&mut ctx, &mut demuxer, &mut ack, &buf[..n]).await {
                break;
            }
        }
    }

    finish_session(ctx, sender, writer, "connection closed").await;
}

// Cleans the session up and lets the writer drain its queue
async fn finish_session(
    mut ctx: SessionContext,
    sender: mpsc::UnboundedSender<Bytes>,
    writer: tokio::task::JoinHandle<()>,
    reason: &str,
) {
    do_session_cleanup(&mut ctx, reason);

    drop(ctx);
    drop(sender);

    let _ = writer.await;
}

async fn run_session_writer<TW: AsyncWrite + Unpin>(
    mut write_stream: TW,
    mut receiver: mpsc::UnboundedReceiver<Bytes>,
    logger: Arc<Logger>,
) {
    while let Some(piece) = receiver.recv().await {
        if let Err(e) = write_stream.write_all(&piece).await {
            log_debug!(logger, format!("Write error: {}", e));
            break;
        }

        if receiver.is_empty() {
            let _ = write_stream.flush().await;
        }
    }

    let _ = write_stream.shutdown().await;
}

// Accounts, demuxes and dispatches one batch of received bytes.
// Returns false when the session must terminate.
async fn process_chunk_data(
    ctx: &mut SessionContext,
    demuxer: &mut Demuxer,
    ack: &mut AckController,
    data: &[u8],
) -> bool {
    if data.is_empty() {
        return true;
    }

    if let Some(sequence) = ack.bytes_received(data.len()) {
        send_ack(ctx, sequence);
    }

    let events = match demuxer.data_received(data) {
        Ok(events) => events,
        Err(e) => {
            let logger = &ctx.logger;
            log_info!(logger, format!("Chunk stream error: {}", e));
            return false;
        }
    };

    for event in events {
        if !handle_demuxed_event(ctx, ack, event).await {
            return false;
        }
    }

    true
}

async fn handle_demuxed_event(
    ctx: &mut SessionContext,
    ack: &mut AckController,
    event: DemuxedEvent,
) -> bool {
    let logger = ctx.logger.clone();

    match event {
        DemuxedEvent::Message { header, body } => match dispatch_message(header, body) {
            Ok(ProtocolMessage::Command { ts, ms_id, args }) => {
                handle_command_message(ctx, ts, ms_id, args).await
            }
            Ok(ProtocolMessage::Meta { ts, ms_id, args }) => {
                handle_meta_message(ctx, ts, ms_id, args)
            }
            Ok(ProtocolMessage::Data {
                msg_type,
                ts,
                ms_id,
                body,
            }) => handle_data_message(ctx, msg_type, ts, ms_id, body),
            Ok(ProtocolMessage::Unknown { header, .. }) => {
                log_debug!(
                    logger,
                    format!("Unknown message type: {}", header.msg_type)
                );
                true
            }
            Err(e) => {
                log_info!(logger, format!("Could not decode message: {}", e));
                false
            }
        },
        DemuxedEvent::SetChunkSize { size } => {
            log_debug!(logger, format!("Peer chunk size: {}", size));
            true
        }
        DemuxedEvent::AbortMessage { cs_id } => {
            log_debug!(logger, format!("Message aborted on chunk stream {}", cs_id));
            true
        }
        DemuxedEvent::Acknowledgement { sequence } => {
            log_debug!(logger, format!("Peer acknowledged {} bytes", sequence));
            true
        }
        DemuxedEvent::WindowSize { window_size } => {
            if let Some(sequence) = ack.set_window_size(window_size) {
                send_ack(ctx, sequence);
            }
            true
        }
        DemuxedEvent::SetPeerBandwidth { window_size, .. } => {
            log_debug!(logger, format!("Peer bandwidth: {}", window_size));
            true
        }
        DemuxedEvent::UserControl { header, event } => {
            handle_user_control(ctx, header, event);
            true
        }
        DemuxedEvent::ControlUnknown { header, .. } => {
            // undocumented control message, nothing to do with it
            log_warning!(
                logger,
                format!("Unknown control message type: {}", header.msg_type)
            );
            true
        }
    }
}

fn handle_user_control(ctx: &mut SessionContext, header: ChunkHeader, event: UserControlEvent) {
    match event {
        UserControlEvent::Ping { timestamp } => send_pong(ctx, timestamp),
        UserControlEvent::SetBufferLength { stream_id, length } => {
            if let Some(route) = ctx.routes.buffer_route(stream_id) {
                route(header.abs_time, length);
            }
        }
        other => {
            let logger = &ctx.logger;
            log_debug!(logger, format!("User control event: {:?}", other));
        }
    }
}

fn send_ack(ctx: &SessionContext, sequence: u32) {
    let mut body = [0u8; 4];
    BigEndian::write_u32(&mut body, sequence);

    ctx.send_message(0, RTMP_TYPE_ACKNOWLEDGEMENT, 0, VecBuf::from(body.to_vec()));
}

// Tests
