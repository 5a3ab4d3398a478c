//! Length-prefixed packet framing over a byte stream
//!
//! Every frame is a 4-byte big-endian payload length followed by the
//! bincode-encoded [`Packet`]. Reads always consume exactly one frame, so
//! payload size is independent of any socket buffer size.

use crate::Packet;
use bincode::{deserialize, serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single payload; larger length headers are rejected
/// before any allocation happens.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed payload: {0}")]
    Codec(#[from] bincode::Error),
    #[error("frame of {0} bytes exceeds the {} byte limit", MAX_FRAME_LEN)]
    FrameTooLarge(usize),
    #[error("unexpected {0} packet")]
    UnexpectedPacket(&'static str),
    #[error("server rejected the connection: {0}")]
    Rejected(String),
    #[error("packet tag {0} is not accepted from a client")]
    NotFromClient(u32),
}

/// Serializes a packet into a complete frame, header included.
pub fn encode_frame(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let payload = serialize(packet)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Writes an already encoded frame and flushes.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(packet)?;
    write_frame(writer, &frame).await
}

/// Reads exactly one frame and decodes it.
///
/// A clean end of stream before the header yields
/// [`ProtocolError::ConnectionClosed`]; a stream that ends mid-frame is an
/// I/O error.
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let payload = read_payload(reader).await?;
    Ok(deserialize(&payload)?)
}

/// Reads one frame sent by a client.
///
/// Only `Connect`, `Position` and `PositionMap` are decoded. Any other tag is
/// refused before the body is looked at, so a client can never make the
/// server build a maze or chunk out of its bytes.
pub async fn read_client_packet<R>(reader: &mut R) -> Result<Packet, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let payload = read_payload(reader).await?;
    let tag: u32 = deserialize(&payload)?;
    if !Packet::CLIENT_TAGS.contains(&tag) {
        return Err(ProtocolError::NotFromClient(tag));
    }
    Ok(deserialize(&payload)?)
}

async fn read_payload<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    };

    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CellPos, Chunk, Maze, WallType};
    use std::collections::HashMap;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_packet_survives_stream() {
        let (mut a, mut b) = duplex(1024);

        let packet = Packet::Position {
            position: CellPos::new(4, 9),
        };
        write_packet(&mut a, &packet).await.unwrap();

        let received = read_packet(&mut b).await.unwrap();
        assert_eq!(received, packet);
    }

    #[tokio::test]
    async fn test_large_snapshot_is_not_truncated() {
        // Far larger than any single socket read buffer
        let maze = Maze::filled(400, 400, WallType::Vertical);
        let mut positions = HashMap::new();
        positions.insert("p".to_string(), CellPos::new(1, 1));
        let packet = Packet::Snapshot { positions, maze };

        let (mut a, mut b) = duplex(4096);
        let expected = packet.clone();
        let writer = tokio::spawn(async move { write_packet(&mut a, &packet).await });

        let received = read_packet(&mut b).await.unwrap();
        writer.await.unwrap().unwrap();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_consecutive_frames_stay_separate() {
        let (mut a, mut b) = duplex(4096);
        let first = Packet::Connect {
            identity: "alpha".to_string(),
        };
        let second = Packet::Chunk {
            chunk: Chunk {
                origin: CellPos::new(0, 0),
                rows: vec![vec![WallType::None, WallType::Horizontal]],
            },
        };

        write_packet(&mut a, &first).await.unwrap();
        write_packet(&mut a, &second).await.unwrap();

        assert_eq!(read_packet(&mut b).await.unwrap(), first);
        assert_eq!(read_packet(&mut b).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_clean_close_reports_connection_closed() {
        let (a, mut b) = duplex(64);
        drop(a);

        match read_packet(&mut b).await {
            Err(ProtocolError::ConnectionClosed) => {}
            other => panic!("expected ConnectionClosed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_truncated_payload_is_io_error() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&10u32.to_be_bytes()).await.unwrap();
        a.write_all(&[1, 2, 3]).await.unwrap();
        drop(a);

        match read_packet(&mut b).await {
            Err(ProtocolError::Io(_)) => {}
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_header_rejected() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

        match read_packet(&mut b).await {
            Err(ProtocolError::FrameTooLarge(len)) => assert_eq!(len, u32::MAX as usize),
            other => panic!("expected FrameTooLarge, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_payload_is_codec_error() {
        let (mut a, mut b) = duplex(64);
        let garbage = [0xFFu8; 6];
        a.write_all(&(garbage.len() as u32).to_be_bytes())
            .await
            .unwrap();
        a.write_all(&garbage).await.unwrap();

        match read_packet(&mut b).await {
            Err(ProtocolError::Codec(_)) => {}
            other => panic!("expected Codec error, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_frame_header_matches_payload() {
        let packet = Packet::Spawned {
            position: CellPos::new(2, 3),
        };
        let frame = encode_frame(&packet).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;

        assert_eq!(len, frame.len() - HEADER_LEN);
        let decoded: Packet = bincode::deserialize(&frame[HEADER_LEN..]).unwrap();
        assert_eq!(decoded, packet);
    }

    #[tokio::test]
    async fn test_frame_split_across_reads() {
        let packet = Packet::PlayerLeft {
            identity: "walker".to_string(),
        };
        let frame = encode_frame(&packet).unwrap();
        let (head, tail) = frame.split_at(HEADER_LEN + 2);

        let mut mock = tokio_test::io::Builder::new()
            .read(&head[..2])
            .read(&head[2..])
            .read(tail)
            .build();

        assert_eq!(read_packet(&mut mock).await.unwrap(), packet);
    }

    #[tokio::test]
    async fn test_client_reader_accepts_client_packets() {
        let (mut a, mut b) = duplex(1024);
        let sent = [
            Packet::Connect {
                identity: "c".to_string(),
            },
            Packet::Position {
                position: CellPos::new(1, 2),
            },
            Packet::PositionMap {
                positions: HashMap::from([("c".to_string(), CellPos::new(3, 4))]),
            },
        ];
        for packet in &sent {
            write_packet(&mut a, packet).await.unwrap();
        }
        for packet in &sent {
            assert_eq!(&read_client_packet(&mut b).await.unwrap(), packet);
        }
    }

    #[tokio::test]
    async fn test_client_reader_refuses_forged_snapshot_by_tag() {
        #[derive(serde::Serialize)]
        enum ForgedPacket {
            _Connect,
            _Position,
            _PositionMap,
            _Spawned,
            _Chunk,
            Snapshot {
                positions: HashMap<String, CellPos>,
                maze: (usize, usize, Vec<WallType>),
            },
        }

        let payload = bincode::serialize(&ForgedPacket::Snapshot {
            positions: HashMap::new(),
            maze: (usize::MAX / 2 + 1, 2, Vec::new()),
        })
        .unwrap();

        let (mut a, mut b) = duplex(1024);
        a.write_all(&(payload.len() as u32).to_be_bytes())
            .await
            .unwrap();
        a.write_all(&payload).await.unwrap();

        match read_client_packet(&mut b).await {
            Err(ProtocolError::NotFromClient(tag)) => assert_eq!(tag, 5),
            other => panic!("expected NotFromClient, got {:?}", other),
        }
    }

    #[test]
    fn test_write_packet_emits_one_flushed_frame() {
        let packet = Packet::Disconnected {
            reason: "bye".to_string(),
        };
        let frame = encode_frame(&packet).unwrap();
        let mut mock = tokio_test::io::Builder::new().write(&frame).build();

        tokio_test::block_on(write_packet(&mut mock, &packet)).unwrap();
    }
}
