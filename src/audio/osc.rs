use anyhow::Result;
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

use super::{Cue, CueScheduler};
use crate::error::SessionError;
use crate::session::SessionEvent;

/// キューのOSCメッセージを構築
/// 引数: bus, gain, preset, at, pitch, duration
pub fn build_cue_message(cue: &Cue) -> OscMessage {
    OscMessage {
        addr: "/cue".to_string(),
        args: vec![
            OscType::String(cue.bus.name().to_string()),
            OscType::Float(cue.gain),
            OscType::String(cue.preset.to_string()),
            OscType::Double(cue.at),
            OscType::Int(cue.pitch as i32),
            OscType::Double(cue.duration),
        ],
    }
}

/// セッションイベントのOSCメッセージを構築
pub fn build_event_message(event: &SessionEvent) -> OscMessage {
    let (addr, args) = match event {
        SessionEvent::PoseStarted { id } => ("/pose/started", vec![OscType::String(id.clone())]),
        SessionEvent::PoseAchieved { id, overall_score } => (
            "/pose/achieved",
            vec![OscType::String(id.clone()), OscType::Float(*overall_score)],
        ),
        SessionEvent::PoseFailed { id, overall_score } => (
            "/pose/failed",
            vec![OscType::String(id.clone()), OscType::Float(*overall_score)],
        ),
        SessionEvent::Finished => ("/finished", Vec::new()),
    };
    OscMessage {
        addr: addr.to_string(),
        args,
    }
}

pub fn encode_osc_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(msg.clone());
    let encoded = encoder::encode(&packet)?;
    Ok(encoded)
}

/// キュー・イベント共通のUDP送信
struct OscSender {
    socket: UdpSocket,
    target_addr: String,
}

impl OscSender {
    fn new(target_addr: &str) -> Result<Self, SessionError> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|e| {
            SessionError::Initialization(format!("cannot open OSC socket for {}: {}", target_addr, e))
        })?;
        Ok(Self {
            socket,
            target_addr: target_addr.to_string(),
        })
    }

    fn send(&self, msg: &OscMessage) -> Result<()> {
        let data = encode_osc_message(msg)?;
        self.socket.send_to(&data, &self.target_addr)?;
        Ok(())
    }
}

/// OSCでサンプラーへキューを送信
pub struct OscCueScheduler {
    sender: OscSender,
}

impl OscCueScheduler {
    pub fn new(target_addr: &str) -> Result<Self, SessionError> {
        Ok(Self {
            sender: OscSender::new(target_addr)?,
        })
    }
}

impl CueScheduler for OscCueScheduler {
    fn schedule(&mut self, cue: &Cue) {
        // 送りっぱなし。失敗は1音抜けるだけ
        if let Err(e) = self.sender.send(&build_cue_message(cue)) {
            tracing::debug!("cue dropped ({}): {}", self.sender.target_addr, e);
        }
    }
}

/// 表示側へセッションイベントを送信
pub struct OscEventPublisher {
    sender: OscSender,
}

impl OscEventPublisher {
    pub fn new(target_addr: &str) -> Result<Self, SessionError> {
        Ok(Self {
            sender: OscSender::new(target_addr)?,
        })
    }

    pub fn publish(&self, event: &SessionEvent) -> Result<()> {
        self.sender.send(&build_event_message(event))
    }
}
