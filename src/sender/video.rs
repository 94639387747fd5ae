use crate::packet::{merge_sorted, Packet, Packets, RtpHeader};
use crate::processor::{ListenerRef, PacketProcessor, ProcessorHandle, ProcessorInfo, ProcessorKind};
use crate::sender::error::{SenderError, SenderResult};
use crate::sender::{Feedback, PacketSender};

/// Frames are sent as one logical packet, clamped to this size
pub const DEFAULT_MAX_PAYLOAD_SIZE_BYTES: u32 = 65_535;
const TIMESTAMP_BASE: u32 = 0xff80_ff00;
const FIRST_SEQUENCE_NUMBER: u16 = 0xf000;
const RTP_CLOCK_KHZ: f64 = 90.0;
const ADAPTIVE_FEEDBACK_INTERVAL_MS: i64 = 100;

/// Periodic synthetic video source with a fixed frame rate and bitrate
#[derive(Debug)]
pub struct VideoSender {
    handle: ProcessorHandle,
    max_payload_size_bytes: u32,
    fps: f32,
    frame_period_ms: f64,
    next_frame_ms: f64,
    now_ms: f64,
    bytes_per_second: u32,
    frame_size_bytes: u32,
    prototype_header: RtpHeader,
}

impl VideoSender {
    /// `first_frame_offset` is a fraction of the frame period in [0, 1) and
    /// desynchronizes concurrent senders.
    pub fn new(
        listener: Option<ListenerRef>,
        fps: f32,
        kbps: u32,
        ssrc: u32,
        first_frame_offset: f32,
    ) -> SenderResult<Self> {
        Self::with_name(listener, "VideoSender", fps, kbps, ssrc, first_frame_offset)
    }

    fn with_name(
        listener: Option<ListenerRef>,
        name: &'static str,
        fps: f32,
        kbps: u32,
        ssrc: u32,
        first_frame_offset: f32,
    ) -> SenderResult<Self> {
        if !(fps > 0.0 && fps.is_finite()) {
            return Err(SenderError::InvalidFrameRate(fps));
        }
        if !(0.0..1.0).contains(&first_frame_offset) {
            return Err(SenderError::InvalidFrameOffset(first_frame_offset));
        }

        let frame_period_ms = 1000.0 / f64::from(fps);
        let bytes_per_second = bytes_per_second(kbps);
        let sender = Self {
            handle: ProcessorHandle::new(listener, ProcessorKind::Sender, name),
            max_payload_size_bytes: DEFAULT_MAX_PAYLOAD_SIZE_BYTES,
            fps,
            frame_period_ms,
            next_frame_ms: frame_period_ms * f64::from(first_frame_offset),
            now_ms: 0.0,
            bytes_per_second,
            frame_size_bytes: frame_size(bytes_per_second, fps),
            prototype_header: RtpHeader {
                ssrc,
                sequence_number: FIRST_SEQUENCE_NUMBER,
                ..Default::default()
            },
        };
        sender.warn_if_clamped();
        Ok(sender)
    }

    pub fn max_payload_size_bytes(&self) -> u32 {
        self.max_payload_size_bytes
    }

    pub fn set_max_payload_size_bytes(&mut self, max_payload_size_bytes: u32) {
        self.max_payload_size_bytes = max_payload_size_bytes.max(1);
        self.warn_if_clamped();
    }

    pub fn bytes_per_second(&self) -> u32 {
        self.bytes_per_second
    }

    pub fn frame_size_bytes(&self) -> u32 {
        self.frame_size_bytes
    }

    /// Retarget the bitrate; the frame rate is kept
    pub fn set_rate_kbps(&mut self, kbps: u32) {
        self.bytes_per_second = bytes_per_second(kbps);
        self.frame_size_bytes = frame_size(self.bytes_per_second, self.fps);
        tracing::debug!(
            ssrc = self.prototype_header.ssrc,
            kbps,
            frame_size_bytes = self.frame_size_bytes,
            "video sender rate changed"
        );
        self.warn_if_clamped();
    }

    fn warn_if_clamped(&self) {
        if self.frame_size_bytes > self.max_payload_size_bytes {
            tracing::warn!(
                ssrc = self.prototype_header.ssrc,
                frame_size_bytes = self.frame_size_bytes,
                max_payload_size_bytes = self.max_payload_size_bytes,
                "frames will be clamped to max payload size"
            );
        }
    }

    fn next_frame_header(&mut self) -> RtpHeader {
        let header = &mut self.prototype_header;
        header.sequence_number = header.sequence_number.wrapping_add(1);
        header.timestamp = TIMESTAMP_BASE.wrapping_add((self.next_frame_ms * RTP_CLOCK_KHZ) as u32);
        let abs_send_time = ((self.next_frame_ms * f64::from(1u32 << 18)) as i64 + 500) / 1000;
        header.absolute_send_time =
            TIMESTAMP_BASE.wrapping_add(abs_send_time as u32) & 0x00ff_ffff;
        header.transmission_time_offset = 0;
        *header
    }
}

fn bytes_per_second(kbps: u32) -> u32 {
    ((1000 * u64::from(kbps)) / 8).min(u64::from(u32::MAX)) as u32
}

fn frame_size(bytes_per_second: u32, fps: f32) -> u32 {
    (f64::from(bytes_per_second) / f64::from(fps)) as u32
}

impl PacketProcessor for VideoSender {
    fn run_for(&mut self, time_ms: i64, in_out: &mut Packets) {
        self.now_ms += time_ms as f64;

        let mut new_packets = Packets::new();
        while self.now_ms >= self.next_frame_ms {
            // Nothing to send at zero rate; the frame slot still passes
            if self.frame_size_bytes == 0 {
                self.next_frame_ms += self.frame_period_ms;
                continue;
            }
            let header = self.next_frame_header();
            let send_time_us = (self.next_frame_ms * 1000.0) as i64;
            let payload_size = self.frame_size_bytes.min(self.max_payload_size_bytes);
            new_packets.push_back(Packet::new(send_time_us, payload_size, header));
            self.next_frame_ms += self.frame_period_ms;
        }

        merge_sorted(in_out, new_packets);
    }

    fn info(&self) -> &ProcessorInfo {
        self.handle.info()
    }
}

impl PacketSender for VideoSender {
    fn capacity_kbps(&self) -> u32 {
        ((u64::from(self.bytes_per_second) * 8) / 1000) as u32
    }

    fn ssrc(&self) -> Option<u32> {
        Some(self.prototype_header.ssrc)
    }
}

/// Video source that follows the bandwidth estimate it is given
#[derive(Debug)]
pub struct AdaptiveVideoSender {
    inner: VideoSender,
}

impl AdaptiveVideoSender {
    pub fn new(
        listener: Option<ListenerRef>,
        fps: f32,
        kbps: u32,
        ssrc: u32,
        first_frame_offset: f32,
    ) -> SenderResult<Self> {
        let inner = VideoSender::with_name(
            listener,
            "AdaptiveVideoSender",
            fps,
            kbps,
            ssrc,
            first_frame_offset,
        )?;
        Ok(Self { inner })
    }

    pub fn video_sender(&self) -> &VideoSender {
        &self.inner
    }
}

impl PacketProcessor for AdaptiveVideoSender {
    fn run_for(&mut self, time_ms: i64, in_out: &mut Packets) {
        self.inner.run_for(time_ms, in_out);
    }

    fn info(&self) -> &ProcessorInfo {
        self.inner.info()
    }
}

impl PacketSender for AdaptiveVideoSender {
    fn capacity_kbps(&self) -> u32 {
        self.inner.capacity_kbps()
    }

    fn ssrc(&self) -> Option<u32> {
        self.inner.ssrc()
    }

    fn feedback_interval_ms(&self) -> i64 {
        ADAPTIVE_FEEDBACK_INTERVAL_MS
    }

    fn give_feedback(&mut self, feedback: &Feedback) {
        // Round to the nearest kbps so a steady estimate does not drift down
        let kbps = (u64::from(feedback.estimated_bps) + 500) / 1000;
        self.inner.set_rate_kbps(kbps as u32);
    }
}
