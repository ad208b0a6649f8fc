//! # Transceiver
//!
//! Correlates outgoing commands with the printer's asynchronous replies.
//!
//! ## Exchange Model
//!
//! The protocol is strictly half-duplex from the host's point of view: one
//! request goes out, then the host polls until the matching response
//! arrives. Only one exchange is ever in flight, which the `&mut self`
//! receivers enforce.
//!
//! ```text
//!  host                               printer
//!   │ ── SET_LABEL_TYPE (35) ──────────▶ │
//!   │                                    │
//!   │   poll 1: (nothing)                │
//!   │   sleep 100ms                      │
//!   │ ◀──────────────── ACK (35+16=51) ─ │
//!   │   poll 2: match, done              │
//! ```
//!
//! ## Matching Rules
//!
//! For each poll, the packets reassemblable from the link are collected,
//! up to the end of the first short read. Then, in order:
//!
//! 1. If any packet carries an error code (219 or 0) the exchange fails
//!    with `DeviceRejected`, even if a matching packet sits in the same batch.
//! 2. The first packet whose type equals the expected response is returned.
//!    Anything else in the batch is dropped.
//! 3. Otherwise sleep for the policy's delay and poll again.
//!
//! A corrupt frame ends the current poll and consumes one round; it does
//! not abort the exchange. After `max_rounds` polls the exchange fails with
//! `Timeout`.

use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::PrinterLink;
use crate::error::ProtocolError;
use crate::protocol::codes::{Command, code_name, rejection_for};
use crate::protocol::packet::Packet;
use crate::protocol::stream::Reassembler;

/// Bounded polling policy for one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of polls before giving up
    pub max_rounds: u32,
    /// Pause between polls
    pub delay: Duration,
}

impl RetryPolicy {
    /// Six polls, 100ms apart: the budget for ordinary commands.
    pub const DEFAULT: Self = Self::new(6, Duration::from_millis(100));

    /// 300 polls, 100ms apart: waiting for a page to come out of the printer.
    pub const PAGE_DONE: Self = Self::new(300, Duration::from_millis(100));

    pub const fn new(max_rounds: u32, delay: Duration) -> Self {
        Self { max_rounds, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Source of the pauses between polls.
///
/// Swapping in a recording clock lets tests run retry loops in virtual time.
pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

/// Real time: `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Clock that only records requested sleeps.
#[derive(Debug, Default, Clone)]
pub struct VirtualClock {
    sleeps: Vec<Duration>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }

    /// Total virtual time elapsed.
    pub fn elapsed(&self) -> Duration {
        self.sleeps.iter().sum()
    }
}

impl Clock for VirtualClock {
    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
    }
}

/// The one exchange currently awaiting a response.
#[derive(Debug, Clone, Copy)]
struct PendingExchange {
    expected_type: u8,
    retries_remaining: u32,
}

/// # Transceiver
///
/// Owns the link and the session's [`Reassembler`] and runs exchanges over
/// them.
///
/// ## Example
///
/// ```
/// use niimbot::protocol::packet::Packet;
/// use niimbot::transport::{ScriptedLink, Transceiver};
/// use niimbot::transport::transceiver::VirtualClock;
///
/// let link = ScriptedLink::new()
///     .silence()
///     .respond(&Packet::new(51, vec![1])?);
/// let mut transceiver = Transceiver::with_clock(link, VirtualClock::new());
///
/// let ack = transceiver.send_and_wait(35, &[1], 16)?;
/// assert_eq!(ack.payload(), &[1]);
/// assert_eq!(transceiver.clock().sleeps().len(), 1);
/// # Ok::<(), niimbot::ProtocolError>(())
/// ```
#[derive(Debug)]
pub struct Transceiver<L, C = SystemClock> {
    link: L,
    reassembler: Reassembler,
    clock: C,
    policy: RetryPolicy,
}

impl<L: PrinterLink> Transceiver<L> {
    /// Transceiver sleeping in real time with the default retry policy.
    pub fn new(link: L) -> Self {
        Self::with_clock(link, SystemClock)
    }
}

impl<L: PrinterLink, C: Clock> Transceiver<L, C> {
    pub fn with_clock(link: L, clock: C) -> Self {
        Self {
            link,
            reassembler: Reassembler::new(),
            clock,
            policy: RetryPolicy::DEFAULT,
        }
    }

    /// Replace the retry policy used by `send_and_wait` and `send_block_and_wait`.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Sleep on the transceiver's clock.
    pub fn pause(&mut self, duration: Duration) {
        self.clock.sleep(duration);
    }

    /// End the session: drop buffered bytes and hand back the link.
    pub fn into_inner(mut self) -> L {
        self.reassembler.reset();
        self.link
    }

    /// Send one packet and wait for the response of type
    /// `request_type + response_offset`.
    ///
    /// ## Errors
    ///
    /// - `PayloadTooLarge` if `payload` exceeds 255 bytes
    /// - `DeviceRejected` if the printer answers with an error code
    /// - `Timeout` if no matching response arrives within the policy
    pub fn send_and_wait(
        &mut self,
        request_type: u8,
        payload: &[u8],
        response_offset: u8,
    ) -> Result<Packet, ProtocolError> {
        let packet = Packet::new(request_type, payload.to_vec())?;
        let expected = request_type.wrapping_add(response_offset);
        debug!(
            request = code_name(request_type),
            code = request_type,
            expected,
            "transceive"
        );

        self.write_packet(&packet)?;
        self.await_response(expected, true, self.policy)
    }

    /// [`send_and_wait`](Self::send_and_wait) for a profile [`Command`].
    pub fn transceive(&mut self, command: Command, payload: &[u8]) -> Result<Packet, ProtocolError> {
        self.send_and_wait(command.code, payload, command.response_offset)
    }

    /// Send an ordered burst of packets, then wait once for the response of
    /// type `confirmation_type + response_offset`.
    pub fn send_block_and_wait(
        &mut self,
        confirmation_type: u8,
        packets: &[Packet],
        response_offset: u8,
    ) -> Result<Packet, ProtocolError> {
        let expected = confirmation_type.wrapping_add(response_offset);
        debug!(packets = packets.len(), expected, "transceive block");

        for packet in packets {
            self.write_packet(packet)?;
        }
        debug!("block sent");

        self.await_response(expected, true, self.policy)
    }

    /// Wait for an unsolicited packet of type `code` without sending anything.
    ///
    /// Error-coded packets are not treated as rejections here: no command is
    /// outstanding that they could refer to.
    pub fn wait_for_code(&mut self, code: u8, policy: RetryPolicy) -> Result<Packet, ProtocolError> {
        debug!(awaiting = code_name(code), code, "wait for code");
        self.await_response(code, false, policy)
    }

    fn write_packet(&mut self, packet: &Packet) -> Result<(), ProtocolError> {
        let frame = packet.encode();
        trace!(%packet, frame = ?frame, "sending");
        self.link.send(&frame)
    }

    fn await_response(
        &mut self,
        expected_type: u8,
        honor_rejections: bool,
        policy: RetryPolicy,
    ) -> Result<Packet, ProtocolError> {
        let mut exchange = PendingExchange {
            expected_type,
            retries_remaining: policy.max_rounds,
        };

        while exchange.retries_remaining > 0 {
            exchange.retries_remaining -= 1;

            match self.reassembler.drain(&mut self.link) {
                Ok(batch) => {
                    if honor_rejections {
                        if let Some(kind) = batch.iter().find_map(|p| rejection_for(p.kind())) {
                            warn!(expected = exchange.expected_type, %kind, "device rejected command");
                            return Err(ProtocolError::DeviceRejected(kind));
                        }
                    }
                    if let Some(found) = batch.into_iter().find(|p| p.kind() == exchange.expected_type) {
                        trace!(packet = %found, "matched response");
                        return Ok(found);
                    }
                }
                Err(e) if e.is_framing() => {
                    warn!(error = %e, remaining = exchange.retries_remaining, "corrupt read, retrying");
                }
                Err(e) => return Err(e),
            }

            if exchange.retries_remaining > 0 {
                self.clock.sleep(policy.delay);
            }
        }

        Err(ProtocolError::Timeout {
            code: exchange.expected_type,
            rounds: policy.max_rounds,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
