//! # Label Printing Session
//!
//! [`LabelPrinter`] drives one printer through the command sequence of a
//! print job, on top of a [`Transceiver`].
//!
//! ## Print Job Sequence
//!
//! ```text
//! SET_LABEL_TYPE ─▶ SET_LABEL_DENSITY ─▶ START_PRINT ─▶ ALLOW_PRINT_CLEAR
//!       ─▶ START_PAGE_PRINT ─▶ SET_DIMENSION ─▶ SET_QUANTITY
//!       ─▶ image lines + IMAGE_CONFIRM ─▶ END_PAGE_PRINT
//!       ─▶ wait for completion ─▶ END_PRINT
//! ```
//!
//! Completion is model specific:
//!
//! | Strategy | How the page counter is obtained |
//! |----------|----------------------------------|
//! | `PageDoneNotification` | unsolicited `PAGE_PRINT_DONE` packets, byte 1 |
//! | `StatusPolling` | `GET_PRINT_STATUS` replies, bytes 0-1 big-endian |
//!
//! Either way the wait is bounded by `max_status_polls`.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::PrinterModel;
use crate::error::ProtocolError;
use crate::protocol::codes::{Command, Completion, ProtocolProfile, code_name};
use crate::protocol::packet::{Packet, u16_be};
use crate::render::bitmap::Bitmap;
use crate::render::encoder::encode_line_packets;
use crate::transport::{Clock, PrinterLink, RetryPolicy, SystemClock, Transceiver};

/// Default bound on completion checks before giving up
pub const DEFAULT_MAX_STATUS_POLLS: u32 = 300;

/// Pause between `GET_PRINT_STATUS` polls
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parsed `GET_PRINT_STATUS` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrintStatus {
    /// Pages printed so far in this job
    pub page: u16,
    pub progress1: u8,
    pub progress2: u8,
}

impl PrintStatus {
    /// Parse a status payload: page(2, big-endian) progress1(1) progress2(1).
    pub fn parse(packet: &Packet) -> Result<Self, ProtocolError> {
        let p = require_payload(packet, 4)?;
        Ok(Self {
            page: u16::from_be_bytes([p[0], p[1]]),
            progress1: p[2],
            progress2: p[3],
        })
    }
}

/// The first `needed` payload bytes of `packet`, or `ShortResponse`.
fn require_payload(packet: &Packet, needed: usize) -> Result<&[u8], ProtocolError> {
    let payload = packet.payload();
    if payload.len() < needed {
        return Err(ProtocolError::ShortResponse {
            code: packet.kind(),
            needed,
            got: payload.len(),
        });
    }
    Ok(&payload[..needed])
}

/// # Label Printer
///
/// A session with one printer model over one link.
///
/// ## Example
///
/// ```no_run
/// use niimbot::printer::{LabelPrinter, PrinterModel};
/// use niimbot::render::binarize::load_bitmap;
/// use niimbot::transport::SerialTransport;
///
/// let port = SerialTransport::open("/dev/ttyACM0")?;
/// let mut printer = LabelPrinter::new(port, PrinterModel::D11);
/// let bitmap = load_bitmap("label.png")?;
/// printer.print_label(&bitmap, 1, 2, 1)?;
/// # Ok::<(), niimbot::ProtocolError>(())
/// ```
#[derive(Debug)]
pub struct LabelPrinter<L, C = SystemClock> {
    transceiver: Transceiver<L, C>,
    model: PrinterModel,
    max_status_polls: u32,
}

impl<L: PrinterLink> LabelPrinter<L> {
    pub fn new(link: L, model: PrinterModel) -> Self {
        Self::from_transceiver(Transceiver::new(link), model)
    }
}

impl<L: PrinterLink, C: Clock> LabelPrinter<L, C> {
    pub fn with_clock(link: L, model: PrinterModel, clock: C) -> Self {
        Self::from_transceiver(Transceiver::with_clock(link, clock), model)
    }

    pub fn from_transceiver(transceiver: Transceiver<L, C>, model: PrinterModel) -> Self {
        Self {
            transceiver,
            model,
            max_status_polls: DEFAULT_MAX_STATUS_POLLS,
        }
    }

    /// Bound the number of completion checks in [`wait_print_finish`](Self::wait_print_finish).
    pub fn with_max_status_polls(mut self, polls: u32) -> Self {
        self.max_status_polls = polls;
        self
    }

    pub fn model(&self) -> &PrinterModel {
        &self.model
    }

    pub fn transceiver(&self) -> &Transceiver<L, C> {
        &self.transceiver
    }

    pub fn transceiver_mut(&mut self) -> &mut Transceiver<L, C> {
        &mut self.transceiver
    }

    /// End the session and hand back the link.
    pub fn into_inner(self) -> L {
        self.transceiver.into_inner()
    }

    fn profile(&self) -> ProtocolProfile {
        self.model.profile
    }

    /// Send a command and read its one-byte acknowledgement.
    fn acknowledge(&mut self, command: Command, payload: &[u8]) -> Result<bool, ProtocolError> {
        let response = self.transceiver.transceive(command, payload)?;
        let ok = require_payload(&response, 1)?[0] != 0;
        debug!(command = code_name(command.code), ok, "acknowledged");
        Ok(ok)
    }

    pub fn set_label_type(&mut self, label_type: u8) -> Result<bool, ProtocolError> {
        self.model.validate_label_type(label_type)?;
        let command = self.profile().set_label_type;
        self.acknowledge(command, &[label_type])
    }

    pub fn set_label_density(&mut self, density: u8) -> Result<bool, ProtocolError> {
        self.model.validate_density(density)?;
        let command = self.profile().set_label_density;
        self.acknowledge(command, &[density])
    }

    pub fn start_print(&mut self) -> Result<bool, ProtocolError> {
        let command = self.profile().start_print;
        self.acknowledge(command, &[1])
    }

    pub fn end_print(&mut self) -> Result<bool, ProtocolError> {
        let command = self.profile().end_print;
        self.acknowledge(command, &[1])
    }

    pub fn start_page_print(&mut self) -> Result<bool, ProtocolError> {
        let command = self.profile().start_page_print;
        self.acknowledge(command, &[1])
    }

    pub fn end_page_print(&mut self) -> Result<bool, ProtocolError> {
        let command = self.profile().end_page_print;
        self.acknowledge(command, &[1])
    }

    pub fn allow_print_clear(&mut self) -> Result<bool, ProtocolError> {
        let command = self.profile().allow_print_clear;
        self.acknowledge(command, &[1])
    }

    /// Announce the page size. The payload carries height first, then width.
    pub fn set_dimension(&mut self, width: u16, height: u16) -> Result<bool, ProtocolError> {
        let mut payload = Vec::with_capacity(4);
        payload.extend_from_slice(&u16_be(height));
        payload.extend_from_slice(&u16_be(width));
        let command = self.profile().set_dimension;
        self.acknowledge(command, &payload)
    }

    pub fn set_quantity(&mut self, quantity: u16) -> Result<bool, ProtocolError> {
        let command = self.profile().set_quantity;
        self.acknowledge(command, &u16_be(quantity))
    }

    pub fn get_print_status(&mut self) -> Result<PrintStatus, ProtocolError> {
        let command = self.profile().get_print_status;
        let response = self.transceiver.transceive(command, &[1])?;
        let status = PrintStatus::parse(&response)?;
        debug!(
            page = status.page,
            progress1 = status.progress1,
            progress2 = status.progress2,
            "print status"
        );
        Ok(status)
    }

    /// Send the encoded image lines as one block and wait for the confirmation.
    pub fn send_image(&mut self, packets: &[Packet]) -> Result<bool, ProtocolError> {
        let confirm = self.profile().image_confirm;
        let response = self
            .transceiver
            .send_block_and_wait(confirm.code, packets, confirm.response_offset)?;
        Ok(require_payload(&response, 1)?[0] != 0)
    }

    /// Wait for the next unsolicited page-done packet and return its page number.
    pub fn wait_page_done(&mut self) -> Result<u16, ProtocolError> {
        let code = self.profile().page_print_done;
        let packet = self.transceiver.wait_for_code(code, RetryPolicy::PAGE_DONE)?;
        let page = require_payload(&packet, 2)?[1] as u16;
        debug!(page, "page done");
        Ok(page)
    }

    /// Block until the printer reports at least `quantity` pages.
    ///
    /// ## Errors
    ///
    /// `Timeout` once `max_status_polls` checks pass without reaching
    /// `quantity`, or whatever the underlying exchanges fail with.
    pub fn wait_print_finish(&mut self, quantity: u16) -> Result<(), ProtocolError> {
        let completion = self.profile().completion;
        for poll in 0..self.max_status_polls {
            let page = match completion {
                Completion::PageDoneNotification => self.wait_page_done()?,
                Completion::StatusPolling => self.get_print_status()?.page,
            };
            if page >= quantity {
                debug!(page, quantity, polls = poll + 1, "print finished");
                return Ok(());
            }
            debug!(page, quantity, "waiting for print to finish");
            if completion == Completion::StatusPolling && poll + 1 < self.max_status_polls {
                self.transceiver.pause(STATUS_POLL_INTERVAL);
            }
        }

        let code = match completion {
            Completion::PageDoneNotification => self.profile().page_print_done,
            Completion::StatusPolling => self.profile().get_print_status.response_code(),
        };
        Err(ProtocolError::Timeout {
            code,
            rounds: self.max_status_polls,
        })
    }

    /// Model-specific pause between setup commands.
    fn pace(&mut self) {
        let pause = self.model.command_pause();
        if !pause.is_zero() {
            self.transceiver.pause(pause);
        }
    }

    /// Run a complete print job for `bitmap`.
    ///
    /// All arguments and the image are validated against the model before
    /// anything is sent. A command the printer acknowledges with a zero
    /// byte is logged and the job continues.
    pub fn print_label(
        &mut self,
        bitmap: &Bitmap,
        label_type: u8,
        density: u8,
        quantity: u16,
    ) -> Result<(), ProtocolError> {
        self.model.validate_label_type(label_type)?;
        self.model.validate_density(density)?;
        if quantity == 0 {
            return Err(ProtocolError::InvalidArgument(
                "Quantity must be at least 1".to_string(),
            ));
        }
        self.model.validate_image(bitmap.width(), bitmap.height())?;

        let width = dimension(bitmap.width())?;
        let height = dimension(bitmap.height())?;
        let packets = encode_line_packets(bitmap)?;
        info!(
            model = self.model.name,
            width,
            height,
            packets = packets.len(),
            quantity,
            "printing label"
        );

        self.pace();
        check("set label type", self.set_label_type(label_type)?);
        self.pace();
        check("set label density", self.set_label_density(density)?);
        self.pace();
        check("start print", self.start_print()?);
        self.pace();
        check("allow print clear", self.allow_print_clear()?);
        self.pace();
        check("start page print", self.start_page_print()?);
        self.pace();
        check("set dimension", self.set_dimension(width, height)?);
        self.pace();
        check("set quantity", self.set_quantity(quantity)?);
        self.pace();
        check("send image", self.send_image(&packets)?);
        check("end page print", self.end_page_print()?);

        self.wait_print_finish(quantity)?;
        check("end print", self.end_print()?);

        info!(quantity, "printed");
        Ok(())
    }
}

fn dimension(value: usize) -> Result<u16, ProtocolError> {
    u16::try_from(value).map_err(|_| {
        ProtocolError::InvalidArgument(format!("Dimension {} does not fit in 16 bits", value))
    })
}

fn check(step: &str, acknowledged: bool) {
    if !acknowledged {
        warn!(step, "printer declined");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedLink;
    use crate::transport::transceiver::VirtualClock;
    use pretty_assertions::assert_eq;

    fn packet(kind: u8, payload: &[u8]) -> Packet {
        Packet::new(kind, payload.to_vec()).unwrap()
    }

    fn printer(link: ScriptedLink, model: PrinterModel) -> LabelPrinter<ScriptedLink, VirtualClock> {
        LabelPrinter::with_clock(link, model, VirtualClock::new())
    }

    #[test]
    fn test_set_label_type_ack() {
        let link = ScriptedLink::new().respond(&packet(51, &[1]));
        let mut p = printer(link, PrinterModel::D11);
        assert!(p.set_label_type(2).unwrap());

        let sent = p.into_inner().sent_packets().unwrap();
        assert_eq!(sent, vec![packet(35, &[2])]);
    }

    #[test]
    fn test_zero_ack_is_false() {
        let link = ScriptedLink::new().respond(&packet(2, &[0]));
        let mut p = printer(link, PrinterModel::D11);
        assert!(!p.start_print().unwrap());
    }

    #[test]
    fn test_empty_ack_is_short_response() {
        let link = ScriptedLink::new().respond(&packet(49, &[]));
        let mut p = printer(link, PrinterModel::D11);
        let err = p.set_label_density(2).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ShortResponse {
                code: 49,
                needed: 1,
                got: 0
            }
        ));
    }

    #[test]
    fn test_invalid_label_type_sends_nothing() {
        let mut p = printer(ScriptedLink::new(), PrinterModel::D11);
        assert!(p.set_label_type(4).is_err());
        assert!(p.set_label_density(0).is_err());
        assert!(p.into_inner().written().is_empty());
    }

    #[test]
    fn test_set_dimension_height_first() {
        let link = ScriptedLink::new().respond(&packet(20, &[1]));
        let mut p = printer(link, PrinterModel::D11);
        assert!(p.set_dimension(96, 300).unwrap());

        let sent = p.into_inner().sent_packets().unwrap();
        assert_eq!(sent, vec![packet(19, &[0x01, 0x2C, 0x00, 0x60])]);
    }

    #[test]
    fn test_get_print_status() {
        let link = ScriptedLink::new().respond(&packet(179, &[0x01, 0x02, 50, 100]));
        let mut p = printer(link, PrinterModel::B21);
        let status = p.get_print_status().unwrap();
        assert_eq!(
            status,
            PrintStatus {
                page: 258,
                progress1: 50,
                progress2: 100
            }
        );
    }

    #[test]
    fn test_short_print_status() {
        let link = ScriptedLink::new().respond(&packet(179, &[0, 1]));
        let mut p = printer(link, PrinterModel::B21);
        assert!(matches!(
            p.get_print_status(),
            Err(ProtocolError::ShortResponse { needed: 4, got: 2, .. })
        ));
    }

    #[test]
    fn test_wait_page_done_reads_second_byte() {
        let link = ScriptedLink::new()
            .silent_polls(3)
            .respond(&packet(224, &[0, 2]));
        let mut p = printer(link, PrinterModel::D11);
        assert_eq!(p.wait_page_done().unwrap(), 2);
        assert_eq!(p.transceiver().clock().sleeps().len(), 3);
    }

    #[test]
    fn test_wait_print_finish_notifications() {
        let link = ScriptedLink::new()
            .respond(&packet(224, &[0, 1]))
            .respond(&packet(224, &[0, 2]));
        let mut p = printer(link, PrinterModel::D11);
        p.wait_print_finish(2).unwrap();
        assert_eq!(p.into_inner().pending_reads(), 0);
    }

    #[test]
    fn test_wait_print_finish_polling() {
        let link = ScriptedLink::new()
            .respond(&packet(179, &[0, 0, 10, 0]))
            .respond(&packet(179, &[0, 1, 100, 100]));
        let mut p = printer(link, PrinterModel::B21);
        p.wait_print_finish(1).unwrap();
        assert_eq!(p.transceiver().clock().sleeps(), &[STATUS_POLL_INTERVAL]);
    }

    #[test]
    fn test_wait_print_finish_is_bounded() {
        let link = ScriptedLink::new()
            .respond(&packet(179, &[0, 0, 0, 0]))
            .respond(&packet(179, &[0, 0, 0, 0]))
            .respond(&packet(179, &[0, 0, 0, 0]));
        let mut p = printer(link, PrinterModel::B21).with_max_status_polls(3);
        let err = p.wait_print_finish(1).unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout { code: 179, rounds: 3 }));
    }

    #[test]
    fn test_print_label_rejects_before_sending() {
        let mut p = printer(ScriptedLink::new(), PrinterModel::D11);
        let wide = Bitmap::new(120, 200);
        assert!(p.print_label(&wide, 1, 2, 1).is_err());

        let ok = Bitmap::new(96, 200);
        assert!(p.print_label(&ok, 1, 2, 0).is_err());
        assert!(p.print_label(&ok, 0, 2, 1).is_err());
        assert!(p.into_inner().written().is_empty());
    }
}
