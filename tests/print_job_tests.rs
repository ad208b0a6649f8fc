//! # Print Job Tests
//!
//! End-to-end print jobs against a scripted printer: every command the
//! session sends is decoded back and compared with the expected sequence.

use niimbot::protocol::codes::{IMAGE_CLEAR, SET_IMAGE_DATA};
use niimbot::render::bitmap::Bitmap;
use niimbot::transport::ScriptedLink;
use niimbot::transport::transceiver::VirtualClock;
use niimbot::{LabelPrinter, Packet, PrinterModel, ProtocolError};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn packet(kind: u8, payload: &[u8]) -> Packet {
    Packet::new(kind, payload.to_vec()).unwrap()
}

fn ack(kind: u8) -> Packet {
    packet(kind, &[1])
}

/// 8x8 label: a blank first row, then a vertical bar at x = 0.
fn bar_label() -> Bitmap {
    let mut bitmap = Bitmap::new(8, 8);
    for y in 1..8 {
        bitmap.set(0, y, true);
    }
    bitmap
}

/// Replies to the setup commands, in send order.
fn setup_replies(link: ScriptedLink) -> ScriptedLink {
    link.respond(&ack(51)) // SET_LABEL_TYPE + 16
        .respond(&ack(49)) // SET_LABEL_DENSITY + 16
        .respond(&ack(2)) // START_PRINT + 1
        .respond(&ack(48)) // ALLOW_PRINT_CLEAR + 16
        .respond(&ack(4)) // START_PAGE_PRINT + 1
        .respond(&ack(20)) // SET_DIMENSION + 1
        .respond(&ack(22)) // SET_QUANTITY + 1
        .respond(&ack(211)) // IMAGE_CONFIRM + 0
        .respond(&ack(228)) // END_PAGE_PRINT + 1
}

fn expected_job(density: u8, quantity: u16) -> Vec<Packet> {
    let [q_hi, q_lo] = quantity.to_be_bytes();
    vec![
        packet(35, &[1]),
        packet(33, &[density]),
        packet(1, &[1]),
        packet(32, &[1]),
        packet(3, &[1]),
        packet(19, &[0, 8, 0, 8]),
        packet(21, &[q_hi, q_lo]),
        packet(IMAGE_CLEAR, &[0, 0, 1]),
        packet(SET_IMAGE_DATA, &[0, 1, 1, 7, 0x80]),
        packet(227, &[1]),
    ]
}

#[test]
fn test_d11_print_job() {
    let link = setup_replies(ScriptedLink::new())
        .silent_polls(2)
        .respond(&packet(224, &[0, 1])) // PAGE_PRINT_DONE, page 1
        .respond(&ack(244)); // END_PRINT + 1

    let mut printer = LabelPrinter::with_clock(link, PrinterModel::D11, VirtualClock::new());
    printer.print_label(&bar_label(), 1, 2, 1).unwrap();

    // Only the page-done wait slept: no pacing on D11.
    assert_eq!(
        printer.transceiver().clock().sleeps(),
        &[Duration::from_millis(100); 2]
    );

    let sent = printer.into_inner().sent_packets().unwrap();
    let mut expected = expected_job(2, 1);
    expected.push(packet(243, &[1]));
    assert_eq!(sent, expected);
}

#[test]
fn test_d11_waits_for_every_copy() {
    let link = setup_replies(ScriptedLink::new())
        .respond(&packet(224, &[0, 1]))
        .respond(&packet(224, &[0, 2]))
        .respond(&packet(224, &[0, 3]))
        .respond(&ack(244));

    let mut printer = LabelPrinter::with_clock(link, PrinterModel::D11, VirtualClock::new());
    printer.print_label(&bar_label(), 1, 3, 3).unwrap();

    let link = printer.into_inner();
    assert_eq!(link.pending_reads(), 0);
    let sent = link.sent_packets().unwrap();
    assert_eq!(sent[6], packet(21, &[0, 3]));
    assert_eq!(sent.last(), Some(&packet(243, &[1])));
}

#[test]
fn test_b21_print_job_polls_status() {
    let link = setup_replies(ScriptedLink::new())
        .respond(&packet(179, &[0, 0, 40, 0])) // GET_PRINT_STATUS + 16
        .respond(&packet(179, &[0, 1, 100, 100]))
        .respond(&ack(244));

    let mut printer = LabelPrinter::with_clock(link, PrinterModel::B21, VirtualClock::new());
    printer.print_label(&bar_label(), 1, 0, 1).unwrap();

    // Eight 50ms pacing pauses before the image, one 100ms status poll pause.
    let clock = printer.transceiver().clock();
    assert_eq!(clock.sleeps().len(), 9);
    assert_eq!(clock.elapsed(), Duration::from_millis(8 * 50 + 100));

    let sent = printer.into_inner().sent_packets().unwrap();
    let mut expected = expected_job(0, 1);
    expected.push(packet(163, &[1]));
    expected.push(packet(163, &[1]));
    expected.push(packet(243, &[1]));
    assert_eq!(sent, expected);
}

#[test]
fn test_rejection_aborts_job() {
    let link = ScriptedLink::new()
        .respond(&ack(51))
        .respond(&packet(219, &[0])); // density rejected

    let mut printer = LabelPrinter::with_clock(link, PrinterModel::D11, VirtualClock::new());
    let err = printer.print_label(&bar_label(), 1, 2, 1).unwrap_err();
    assert!(matches!(err, ProtocolError::DeviceRejected(_)));

    // Nothing after the rejected command went out.
    let sent = printer.into_inner().sent_packets().unwrap();
    assert_eq!(sent.len(), 2);
}

#[test]
fn test_silent_printer_times_out() {
    let mut printer =
        LabelPrinter::with_clock(ScriptedLink::new(), PrinterModel::D11, VirtualClock::new());
    let err = printer.print_label(&bar_label(), 1, 2, 1).unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout { code: 51, rounds: 6 }));
    assert_eq!(
        printer.transceiver().clock().elapsed(),
        Duration::from_millis(500)
    );
}

#[test]
fn test_landscape_rejected_on_d11_only() {
    let wide = Bitmap::new(96, 40);

    let mut d11 =
        LabelPrinter::with_clock(ScriptedLink::new(), PrinterModel::D11, VirtualClock::new());
    assert!(matches!(
        d11.print_label(&wide, 1, 2, 1),
        Err(ProtocolError::InvalidArgument(_))
    ));
    assert!(d11.into_inner().written().is_empty());

    // B21 accepts it and starts talking (then times out on the silent link).
    let mut b21 =
        LabelPrinter::with_clock(ScriptedLink::new(), PrinterModel::B21, VirtualClock::new());
    assert!(matches!(
        b21.print_label(&wide, 1, 2, 1),
        Err(ProtocolError::Timeout { .. })
    ));
    assert!(!b21.into_inner().written().is_empty());
}
