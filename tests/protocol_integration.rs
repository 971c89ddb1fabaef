/*
 *  tests/protocol_integration.rs
 *
 *  Wire format and device channel behaviour against the mock panel
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 */

use oled_gif::constants::{PANEL_HEIGHT, PANEL_WIDTH, REPORT_HEADER_LEN, REPORT_SIZE};
use oled_gif::display::drivers::mock::MockBackend;
use oled_gif::display::{decode_segment, frame_reports, DeviceChannel, DeviceFilter, PanelError};
use oled_gif::Frame;

/// Deterministic but irregular test pattern
fn pattern(seed: u32) -> Frame {
    Frame::from_fn(PANEL_WIDTH, PANEL_HEIGHT, |x, y| {
        (x.wrapping_mul(31) ^ y.wrapping_mul(17) ^ seed).count_ones() % 3 == 0
    })
}

#[test]
fn reports_cover_every_pixel_once() {
    let frame = pattern(7);
    let reports = frame_reports(&frame, false);

    let headers: Vec<_> = reports.iter().map(|r| r.header()).collect();
    assert_eq!(headers[0].x, 0);
    assert_eq!(headers[1].x as u32, PANEL_WIDTH / 2);
    let total_width: u32 = headers.iter().map(|h| h.width as u32).sum();
    assert_eq!(total_width, PANEL_WIDTH);
    assert!(headers.iter().all(|h| h.y == 0 && h.height as u32 == PANEL_HEIGHT));

    let mut rebuilt = Frame::blank();
    for report in &reports {
        decode_segment(report.payload(), report.header().segment(), &mut rebuilt);
    }
    assert_eq!(rebuilt, frame);
}

#[test]
fn report_bytes_match_the_device_layout() {
    let [left, right] = frame_reports(&Frame::blank(), false);
    assert_eq!(&left.as_bytes()[..REPORT_HEADER_LEN], &[0x06, 0x93, 0, 0, 64, 64]);
    assert_eq!(&right.as_bytes()[..REPORT_HEADER_LEN], &[0x06, 0x93, 64, 0, 64, 64]);
    assert_eq!(left.as_bytes().len(), REPORT_SIZE);
    assert_eq!(left.payload().len(), 64 * 64 / 8);
}

#[test]
fn column_major_bit_order() {
    // pixel (col 1, row 0) of the left half is bit 64: byte 8, lsb
    let mut frame = Frame::blank();
    frame.set(1, 0, true);
    let [left, right] = frame_reports(&frame, false);
    let bytes = left.as_bytes();
    assert_eq!(bytes[REPORT_HEADER_LEN + 8], 0x01);
    assert_eq!(bytes.iter().skip(REPORT_HEADER_LEN).filter(|b| **b != 0).count(), 1);
    assert!(right.payload().iter().all(|b| *b == 0));
}

#[test]
fn invert_complements_payload_only() {
    let frame = pattern(3);
    let plain = frame_reports(&frame, false);
    let inverted = frame_reports(&frame, true);
    for (p, i) in plain.iter().zip(inverted.iter()) {
        assert_eq!(p.header(), i.header());
        for (a, b) in p.payload().iter().zip(i.payload().iter()) {
            assert_eq!(*a, !*b);
        }
    }
}

#[test]
fn padding_after_payload_stays_zero() {
    let [left, _] = frame_reports(&pattern(1), true);
    let tail = &left.as_bytes()[REPORT_HEADER_LEN + left.payload().len()..];
    assert!(tail.iter().all(|b| *b == 0));
}

#[test]
fn second_report_failure_invalidates_and_reopens() {
    let backend = MockBackend::new();
    let channel = DeviceChannel::new(Box::new(backend.clone()), DeviceFilter::default());

    backend.state().lock().unwrap().fail_after = Some(1);
    let result = channel.send(&pattern(9), false);
    assert!(matches!(result, Err(PanelError::DeviceIo(_))));
    assert!(!channel.is_open());
    {
        let state = backend.state();
        let state = state.lock().unwrap();
        assert_eq!(state.open_count, 1);
        assert_eq!(state.reports.len(), 1);
        assert!(state.delivered_frames().is_empty());
    }

    channel.send(&pattern(9), false).unwrap();
    let state = backend.state();
    let state = state.lock().unwrap();
    assert_eq!(state.open_count, 2);
    assert_eq!(state.delivered_frames().last(), Some(&pattern(9)));
}

#[test]
fn unplugged_panel_is_found_again() {
    let backend = MockBackend::absent();
    let channel = DeviceChannel::new(Box::new(backend.clone()), DeviceFilter::default());
    assert!(matches!(channel.send(&Frame::blank(), false), Err(PanelError::DeviceNotFound { .. })));

    backend.state().lock().unwrap().present = true;
    channel.send(&Frame::blank(), false).unwrap();
    assert!(channel.is_open());
}
