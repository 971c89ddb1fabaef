/*
 *  display/report.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Draw report framing: header layout and left/right frame split
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::constants::{CMD_DRAW, PANEL_HEIGHT, PANEL_WIDTH, REPORT_HEADER_LEN, REPORT_ID, REPORT_SIZE};
use crate::display::codec::{encode_segment, Segment};
use crate::frame::Frame;

/// Largest payload one report can carry after its header.
pub const MAX_PAYLOAD: usize = REPORT_SIZE - REPORT_HEADER_LEN;

/// Parsed view of the fixed report prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportHeader {
    pub report_id: u8,
    pub command: u8,
    pub x: u8,
    pub y: u8,
    pub width: u8,
    pub height: u8,
}

impl ReportHeader {
    pub fn segment(&self) -> Segment {
        Segment {
            x: self.x as u32,
            y: self.y as u32,
            width: self.width as u32,
            height: self.height as u32,
        }
    }
}

/// One fixed-length draw feature report
///
/// ```text
///  0        1        2    3    4      5       6 ..
///  rpt id | cmd    | x  | y  | w    | h     | payload (column-major bits) | zero pad
///  0x06   | 0x93   |    |    |      |       |
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Report {
    bytes: Box<[u8; REPORT_SIZE]>,
}

impl Report {
    /// Build the draw report for one segment of `frame`.
    ///
    /// # Panics
    ///
    /// Panics if the segment's origin or size does not fit a header byte,
    /// or if its payload is longer than [`MAX_PAYLOAD`] bytes.
    pub fn draw(frame: &Frame, seg: Segment, invert: bool) -> Self {
        let header = [seg.x, seg.y, seg.width, seg.height].map(|v| {
            u8::try_from(v).unwrap_or_else(|_| panic!("segment {:?} does not fit a report header", seg))
        });
        assert!(
            seg.payload_len() <= MAX_PAYLOAD,
            "segment {:?} needs {} payload bytes, a report holds {}",
            seg,
            seg.payload_len(),
            MAX_PAYLOAD
        );

        let payload = encode_segment(frame, seg, invert);
        let mut bytes = Box::new([0u8; REPORT_SIZE]);
        bytes[0] = REPORT_ID;
        bytes[1] = CMD_DRAW;
        bytes[2..REPORT_HEADER_LEN].copy_from_slice(&header);
        bytes[REPORT_HEADER_LEN..REPORT_HEADER_LEN + payload.len()].copy_from_slice(&payload);
        Self { bytes }
    }

    pub fn header(&self) -> ReportHeader {
        ReportHeader {
            report_id: self.bytes[0],
            command: self.bytes[1],
            x: self.bytes[2],
            y: self.bytes[3],
            width: self.bytes[4],
            height: self.bytes[5],
        }
    }

    /// Payload bytes as declared by the header's width/height.
    pub fn payload(&self) -> &[u8] {
        let len = self.header().segment().payload_len();
        &self.bytes[REPORT_HEADER_LEN..REPORT_HEADER_LEN + len]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..]
    }
}

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Report")
            .field("header", &self.header())
            .field("payload_len", &self.payload().len())
            .finish()
    }
}

/// Split a panel frame into its left and right draw reports.
///
/// # Panics
///
/// Panics if the frame is not exactly panel sized. Frames are normalised
/// by the decoder (or built blank by the overlay), so a mismatch here is a
/// programming error.
pub fn frame_reports(frame: &Frame, invert: bool) -> [Report; 2] {
    assert!(
        frame.is_panel_sized(),
        "frame is {}x{}, panel is {}x{}",
        frame.width(),
        frame.height(),
        PANEL_WIDTH,
        PANEL_HEIGHT
    );
    [
        Report::draw(frame, Segment::LEFT, invert),
        Report::draw(frame, Segment::RIGHT, invert),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::codec::decode_segment;

    #[test]
    fn test_header_layout() {
        let [left, right] = frame_reports(&Frame::blank(), false);

        assert_eq!(left.as_bytes().len(), REPORT_SIZE);
        assert_eq!(&left.as_bytes()[..6], &[0x06, 0x93, 0, 0, 64, 64]);
        assert_eq!(&right.as_bytes()[..6], &[0x06, 0x93, 64, 0, 64, 64]);
        assert_eq!(right.payload().len(), 512);
    }

    #[test]
    fn test_padding_stays_zero() {
        let full = Frame::from_fn(PANEL_WIDTH, PANEL_HEIGHT, |_, _| true);
        let [left, _] = frame_reports(&full, false);
        assert!(left.payload().iter().all(|&b| b == 0xFF));
        assert!(left.as_bytes()[REPORT_HEADER_LEN + 512..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reports_cover_whole_panel() {
        let frame = Frame::from_fn(PANEL_WIDTH, PANEL_HEIGHT, |x, y| x % 3 == 0 || y == 17);
        let reports = frame_reports(&frame, false);

        let widths: u32 = reports.iter().map(|r| r.header().width as u32).sum();
        assert_eq!(widths, PANEL_WIDTH);

        let mut rebuilt = Frame::blank();
        for report in &reports {
            decode_segment(report.payload(), report.header().segment(), &mut rebuilt);
        }
        assert_eq!(rebuilt, frame);
    }

    #[test]
    #[should_panic(expected = "payload bytes")]
    fn test_rejects_oversized_segment() {
        let wide = Segment { x: 0, y: 0, width: 128, height: 64 };
        Report::draw(&Frame::blank(), wide, false);
    }

    #[test]
    #[should_panic(expected = "does not fit a report header")]
    fn test_rejects_origin_past_header_range() {
        let far = Segment { x: 300, y: 0, width: 8, height: 8 };
        Report::draw(&Frame::blank(), far, false);
    }

    #[test]
    #[should_panic(expected = "panel is 128x64")]
    fn test_rejects_wrong_size() {
        frame_reports(&Frame::new(64, 32), false);
    }
}
