/*
 *  display/codec.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bit packing of frame segments into the panel's draw payload
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

use crate::constants::{PANEL_HEIGHT, SEGMENT_WIDTH};
use crate::frame::Frame;

/// A rectangular region of the panel addressed by one draw report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Segment {
    pub const LEFT: Segment = Segment { x: 0, y: 0, width: SEGMENT_WIDTH, height: PANEL_HEIGHT };
    pub const RIGHT: Segment = Segment { x: SEGMENT_WIDTH, y: 0, width: SEGMENT_WIDTH, height: PANEL_HEIGHT };

    /// Payload size in bytes: one bit per pixel, rounded up.
    pub const fn payload_len(&self) -> usize {
        ((self.width * self.height) as usize).div_ceil(8)
    }

    /// Bit position of a segment-local pixel, column-major.
    #[inline]
    pub const fn bit_index(&self, col: u32, row: u32) -> usize {
        (col * self.height + row) as usize
    }
}

/// Pack one segment of `frame` into the draw payload.
///
/// Bits run down each column, then across: pixel (col,row) of the segment
/// lands at bit `col * height + row`, LSB first within each byte. The frame
/// must already be binary; `invert` flips which pixels are lit.
pub fn encode_segment(frame: &Frame, seg: Segment, invert: bool) -> Vec<u8> {
    let mut payload = vec![0u8; seg.payload_len()];
    for col in 0..seg.width {
        for row in 0..seg.height {
            if frame.pixel(seg.x + col, seg.y + row) != invert {
                let bit = seg.bit_index(col, row);
                payload[bit / 8] |= 1 << (bit % 8);
            }
        }
    }
    payload
}

/// Unpack a draw payload into `target` at the segment's origin.
///
/// Inverse of [`encode_segment`] with `invert = false`; used by the mock
/// panel and by tests. Missing trailing bytes read as unlit.
pub fn decode_segment(payload: &[u8], seg: Segment, target: &mut Frame) {
    for col in 0..seg.width {
        for row in 0..seg.height {
            let bit = seg.bit_index(col, row);
            let on = payload
                .get(bit / 8)
                .is_some_and(|byte| byte & (1 << (bit % 8)) != 0);
            target.set(seg.x + col, seg.y + row, on);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::constants::PANEL_WIDTH;

    fn panel_frame(on: impl FnMut(u32, u32) -> bool) -> Frame {
        Frame::from_fn(PANEL_WIDTH, PANEL_HEIGHT, on)
    }

    #[test]
    fn test_payload_len() {
        assert_eq!(Segment::LEFT.payload_len(), 512);
        let odd = Segment { x: 0, y: 0, width: 3, height: 3 };
        assert_eq!(odd.payload_len(), 2);
    }

    #[test]
    fn test_column_major_bit_order() {
        let mut frame = Frame::blank();
        // second column, first row -> bit 64 -> byte 8, bit 0
        frame.set(1, 0, true);
        // first column, ninth row -> bit 8 -> byte 1, bit 0
        frame.set(0, 8, true);
        // first column, fourth row -> bit 3 of byte 0
        frame.set(0, 3, true);

        let payload = encode_segment(&frame, Segment::LEFT, false);
        assert_eq!(payload[0], 0b0000_1000);
        assert_eq!(payload[1], 0b0000_0001);
        assert_eq!(payload[8], 0b0000_0001);
        assert_eq!(payload.iter().map(|b| b.count_ones()).sum::<u32>(), 3);
    }

    #[test]
    fn test_right_segment_reads_from_offset() {
        let mut frame = Frame::blank();
        frame.set(SEGMENT_WIDTH, 0, true);
        let left = encode_segment(&frame, Segment::LEFT, false);
        let right = encode_segment(&frame, Segment::RIGHT, false);
        assert!(left.iter().all(|&b| b == 0));
        assert_eq!(right[0], 1);
    }

    #[test]
    fn test_invert_is_complement() {
        let frame = panel_frame(|x, y| (x + y) % 2 == 0);
        for seg in [Segment::LEFT, Segment::RIGHT] {
            let plain = encode_segment(&frame, seg, false);
            let inverted = encode_segment(&frame, seg, true);
            for (a, b) in plain.iter().zip(&inverted) {
                assert_eq!(*a, !*b);
            }
        }
    }

    #[test]
    fn test_round_trip() {
        let frame = panel_frame(|x, y| (x * 7 + y * 3) % 5 == 0);
        let mut rebuilt = Frame::blank();
        for seg in [Segment::LEFT, Segment::RIGHT] {
            decode_segment(&encode_segment(&frame, seg, false), seg, &mut rebuilt);
        }
        assert_eq!(rebuilt, frame);
    }
}
