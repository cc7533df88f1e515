//! Bit-granular stream primitives.
//!
//! The writer owns a fixed-capacity byte buffer with an explicit bit cursor;
//! fields are written and read strictly in declaration order, LSB-first
//! within each byte, with no field names on the wire. Bounded reals encode as
//! fixed-point with symmetric quantization error of at most
//! `(max - min) / (2^bits - 1)`.

use anyhow::{bail, Result};
use std::f32::consts::PI;

/// Maximum width of a single `write_bits`/`read_bits` field.
pub const MAX_FIELD_BITS: u32 = 32;

pub struct BitWriter {
    buf: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    /// A writer over a zeroed buffer of `capacity` bytes. Exceeding the
    /// capacity is a programmer error (the packet layout is known to both
    /// ends) and panics.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            bit_len: 0,
        }
    }

    /// Bits written so far.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Consume the writer, returning the written bytes (final partial byte
    /// zero-padded).
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.truncate(self.bit_len.div_ceil(8));
        self.buf
    }

    pub fn write_bits(&mut self, value: u32, bits: u32) {
        assert!(
            (1..=MAX_FIELD_BITS).contains(&bits),
            "field width {bits} out of range"
        );
        assert!(
            bits == MAX_FIELD_BITS || value < (1u32 << bits),
            "value {value} does not fit in {bits} bits"
        );
        assert!(
            self.bit_len + bits as usize <= self.buf.len() * 8,
            "bit buffer overflow"
        );
        for i in 0..bits {
            if (value >> i) & 1 != 0 {
                self.buf[self.bit_len >> 3] |= 1 << (self.bit_len & 7);
            }
            self.bit_len += 1;
        }
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_bits(u32::from(value), 1);
    }

    /// Fixed-point encode `value` from `[min, max]` into `bits` bits.
    pub fn write_float(&mut self, value: f32, min: f32, max: f32, bits: u32) {
        assert!(min < max, "empty float range");
        assert!(
            value.is_finite() && value >= min && value <= max,
            "float {value} outside [{min}, {max}]"
        );
        let steps = ((1u64 << bits) - 1) as f32;
        let q = ((value - min) / (max - min) * steps).round() as u32;
        self.write_bits(q, bits);
    }

    /// Raw 32-bit float (used for the max/min stat block where exactness
    /// matters more than width).
    pub fn write_f32(&mut self, value: f32) {
        self.write_bits(value.to_bits(), 32);
    }

    /// Fixed-width ASCII, NUL-padded to `max_len` bytes.
    pub fn write_ascii_string(&mut self, s: &str, max_len: usize) {
        assert!(s.is_ascii(), "non-ASCII string on the wire");
        assert!(s.len() <= max_len, "string exceeds fixed width {max_len}");
        for b in s.bytes() {
            self.write_bits(u32::from(b), 8);
        }
        for _ in s.len()..max_len {
            self.write_bits(0, 8);
        }
    }

    pub fn write_object_id(&mut self, id: u32) {
        self.write_bits(id, crate::OBJECT_ID_BITS);
    }

    /// Per-axis quantized position over `[0, MAX_WORLD_DIM]`.
    pub fn write_position(&mut self, pos: [f32; 2]) {
        self.write_float(pos[0], 0.0, crate::MAX_WORLD_DIM, crate::POSITION_BITS);
        self.write_float(pos[1], 0.0, crate::MAX_WORLD_DIM, crate::POSITION_BITS);
    }

    /// Direction angle over `[-pi, pi]` at the given width.
    pub fn write_rotation(&mut self, angle: f32, bits: u32) {
        self.write_float(angle, -PI, PI, bits);
    }

    pub fn write_scale(&mut self, scale: f32) {
        self.write_float(
            scale,
            crate::MIN_OBJECT_SCALE,
            crate::MAX_OBJECT_SCALE,
            crate::SCALE_BITS,
        );
    }

    pub fn write_variance(&mut self, variance: f32) {
        self.write_float(variance, 0.0, 1.0, crate::VARIANCE_BITS);
    }

    pub fn write_layer(&mut self, layer: i32) {
        let biased = layer + crate::LAYER_BIAS;
        assert!(
            (0..(1 << crate::LAYER_BITS)).contains(&biased),
            "layer {layer} outside wire range"
        );
        self.write_bits(biased as u32, crate::LAYER_BITS);
    }
}

pub struct BitReader<'a> {
    buf: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, bit_pos: 0 }
    }

    /// Bits remaining in the buffer.
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        self.buf.len() * 8 - self.bit_pos
    }

    pub fn read_bits(&mut self, bits: u32) -> Result<u32> {
        assert!(
            (1..=MAX_FIELD_BITS).contains(&bits),
            "field width {bits} out of range"
        );
        if self.remaining_bits() < bits as usize {
            bail!("bit stream short read ({bits} bits wanted)");
        }
        let mut value = 0u32;
        for i in 0..bits {
            let bit = (self.buf[self.bit_pos >> 3] >> (self.bit_pos & 7)) & 1;
            value |= u32::from(bit) << i;
            self.bit_pos += 1;
        }
        Ok(value)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    pub fn read_float(&mut self, min: f32, max: f32, bits: u32) -> Result<f32> {
        let steps = ((1u64 << bits) - 1) as f32;
        let q = self.read_bits(bits)? as f32;
        Ok(min + (max - min) * (q / steps))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_bits(32)?))
    }

    pub fn read_ascii_string(&mut self, max_len: usize) -> Result<String> {
        let mut out = String::with_capacity(max_len);
        for _ in 0..max_len {
            let b = self.read_bits(8)? as u8;
            if b != 0 {
                out.push(char::from(b));
            }
        }
        Ok(out)
    }

    pub fn read_object_id(&mut self) -> Result<u32> {
        self.read_bits(crate::OBJECT_ID_BITS)
    }

    pub fn read_position(&mut self) -> Result<[f32; 2]> {
        let x = self.read_float(0.0, crate::MAX_WORLD_DIM, crate::POSITION_BITS)?;
        let y = self.read_float(0.0, crate::MAX_WORLD_DIM, crate::POSITION_BITS)?;
        Ok([x, y])
    }

    pub fn read_rotation(&mut self, bits: u32) -> Result<f32> {
        self.read_float(-PI, PI, bits)
    }

    pub fn read_scale(&mut self) -> Result<f32> {
        self.read_float(
            crate::MIN_OBJECT_SCALE,
            crate::MAX_OBJECT_SCALE,
            crate::SCALE_BITS,
        )
    }

    pub fn read_variance(&mut self) -> Result<f32> {
        self.read_float(0.0, 1.0, crate::VARIANCE_BITS)
    }

    pub fn read_layer(&mut self) -> Result<i32> {
        Ok(self.read_bits(crate::LAYER_BITS)? as i32 - crate::LAYER_BIAS)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn bits_roundtrip_across_byte_boundaries() {
        let mut w = BitWriter::with_capacity(8);
        w.write_bits(0b101, 3);
        w.write_bits(0x3FF, 10);
        w.write_bool(true);
        w.write_bits(0, 1);
        w.write_bits(0xDEAD, 16);
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_bits(3).unwrap(), 0b101);
        assert_eq!(r.read_bits(10).unwrap(), 0x3FF);
        assert!(r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
        assert_eq!(r.read_bits(16).unwrap(), 0xDEAD);
    }

    #[test]
    fn float_roundtrip_error_within_one_step() {
        let (min, max, bits) = (0.0f32, 100.0f32, 12u32);
        let step = (max - min) / ((1u64 << bits) - 1) as f32;
        let mut v = min;
        while v <= max {
            let mut w = BitWriter::with_capacity(4);
            w.write_float(v, min, max, bits);
            let bytes = w.finish();
            let got = BitReader::new(&bytes).read_float(min, max, bits).unwrap();
            assert!(
                (got - v).abs() <= step,
                "v={v} got={got} step={step}"
            );
            v += 0.37;
        }
    }

    #[test]
    fn rotation_quantizes_symmetric_range() {
        for &bits in &[8u32, 16] {
            let mut w = BitWriter::with_capacity(6);
            w.write_rotation(1.234, bits);
            let bytes = w.finish();
            let got = BitReader::new(&bytes).read_rotation(bits).unwrap();
            let step = (2.0 * PI) / ((1u64 << bits) - 1) as f32;
            assert!((got - 1.234).abs() <= step);
        }
    }

    #[test]
    fn ascii_string_pads_and_trims() {
        let mut w = BitWriter::with_capacity(16);
        w.write_ascii_string("ak47", 8);
        let bytes = w.finish();
        assert_eq!(bytes.len(), 8);
        let got = BitReader::new(&bytes).read_ascii_string(8).unwrap();
        assert_eq!(got, "ak47");
    }

    #[test]
    fn short_read_is_error_not_panic() {
        let bytes = [0xFFu8; 2];
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_bits(12).unwrap(), 0xFFF);
        assert!(r.read_bits(8).is_err());
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn out_of_range_write_panics() {
        let mut w = BitWriter::with_capacity(4);
        w.write_float(101.0, 0.0, 100.0, 8);
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn capacity_overflow_panics() {
        let mut w = BitWriter::with_capacity(1);
        w.write_bits(0, 9);
    }

    #[test]
    fn layer_bias_roundtrip() {
        for layer in [-15, -3, 0, 3, 16] {
            let mut w = BitWriter::with_capacity(1);
            w.write_layer(layer);
            let bytes = w.finish();
            assert_eq!(BitReader::new(&bytes).read_layer().unwrap(), layer);
        }
    }
}
