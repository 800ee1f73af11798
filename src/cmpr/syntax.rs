//! Entry syntax of the compressed body.
//!
//! Every entry is written LSB-first as `prefix`, then `run - 1` for run
//! variants, then the code (a literal pixel or a palette index):
//!
//! | palette mode | entry        | prefix | bits                              |
//! |--------------|--------------|--------|-----------------------------------|
//! | on           | literal      | `1`    | `1 + pixel_bits`                  |
//! | on           | literal run  | `100`  | `3 + run_len_bits + pixel_bits`   |
//! | on           | palette      | `10`   | `2 + palette_idx_bits`            |
//! | on           | palette run  | `000`  | `3 + run_len_bits + palette_idx_bits` |
//! | off          | literal      | `1`    | `1 + pixel_bits`                  |
//! | off          | literal run  | `0`    | `1 + run_len_bits + pixel_bits`   |

use super::{BitReader, BitWriter, Color, PixelFormat};
use crate::error::{OsdcError, Result};

/// The four entry kinds of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Literal,
    Palette,
    LiteralRun,
    PaletteRun,
}

impl Mode {
    #[inline]
    pub fn is_run(self) -> bool {
        matches!(self, Mode::LiteralRun | Mode::PaletteRun)
    }

    #[inline]
    pub fn is_palette(self) -> bool {
        matches!(self, Mode::Palette | Mode::PaletteRun)
    }
}

/// One encoded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Literal { color: Color, run: usize },
    Palette { index: usize, run: usize },
}

impl Entry {
    #[inline]
    pub fn run(&self) -> usize {
        match *self {
            Entry::Literal { run, .. } | Entry::Palette { run, .. } => run,
        }
    }

    #[inline]
    pub fn with_run(self, run: usize) -> Self {
        match self {
            Entry::Literal { color, .. } => Entry::Literal { color, run },
            Entry::Palette { index, .. } => Entry::Palette { index, run },
        }
    }

    pub fn mode(&self) -> Mode {
        match (*self, self.run() > 1) {
            (Entry::Literal { .. }, false) => Mode::Literal,
            (Entry::Literal { .. }, true) => Mode::LiteralRun,
            (Entry::Palette { .. }, false) => Mode::Palette,
            (Entry::Palette { .. }, true) => Mode::PaletteRun,
        }
    }
}

/// Bit layout of one entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxLayout {
    pub prefix: u32,
    pub prefix_bits: u32,
    /// Zero for single-pixel entries.
    pub run_bits: u32,
    pub code_bits: u32,
}

impl SyntaxLayout {
    #[inline]
    pub fn total_bits(&self) -> u32 {
        self.prefix_bits + self.run_bits + self.code_bits
    }
}

/// Layout lookup and entry encode/decode for one stream configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxTable {
    format: PixelFormat,
    palette_mode: bool,
    run_len_bits: u32,
    palette_idx_bits: u32,
}

impl SyntaxTable {
    pub fn new(
        format: PixelFormat,
        palette_mode: bool,
        run_len_bits: u8,
        palette_idx_bits: u8,
    ) -> Self {
        Self {
            format,
            palette_mode,
            run_len_bits: u32::from(run_len_bits),
            palette_idx_bits: if palette_mode { u32::from(palette_idx_bits) } else { 0 },
        }
    }

    #[inline]
    pub fn palette_mode(&self) -> bool {
        self.palette_mode
    }

    /// Longest run a single entry can carry.
    #[inline]
    pub fn max_run(&self) -> usize {
        1usize << self.run_len_bits
    }

    /// Layout for `mode`, or `None` for palette entries with palette mode off.
    pub fn layout(&self, mode: Mode) -> Option<SyntaxLayout> {
        let pixel_bits = self.format.bits_per_pixel();
        let run_bits = self.run_len_bits;
        let idx_bits = self.palette_idx_bits;

        let layout = |prefix, prefix_bits, run_bits, code_bits| SyntaxLayout {
            prefix,
            prefix_bits,
            run_bits,
            code_bits,
        };

        match (self.palette_mode, mode) {
            (true, Mode::Literal) => Some(layout(0b1, 1, 0, pixel_bits)),
            (true, Mode::LiteralRun) => Some(layout(0b100, 3, run_bits, pixel_bits)),
            (true, Mode::Palette) => Some(layout(0b10, 2, 0, idx_bits)),
            (true, Mode::PaletteRun) => Some(layout(0b000, 3, run_bits, idx_bits)),
            (false, Mode::Literal) => Some(layout(0b1, 1, 0, pixel_bits)),
            (false, Mode::LiteralRun) => Some(layout(0b0, 1, run_bits, pixel_bits)),
            (false, Mode::Palette | Mode::PaletteRun) => None,
        }
    }

    /// Widest entry this configuration can emit.
    pub fn max_entry_bits(&self) -> u32 {
        [Mode::Literal, Mode::LiteralRun, Mode::Palette, Mode::PaletteRun]
            .into_iter()
            .filter_map(|mode| self.layout(mode))
            .map(|layout| layout.total_bits())
            .max()
            .unwrap_or(0)
    }

    /// Narrowest entry this configuration can emit, never zero.
    pub fn min_entry_bits(&self) -> u32 {
        [Mode::Literal, Mode::LiteralRun, Mode::Palette, Mode::PaletteRun]
            .into_iter()
            .filter_map(|mode| self.layout(mode))
            .map(|layout| layout.total_bits())
            .min()
            .unwrap_or(1)
            .max(1)
    }

    /// Upper bound on stream bits spent per pixel. Run entries cover at
    /// least two pixels.
    pub fn max_bits_per_pixel(&self) -> u32 {
        [Mode::Literal, Mode::LiteralRun, Mode::Palette, Mode::PaletteRun]
            .into_iter()
            .filter_map(|mode| {
                let bits = self.layout(mode)?.total_bits();
                Some(if mode.is_run() { (bits + 1) / 2 } else { bits })
            })
            .max()
            .unwrap_or(0)
    }

    /// Write one entry. `entry.run()` must be in `1..=max_run()`.
    pub fn encode(&self, bs: &mut BitWriter, entry: &Entry) -> Result<()> {
        let layout = self.layout(entry.mode()).ok_or(OsdcError::PaletteDisabled)?;
        debug_assert!(entry.run() >= 1 && entry.run() <= self.max_run());

        bs.write(u64::from(layout.prefix), layout.prefix_bits);
        if layout.run_bits > 0 {
            bs.write((entry.run() - 1) as u64, layout.run_bits);
        }
        let code = match *entry {
            Entry::Literal { color, .. } => u64::from(self.format.pack(color)),
            Entry::Palette { index, .. } => index as u64,
        };
        bs.write(code, layout.code_bits);
        Ok(())
    }

    /// Read and consume the mode prefix.
    pub fn decode_mode(&self, reader: &mut BitReader) -> Mode {
        if !self.palette_mode {
            return if reader.read(1) == 1 { Mode::Literal } else { Mode::LiteralRun };
        }

        let prefix = reader.peek(3);
        let (mode, bits) = if prefix == 0b000 {
            (Mode::PaletteRun, 3)
        } else if prefix == 0b100 {
            (Mode::LiteralRun, 3)
        } else if prefix & 0b11 == 0b10 {
            (Mode::Palette, 2)
        } else {
            (Mode::Literal, 1)
        };
        reader.skip(bits);
        mode
    }

    /// Read one entry. Palette indices are returned unresolved.
    pub fn decode(&self, reader: &mut BitReader) -> Entry {
        let mode = self.decode_mode(reader);
        let run = if mode.is_run() {
            reader.read(self.run_len_bits) as usize + 1
        } else {
            1
        };

        if mode.is_palette() {
            let index = reader.read(self.palette_idx_bits) as usize;
            Entry::Palette { index, run }
        } else {
            let code = reader.read(self.format.bits_per_pixel());
            Entry::Literal {
                color: self.format.unpack(code),
                run,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(table: &SyntaxTable, mode: Mode) -> u32 {
        table.layout(mode).map(|l| l.total_bits()).unwrap_or(0)
    }

    #[test]
    fn test_palette_mode_widths() {
        for rl in [4u8, 6, 8] {
            let t8888 = SyntaxTable::new(PixelFormat::Argb8888, true, rl, 3);
            assert_eq!(total(&t8888, Mode::Literal), 33);
            assert_eq!(total(&t8888, Mode::LiteralRun), 35 + rl as u32);
            assert_eq!(total(&t8888, Mode::Palette), 5);
            assert_eq!(total(&t8888, Mode::PaletteRun), 6 + rl as u32);

            for format in [PixelFormat::Argb1555, PixelFormat::Argb4444] {
                let t16 = SyntaxTable::new(format, true, rl, 3);
                assert_eq!(total(&t16, Mode::Literal), 17);
                assert_eq!(total(&t16, Mode::LiteralRun), 19 + rl as u32);
            }
        }
    }

    #[test]
    fn test_no_palette_widths() {
        let table = SyntaxTable::new(PixelFormat::Argb8888, false, 6, 3);
        assert_eq!(total(&table, Mode::Literal), 33);
        assert_eq!(total(&table, Mode::LiteralRun), 39);
        assert_eq!(table.layout(Mode::Palette), None);
        assert_eq!(table.max_entry_bits(), 39);
        assert_eq!(table.min_entry_bits(), 33);
    }

    #[test]
    fn test_min_entry_bits() {
        let table = SyntaxTable::new(PixelFormat::Argb8888, true, 6, 3);
        assert_eq!(table.min_entry_bits(), 5);
        let table = SyntaxTable::new(PixelFormat::Lut4, true, 6, 1);
        assert_eq!(table.min_entry_bits(), 3);
        let table = SyntaxTable::new(PixelFormat::Lut4, false, 1, 0);
        assert_eq!(table.min_entry_bits(), 5);
    }

    #[test]
    fn test_palette_entry_rejected_without_palette() {
        let table = SyntaxTable::new(PixelFormat::Lut8, false, 6, 0);
        let mut bs = BitWriter::new(8);
        let entry = Entry::Palette { index: 0, run: 1 };
        assert!(matches!(table.encode(&mut bs, &entry), Err(OsdcError::PaletteDisabled)));
    }

    #[test]
    fn test_literal_run_bits() {
        let table = SyntaxTable::new(PixelFormat::Lut8, true, 6, 3);
        let mut bs = BitWriter::new(4);
        let entry = Entry::Literal { color: Color::index(0xA5), run: 3 };
        table.encode(&mut bs, &entry).unwrap();
        assert_eq!(bs.bit_position(), 17);
        // prefix 100, run-1 = 2 at bit 3, code at bit 9
        let expected = 0b100u32 | (2 << 3) | (0xA5 << 9);
        assert_eq!(bs.as_bytes(), &expected.to_le_bytes()[..3]);
    }

    #[test]
    fn test_entry_decode_mirrors_encode() {
        let table = SyntaxTable::new(PixelFormat::Argb1555, true, 5, 2);
        let entries = [
            Entry::Literal { color: Color::new(3, 4, 5, 1), run: 1 },
            Entry::Palette { index: 2, run: 1 },
            Entry::Literal { color: Color::new(31, 0, 7, 0), run: 32 },
            Entry::Palette { index: 3, run: 17 },
        ];
        let mut bs = BitWriter::new(32);
        for entry in &entries {
            table.encode(&mut bs, entry).unwrap();
        }

        let mut reader = BitReader::new(bs.as_bytes());
        for entry in &entries {
            assert_eq!(table.decode(&mut reader), *entry);
        }
    }
}
