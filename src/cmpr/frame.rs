//! Frame encoder and decoder.
//!
//! Pixels are scanned in raster order. Consecutive equal (preprocessed)
//! colors are merged into runs of at most `1 << run_len_bits` pixels; every
//! run starts with a palette lookup that picks a palette or a literal entry.

use log::debug;

use super::{
    get_color, preprocess, set_color, BitReader, BitWriter, CodecConfig, Color, Entry,
    PaletteCache, StreamHeader, SyntaxTable, HEADER_SIZE,
};
use crate::error::{OsdcError, Result};
use crate::utils::aligned_stream_size;

/// Run-length state machine feeding a bit writer.
///
/// The header is written on construction; [`RunEncoder::finish`] flushes the
/// pending run and returns the padded stream.
pub struct RunEncoder {
    table: SyntaxTable,
    cache: PaletteCache,
    writer: BitWriter,
    last_color: Color,
    pending: Option<Entry>,
}

impl RunEncoder {
    /// Start a stream for `config` in a scratch buffer of `capacity` bytes.
    pub fn new(config: &CodecConfig, capacity: usize) -> Self {
        let mut writer = BitWriter::new(capacity);
        writer.write(config.header().pack(), (HEADER_SIZE * 8) as u32);

        Self {
            table: config.syntax(),
            cache: PaletteCache::new(config.palette_capacity()),
            writer,
            last_color: Color::TRANSPARENT,
            pending: None,
        }
    }

    #[inline]
    pub fn push_pixel(&mut self, color: Color) -> Result<()> {
        self.push_span(color, 1)
    }

    /// Append `length` pixels of one color. Equivalent to `length` calls of
    /// [`RunEncoder::push_pixel`].
    pub fn push_span(&mut self, color: Color, mut length: usize) -> Result<()> {
        let max_run = self.table.max_run();

        while length > 0 {
            // extend the pending run, or emit it and open a new one
            let entry = match self.pending {
                Some(entry) if entry.run() < max_run && color == self.last_color => entry,
                _ => {
                    self.flush()?;
                    self.last_color = color;
                    self.start_run(color)
                }
            };

            // fill up to the longest run one entry can carry
            let take = (max_run - entry.run()).min(length);
            self.pending = Some(entry.with_run(entry.run() + take));
            length -= take;
        }
        Ok(())
    }

    /// Current stream length in bits, pending run excluded.
    #[inline]
    pub fn bit_position(&self) -> usize {
        self.writer.bit_position()
    }

    /// Flush the last run and return the stream padded to 16 bytes.
    /// Fails with the true stream size if the scratch buffer overflowed.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.flush()?;
        let size = aligned_stream_size(self.writer.bit_position());
        if self.writer.is_overflowed() {
            return Err(OsdcError::InsufficientCapacity {
                required: size,
                capacity: self.writer.capacity_bits() / 8,
            });
        }
        let mut stream = self.writer.into_inner();
        stream.resize(size, 0);
        Ok(stream)
    }

    fn start_run(&mut self, color: Color) -> Entry {
        let hit = if self.table.palette_mode() {
            self.cache.lookup(color)
        } else {
            None
        };
        match hit {
            Some(index) => Entry::Palette { index, run: 0 },
            None => Entry::Literal { color, run: 0 },
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(entry) = self.pending.take() {
            self.table.encode(&mut self.writer, &entry)?;
        }
        Ok(())
    }
}

/// Compress a frame. Pixels are preprocessed in place.
pub fn encode_frame(pixels: &mut [u8], config: &CodecConfig) -> Result<Vec<u8>> {
    config.validate()?;
    let frame_bytes = config.frame_bytes();
    if pixels.len() < frame_bytes {
        return Err(OsdcError::BufferTooSmall {
            required: frame_bytes,
            actual: pixels.len(),
        });
    }

    let format = config.format;
    let mut encoder = RunEncoder::new(config, config.scratch_size());
    for pixel in pixels[..frame_bytes].chunks_exact_mut(format.storage_bytes()) {
        let color = preprocess(
            pixel,
            format,
            config.rgb_trunc_bits,
            config.alpha_trunc_bits,
            config.zeroize_by_alpha,
        );
        encoder.push_pixel(color)?;
    }
    let stream = encoder.finish()?;

    debug!(
        "encoded {}x{} {:?} frame: {} -> {} bytes",
        config.width,
        config.height,
        format,
        frame_bytes,
        stream.len()
    );
    Ok(stream)
}

/// Compress a frame into `out`, returning the number of bytes written.
///
/// When the stream does not fit, nothing is written and the error carries
/// the size that would have been needed.
pub fn encode_frame_into(
    pixels: &mut [u8],
    config: &CodecConfig,
    out: &mut [u8],
) -> Result<usize> {
    let stream = encode_frame(pixels, config)?;
    if stream.len() > out.len() {
        return Err(OsdcError::InsufficientCapacity {
            required: stream.len(),
            capacity: out.len(),
        });
    }
    out[..stream.len()].copy_from_slice(&stream);
    Ok(stream.len())
}

/// Decompress a stream into `out` and return its header.
///
/// `run_len_bits` must match the encoder's setting. On error `out` may be
/// partially written but never beyond the frame size.
pub fn decode_frame(stream: &[u8], run_len_bits: u8, out: &mut [u8]) -> Result<StreamHeader> {
    let (header, config, frame_bytes) = decoder_config(stream, run_len_bits)?;
    if out.len() < frame_bytes {
        return Err(OsdcError::BufferTooSmall {
            required: frame_bytes,
            actual: out.len(),
        });
    }
    decode_body(stream, &header, &config, &mut out[..frame_bytes])?;
    Ok(header)
}

/// Decompress a stream into a freshly allocated frame.
///
/// The header is untrusted: a frame larger than the stream could possibly
/// describe is rejected before anything is allocated.
pub fn decode_frame_to_vec(stream: &[u8], run_len_bits: u8) -> Result<(StreamHeader, Vec<u8>)> {
    let (header, config, frame_bytes) = decoder_config(stream, run_len_bits)?;

    let table = config.syntax();
    let body_bits = (stream.len() - HEADER_SIZE).saturating_mul(8);
    let max_pixels = body_bits
        .div_ceil(table.min_entry_bits() as usize)
        .saturating_mul(table.max_run());
    let pixel_count = config.pixel_count();
    if pixel_count > max_pixels {
        return Err(OsdcError::UnexpectedEnd {
            remaining: pixel_count - max_pixels,
        });
    }

    let mut out = vec![0u8; frame_bytes];
    decode_body(stream, &header, &config, &mut out)?;
    Ok((header, out))
}

/// Parse the header and rebuild the decoder configuration, returning the
/// exact frame size.
fn decoder_config(stream: &[u8], run_len_bits: u8) -> Result<(StreamHeader, CodecConfig, usize)> {
    let header = StreamHeader::parse(stream)?;
    if !(1..=16).contains(&run_len_bits) {
        return Err(OsdcError::InvalidBitDepth {
            field: "run_len_bits",
            value: run_len_bits,
        });
    }
    let config = CodecConfig::from_header(&header, run_len_bits);
    let frame_bytes = config.checked_frame_bytes()?;
    Ok((header, config, frame_bytes))
}

/// Decode the entries after the header into `out`, exactly one frame long.
fn decode_body(
    stream: &[u8],
    header: &StreamHeader,
    config: &CodecConfig,
    out: &mut [u8],
) -> Result<()> {
    let format = config.format;
    let table = config.syntax();
    let mut cache = PaletteCache::new(if header.palette_mode() {
        header.palette_size as usize
    } else {
        1
    });
    let mut reader = BitReader::new(&stream[HEADER_SIZE..]);
    let mut pixels = out.chunks_exact_mut(format.storage_bytes());
    let mut remaining = config.pixel_count();

    while remaining > 0 {
        if reader.is_exhausted() {
            return Err(OsdcError::UnexpectedEnd { remaining });
        }

        let entry = table.decode(&mut reader);
        // literals refill the cache, palette hits move to the front
        let color = match entry {
            Entry::Literal { color, .. } => {
                cache.push(color);
                color
            }
            Entry::Palette { index, .. } => {
                let color = cache.get(index).ok_or(OsdcError::InvalidPaletteIndex {
                    index,
                    size: cache.capacity(),
                })?;
                cache.lru_update(index);
                color
            }
        };

        // paint what fits before reporting an overlong run
        let run = entry.run();
        for pixel in pixels.by_ref().take(run) {
            set_color(pixel, color, format);
        }
        if run > remaining {
            return Err(OsdcError::RunOverflow { run, remaining });
        }
        remaining -= run;
    }

    debug!(
        "decoded {}x{} {:?} frame from {} bytes",
        header.width,
        header.height,
        format,
        stream.len()
    );
    Ok(())
}

/// Index of the first pixel that differs between two frames.
pub fn first_mismatch(config: &CodecConfig, a: &[u8], b: &[u8]) -> Option<usize> {
    let pel = config.format.storage_bytes();
    a.chunks_exact(pel)
        .zip(b.chunks_exact(pel))
        .take(config.pixel_count())
        .position(|(pa, pb)| get_color(pa, config.format) != get_color(pb, config.format))
}
