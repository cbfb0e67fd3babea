//! The immutable [`StreamData`] descriptor shared by every source, sink, and
//! wire/file format in the acquisition core.

use std::io::{self, Read, Write};

use digest::Digest;
use facq_core::{Error, Result};
use sha2::Sha256;

use crate::channel::Chanlist;
use crate::units::Unit;

/// Size in bytes of an `f64` sample as it appears on the wire and in files.
pub const WIRE_BPS: u32 = 8;

/// Maximum number of channels a [`StreamData`] may describe.
pub const MAX_CHANNELS: usize = 256;

/// Immutable descriptor of an acquisition run: timing, channel addressing,
/// units, and expected physical range per channel.
///
/// Constructed once via [`StreamData::new`], which validates every invariant
/// up front; there is no way to obtain a `StreamData` that violates them.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamData {
    bps: u32,
    period: f64,
    chanlist: Chanlist,
    units: Vec<Unit>,
    max: Vec<f64>,
    min: Vec<f64>,
}

impl StreamData {
    /// Builds a new descriptor, validating:
    /// - `1 <= n_channels <= 256` (derived from `chanlist.len()`),
    /// - `period >= 1e-9`,
    /// - `units`, `max`, and `min` all have length `n_channels`,
    /// - `max[i] > min[i]` for every channel.
    pub fn new(
        bps: u32,
        period: f64,
        chanlist: Chanlist,
        units: Vec<Unit>,
        max: Vec<f64>,
        min: Vec<f64>,
    ) -> Result<Self> {
        let n = chanlist.len();
        if n == 0 || n > MAX_CHANNELS {
            return Err(Error::Config(format!(
                "n_channels must be in 1..=256, got {n}"
            )));
        }
        if period < 1e-9 {
            return Err(Error::Config(format!(
                "period must be >= 1e-9 seconds, got {period}"
            )));
        }
        if units.len() != n || max.len() != n || min.len() != n {
            return Err(Error::Config(format!(
                "per-channel arrays must all have length {n} (units={}, max={}, min={})",
                units.len(),
                max.len(),
                min.len()
            )));
        }
        for i in 0..n {
            if !(max[i] > min[i]) {
                return Err(Error::Config(format!(
                    "channel {i}: max ({}) must be greater than min ({})",
                    max[i], min[i]
                )));
            }
        }
        Ok(StreamData {
            bps,
            period,
            chanlist,
            units,
            max,
            min,
        })
    }

    /// Bytes per sample as emitted by the source before any conversion.
    pub fn bps(&self) -> u32 {
        self.bps
    }

    /// Number of interleaved channels per slice.
    pub fn n_channels(&self) -> usize {
        self.chanlist.len()
    }

    /// Inter-slice period, in seconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// The channel addressing list.
    pub fn chanlist(&self) -> &Chanlist {
        &self.chanlist
    }

    /// Per-channel physical units.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Per-channel expected maximum.
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Per-channel expected minimum.
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Size in bytes of one interleaved slice of native `f64` samples.
    pub fn slice_bytes(&self) -> usize {
        self.n_channels() * WIRE_BPS as usize
    }

    /// A chunk size, in bytes, targeting a few hundred milliseconds of data
    /// for sub-second periods, or 8 slices for periods of a second or
    /// longer. Used by both the stream persistence model and the network
    /// plug to size their ring buffers from `period` alone.
    pub fn recommended_chunk_bytes(&self) -> usize {
        let slices = if self.period < 1.0 {
            ((0.3 / self.period).round() as usize).max(1)
        } else {
            8
        };
        slices * self.slice_bytes()
    }

    /// Serializes this descriptor onto a connected socket (or any writer),
    /// big-endian, in the wire order: `period`, `n_channels`, then
    /// `n_channels` repetitions of `channel_spec`/`unit`, followed by the
    /// full `max` array and then the full `min` array (not interleaved).
    /// `bps` is not written; the wire format always implies 8-byte doubles.
    pub fn write_wire<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.period.to_be_bytes())?;
        w.write_all(&(self.n_channels() as u32).to_be_bytes())?;
        self.chanlist.write_be(w)?;
        for unit in &self.units {
            w.write_all(&unit.to_code().to_be_bytes())?;
        }
        for m in &self.max {
            w.write_all(&m.to_be_bytes())?;
        }
        for m in &self.min {
            w.write_all(&m.to_be_bytes())?;
        }
        Ok(())
    }

    /// Deserializes a descriptor from a connected socket (or any reader),
    /// mirroring [`Self::write_wire`]. Assigns `bps = 8` since the wire never
    /// carries it.
    pub fn read_wire<R: Read>(r: &mut R) -> Result<Self> {
        let mut f64buf = [0u8; 8];
        let mut u32buf = [0u8; 4];

        r.read_exact(&mut f64buf)?;
        let period = f64::from_be_bytes(f64buf);

        r.read_exact(&mut u32buf)?;
        let n_channels = u32::from_be_bytes(u32buf) as usize;

        let chanlist = Chanlist::read_be(r, n_channels)?;

        let mut units = Vec::with_capacity(n_channels);
        for _ in 0..n_channels {
            r.read_exact(&mut u32buf)?;
            units.push(Unit::from_code(u32::from_be_bytes(u32buf)));
        }

        let mut max = Vec::with_capacity(n_channels);
        for _ in 0..n_channels {
            r.read_exact(&mut f64buf)?;
            max.push(f64::from_be_bytes(f64buf));
        }

        let mut min = Vec::with_capacity(n_channels);
        for _ in 0..n_channels {
            r.read_exact(&mut f64buf)?;
            min.push(f64::from_be_bytes(f64buf));
        }

        StreamData::new(WIRE_BPS, period, chanlist, units, max, min)
    }

    /// Feeds this descriptor's canonical big-endian byte representation into
    /// a running SHA-256 state, in the exact order the file codec's header
    /// occupies on disk: `period`, `n_channels`, channels, units, max, min.
    /// This is the same field order as [`Self::write_wire`] minus the wire's
    /// `bps` omission being irrelevant (the file header never carries `bps`
    /// either).
    pub fn update_checksum(&self, hasher: &mut Sha256) {
        hasher.update(self.period.to_be_bytes());
        hasher.update((self.n_channels() as u32).to_be_bytes());
        let mut chan_bytes = Vec::with_capacity(self.n_channels() * 4);
        self.chanlist
            .write_be(&mut chan_bytes)
            .expect("writing to a Vec cannot fail");
        hasher.update(&chan_bytes);
        for unit in &self.units {
            hasher.update(unit.to_code().to_be_bytes());
        }
        for m in &self.max {
            hasher.update(m.to_be_bytes());
        }
        for m in &self.min {
            hasher.update(m.to_be_bytes());
        }
    }
}
