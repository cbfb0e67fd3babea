//! [`SoftwareSource`]: a free-running waveform generator usable in place of
//! a hardware DAQ source.

use std::f64::consts::PI;
use std::thread;
use std::time::{Duration, Instant};

use facq_core::{IoStatus, PollStatus};
use facq_pipeline::Source;
use facq_stream_data::{Chanlist, ChannelSpec, Direction, StreamData, Unit};

const MAX_POLL_WAIT: Duration = Duration::from_millis(500);

/// The waveform a [`SoftwareSource`] replays on every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// A sine wave of the configured amplitude and wave period.
    Sine,
    /// A bipolar square wave switching at the half-period mark.
    Square,
    /// A linear ramp from `-amplitude` to `+amplitude` over one wave period.
    Sawtooth,
}

impl Waveform {
    /// Parses the catalog-persisted spelling (`"sine"`, `"square"`,
    /// `"sawtooth"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sine" => Some(Waveform::Sine),
            "square" => Some(Waveform::Square),
            "sawtooth" => Some(Waveform::Sawtooth),
            _ => None,
        }
    }

    /// The catalog-persisted spelling of this waveform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
        }
    }
}

/// Construction parameters for a [`SoftwareSource`].
#[derive(Debug, Clone)]
pub struct SoftwareSourceConfig {
    /// Which waveform every channel replays.
    pub function: Waveform,
    /// Peak amplitude in physical units.
    pub amplitude: f64,
    /// Seconds per waveform cycle.
    pub wave_period: f64,
    /// Seconds between emitted slices.
    pub sample_period: f64,
    /// Number of interleaved channels, all replaying the same phase.
    pub n_channels: usize,
}

/// A waveform generator that emits native-endian `f64` slices directly, one
/// slice per [`Source::read`] call, gated by a monotonic schedule anchored
/// at [`Source::start`].
pub struct SoftwareSource {
    config: SoftwareSourceConfig,
    stream_data: StreamData,
    start: Option<Instant>,
    next_slice: u64,
}

impl SoftwareSource {
    /// Builds a source from `config`, validating the derived [`StreamData`].
    pub fn new(config: SoftwareSourceConfig) -> facq_core::Result<Self> {
        let n = config.n_channels;
        let chans = (0..n as u16)
            .map(|c| ChannelSpec::new(c, 0, 0, 0, Direction::Input))
            .collect();
        let stream_data = StreamData::new(
            8,
            config.sample_period,
            Chanlist::new(chans),
            vec![Unit::Volt; n],
            vec![config.amplitude; n],
            vec![-config.amplitude; n],
        )?;
        Ok(SoftwareSource {
            config,
            stream_data,
            start: None,
            next_slice: 0,
        })
    }

    fn sample_at(&self, t: f64) -> f64 {
        let phase = (t / self.config.wave_period).rem_euclid(1.0);
        match self.config.function {
            Waveform::Sine => self.config.amplitude * (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    self.config.amplitude
                } else {
                    -self.config.amplitude
                }
            }
            Waveform::Sawtooth => self.config.amplitude * (2.0 * phase - 1.0),
        }
    }
}

impl Source for SoftwareSource {
    fn stream_data(&self) -> &StreamData {
        &self.stream_data
    }

    fn needs_conv(&self) -> bool {
        false
    }

    fn start(&mut self) -> facq_core::Result<()> {
        self.start = Some(Instant::now());
        self.next_slice = 0;
        Ok(())
    }

    fn stop(&mut self) -> facq_core::Result<()> {
        self.start = None;
        Ok(())
    }

    fn poll(&mut self) -> PollStatus {
        let Some(start) = self.start else {
            return PollStatus::Error;
        };
        let target =
            start + Duration::from_secs_f64(self.next_slice as f64 * self.config.sample_period);
        let now = Instant::now();
        if now >= target {
            return PollStatus::Ready;
        }
        let wait = (target - now).min(MAX_POLL_WAIT);
        thread::sleep(wait);
        if Instant::now() >= target {
            PollStatus::Ready
        } else {
            PollStatus::NotReady
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> (usize, IoStatus) {
        let slice_bytes = self.config.n_channels * 8;
        if buf.len() < slice_bytes {
            return (0, IoStatus::Again);
        }
        let t = self.next_slice as f64 * self.config.sample_period;
        let value = self.sample_at(t);
        for ch in 0..self.config.n_channels {
            let start = ch * 8;
            buf[start..start + 8].copy_from_slice(&value.to_ne_bytes());
        }
        self.next_slice += 1;
        (slice_bytes, IoStatus::Normal)
    }

    fn conv(&self, _src: &[u8], _dst: &mut [f64]) {
        debug_assert!(!self.needs_conv(), "conv should never be called; needs_conv is always false");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(n: usize) -> SoftwareSourceConfig {
        SoftwareSourceConfig {
            function: Waveform::Sine,
            amplitude: 5.0,
            wave_period: 1.0,
            sample_period: 0.01,
            n_channels: n,
        }
    }

    #[test]
    fn first_sine_sample_is_near_zero() {
        let mut source = SoftwareSource::new(config(3)).unwrap();
        source.start().unwrap();
        assert_eq!(source.poll(), PollStatus::Ready);
        let mut buf = vec![0u8; 24];
        let (n, status) = source.read(&mut buf);
        assert_eq!(n, 24);
        assert_eq!(status, IoStatus::Normal);
        let v = f64::from_ne_bytes(buf[0..8].try_into().unwrap());
        assert!(v.abs() < 1e-9, "expected ~0 at t=0, got {v}");
        assert_eq!(
            f64::from_ne_bytes(buf[8..16].try_into().unwrap()),
            f64::from_ne_bytes(buf[16..24].try_into().unwrap()),
            "every channel replays the same phase"
        );
    }

    #[test]
    fn read_rejects_a_buffer_smaller_than_one_slice() {
        let mut source = SoftwareSource::new(config(2)).unwrap();
        source.start().unwrap();
        let mut buf = vec![0u8; 4];
        let (n, status) = source.read(&mut buf);
        assert_eq!(n, 0);
        assert_eq!(status, IoStatus::Again);
    }

    #[test]
    fn waveform_round_trips_through_its_string_spelling() {
        for w in [Waveform::Sine, Waveform::Square, Waveform::Sawtooth] {
            assert_eq!(Waveform::parse(w.as_str()), Some(w));
        }
        assert_eq!(Waveform::parse("triangle"), None);
    }

    #[test]
    fn square_wave_switches_sign_at_half_period() {
        let mut config = config(1);
        config.function = Waveform::Square;
        let source = SoftwareSource::new(config).unwrap();
        assert_eq!(source.sample_at(0.1), 5.0);
        assert_eq!(source.sample_at(0.6), -5.0);
    }
}
