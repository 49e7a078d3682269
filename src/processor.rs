//! Measurement post-processing. The scheduler treats processors as
//! opaque: it only observes the suggestion and feedback lists they fill.

use crate::clock::SimulationClock;
use crate::earth::Geodetic;
use crate::packet::RawPacket;

/// Per-node measurement consumer. `compute` digests one integration's raw
/// buffer; `regression` adapts internal thresholds when feedback returns.
pub trait DataProcessor {
    fn compute(
        &self,
        raw_packets: &[RawPacket],
        source_index: u16,
        clock: &SimulationClock,
        min_list: &mut Vec<Geodetic>,
        max_list: &mut Vec<Geodetic>,
        feedback: &mut Vec<(bool, u16)>,
    );

    fn regression(&mut self, success: bool, constellation: u16);
}

/// No-op processor.
#[derive(Debug, Clone, Default)]
pub struct TemplateProcessor;

impl DataProcessor for TemplateProcessor {
    fn compute(
        &self,
        _raw_packets: &[RawPacket],
        _source_index: u16,
        _clock: &SimulationClock,
        _min_list: &mut Vec<Geodetic>,
        _max_list: &mut Vec<Geodetic>,
        _feedback: &mut Vec<(bool, u16)>,
    ) {
    }

    fn regression(&mut self, _success: bool, _constellation: u16) {}
}

/// How a source processor turns an integration into suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Longest threshold-exceeding run, sub-sampled around its eighth.
    Windowed,
    /// Degenerate mode: recommend only the first sample's location.
    SingleSample,
}

/// Informer-side processor: thresholds the optical and rain magnitudes
/// and recommends the interesting ground tracks.
#[derive(Debug, Clone)]
pub struct SourceProcessor {
    mode: SourceMode,
    regression_step: f64,
    rain_threshold: f64,
}

const OPTICAL_THRESHOLD: f64 = 0.1;
const SINK_CONSTELLATION: u16 = 1;

impl SourceProcessor {
    pub fn new(mode: SourceMode) -> Self {
        Self {
            mode,
            regression_step: 30.0,
            rain_threshold: 70.0,
        }
    }

    pub fn rain_threshold(&self) -> f64 {
        self.rain_threshold
    }

    /// Index spans of maximal contiguous runs satisfying `predicate`.
    fn runs(raw_packets: &[RawPacket], predicate: impl Fn(f64) -> bool) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut start = 0;
        let mut length = 0;
        let mut in_run = false;
        for (index, packet) in raw_packets.iter().enumerate() {
            if predicate(packet.measurement) {
                if in_run {
                    length += 1;
                } else {
                    start = index;
                    length = 0;
                    in_run = true;
                }
            } else if in_run {
                in_run = false;
                runs.push((start, length));
            }
        }
        runs
    }

    /// Sub-samples the longest run around its first eighth, mirrored
    /// outward from that pivot.
    fn subsample(raw_packets: &[RawPacket], runs: &[(usize, usize)], out: &mut Vec<Geodetic>) {
        let longest = runs
            .iter()
            .fold((0usize, 0usize), |best, &run| if run.1 > best.1 { run } else { best });
        let track: Vec<Geodetic> = (longest.0..longest.0 + longest.1)
            .map(|i| raw_packets[i].geodetic)
            .collect();
        let eighth = track.len() / 8;
        for i in 0..eighth {
            out.push(track[eighth - i]);
            out.push(track[eighth + i]);
        }
    }
}

impl DataProcessor for SourceProcessor {
    fn compute(
        &self,
        raw_packets: &[RawPacket],
        _source_index: u16,
        _clock: &SimulationClock,
        min_list: &mut Vec<Geodetic>,
        max_list: &mut Vec<Geodetic>,
        _feedback: &mut Vec<(bool, u16)>,
    ) {
        if raw_packets.is_empty() {
            return;
        }
        match self.mode {
            SourceMode::SingleSample => {
                min_list.push(raw_packets[0].geodetic);
                max_list.push(raw_packets[0].geodetic);
            }
            SourceMode::Windowed => {
                let clear = Self::runs(raw_packets, |m| m < OPTICAL_THRESHOLD);
                Self::subsample(raw_packets, &clear, min_list);
                let heavy = Self::runs(raw_packets, |m| m >= self.rain_threshold);
                Self::subsample(raw_packets, &heavy, max_list);
            }
        }
    }

    fn regression(&mut self, success: bool, constellation: u16) {
        if constellation == SINK_CONSTELLATION {
            if success {
                self.rain_threshold -= self.regression_step;
            } else {
                self.rain_threshold += self.regression_step;
            }
            self.regression_step *= 0.92;
        }
    }
}

/// Visitor-side processor: thresholds the middle sample of the
/// integration and emits one feedback record toward the informer.
#[derive(Debug, Clone, Default)]
pub struct SinkProcessor;

const RAIN_SUCCESS_THRESHOLD: f64 = 0.000005;
const OPTICAL_SUCCESS_THRESHOLD: f64 = 1.0;

impl DataProcessor for SinkProcessor {
    fn compute(
        &self,
        raw_packets: &[RawPacket],
        _source_index: u16,
        _clock: &SimulationClock,
        _min_list: &mut Vec<Geodetic>,
        _max_list: &mut Vec<Geodetic>,
        feedback: &mut Vec<(bool, u16)>,
    ) {
        if raw_packets.is_empty() {
            return;
        }
        let middle = &raw_packets[raw_packets.len() / 2];
        let is_rain = middle.name.contains("PRECTOT");
        let success = (is_rain && middle.measurement > RAIN_SUCCESS_THRESHOLD)
            || (!is_rain && middle.measurement < OPTICAL_SUCCESS_THRESHOLD);
        feedback.push((success, middle.informer_index));
    }

    fn regression(&mut self, _success: bool, _constellation: u16) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Calendar;

    fn raw(measurement: f64, index: usize, variable: &str, informer: u16) -> RawPacket {
        RawPacket::new(
            index as u64,
            Calendar {
                year: 2020,
                month: 7,
                day: 12,
                hour: 0,
                minute: 0,
                second: index as i32,
                microsecond: 0,
            },
            Geodetic::new(index as f64 * 0.01, index as f64 * 0.02, 0.0),
            measurement,
            0.0,
            variable,
            informer,
        )
    }

    fn clock() -> SimulationClock {
        SimulationClock::from_ymd_hms(2020, 7, 12, 0, 0, 0).unwrap()
    }

    #[test]
    fn windowed_source_subsamples_the_longest_clear_run() {
        // A clear run of recorded length 32 framed by cloudy samples:
        // eighth = 4, so the suggestion list holds 8 mirrored locations
        // around the pivot.
        let mut packets = vec![raw(5.0, 0, "TAUTOT", 0)];
        for i in 1..=33 {
            packets.push(raw(0.0, i, "TAUTOT", 0));
        }
        packets.push(raw(5.0, 34, "TAUTOT", 0));
        let processor = SourceProcessor::new(SourceMode::Windowed);
        let mut min_list = Vec::new();
        let mut max_list = Vec::new();
        let mut feedback = Vec::new();
        processor.compute(&packets, 0, &clock(), &mut min_list, &mut max_list, &mut feedback);
        assert_eq!(min_list.len(), 8);
        assert!(max_list.is_empty());
        assert!(feedback.is_empty());
        // The pivot sample appears twice (mirror of offset zero).
        assert_eq!(min_list[0], min_list[1]);
    }

    #[test]
    fn single_sample_mode_recommends_the_first_location() {
        let packets = vec![raw(42.0, 0, "TAUTOT", 0), raw(43.0, 1, "TAUTOT", 0)];
        let processor = SourceProcessor::new(SourceMode::SingleSample);
        let mut min_list = Vec::new();
        let mut max_list = Vec::new();
        let mut feedback = Vec::new();
        processor.compute(&packets, 0, &clock(), &mut min_list, &mut max_list, &mut feedback);
        assert_eq!(min_list, vec![packets[0].geodetic]);
        assert_eq!(max_list, vec![packets[0].geodetic]);
    }

    #[test]
    fn sink_thresholds_the_middle_sample() {
        let packets: Vec<RawPacket> = (0..5).map(|i| raw(0.00001, i, "PRECTOT", 9)).collect();
        let processor = SinkProcessor;
        let mut min_list = Vec::new();
        let mut max_list = Vec::new();
        let mut feedback = Vec::new();
        processor.compute(&packets, 2, &clock(), &mut min_list, &mut max_list, &mut feedback);
        assert_eq!(feedback, vec![(true, 9)]);

        let dry: Vec<RawPacket> = (0..5).map(|i| raw(0.0, i, "PRECTOT", 9)).collect();
        feedback.clear();
        processor.compute(&dry, 2, &clock(), &mut min_list, &mut max_list, &mut feedback);
        assert_eq!(feedback, vec![(false, 9)]);
    }

    #[test]
    fn regression_adapts_the_rain_threshold() {
        let mut processor = SourceProcessor::new(SourceMode::Windowed);
        let initial = processor.rain_threshold();
        processor.regression(true, 1);
        assert!((processor.rain_threshold() - (initial - 30.0)).abs() < 1e-12);
        processor.regression(false, 1);
        assert!((processor.rain_threshold() - (initial - 30.0 + 27.6)).abs() < 1e-9);
        // Feedback from other constellations is ignored.
        let before = processor.rain_threshold();
        processor.regression(true, 2);
        assert_eq!(processor.rain_threshold(), before);
    }
}
