// Rolling-window series for sparkline charts (per-core CPU, memory, per-interface network).
// Pure data structure: no I/O, no clocks. The aggregator is the only writer.

use std::collections::{BTreeMap, HashSet, VecDeque};

/// Default window length (samples per series).
pub const DEFAULT_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
}

/// Identity of one series in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeriesKey {
    /// One hardware thread, by index.
    Core(usize),
    /// Memory usage percent.
    Memory,
    /// Upload or download rate of one interface.
    Network { interface: String, direction: Direction },
}

impl SeriesKey {
    pub fn network(interface: impl Into<String>, direction: Direction) -> Self {
        SeriesKey::Network {
            interface: interface.into(),
            direction,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, SeriesKey::Network { .. })
    }
}

/// Ordered samples for one series, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    samples: VecDeque<f64>,
}

static EMPTY_SERIES: TimeSeries = TimeSeries {
    samples: VecDeque::new(),
};

impl TimeSeries {
    fn zeroed(window: usize) -> Self {
        Self {
            samples: std::iter::repeat_n(0.0, window).collect(),
        }
    }

    /// Sliding window push: one in, one out once the window is full.
    fn push_capped(&mut self, value: f64, window: usize) {
        while self.samples.len() >= window && !self.samples.is_empty() {
            self.samples.pop_front();
        }
        if window > 0 {
            self.samples.push_back(value);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Largest sample in the window (0.0 when empty); used to scale network charts.
    pub fn peak(&self) -> f64 {
        self.iter().fold(0.0, f64::max)
    }
}

/// All rolling-window buffers, keyed by `SeriesKey`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesStore {
    window: usize,
    series: BTreeMap<SeriesKey, TimeSeries>,
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl TimeSeriesStore {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            series: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Create `thread_count` zero-filled core series. No-op once any core series exists:
    /// the thread count is taken as fixed for the session.
    pub fn initialize_core_series(&mut self, thread_count: usize) {
        if self.core_count() > 0 {
            return;
        }
        for index in 0..thread_count {
            self.series
                .insert(SeriesKey::Core(index), TimeSeries::zeroed(self.window));
        }
    }

    /// Append one sample. A key seen for the first time starts as W zeros, so every
    /// series renders full width from its first tick.
    pub fn append_sample(&mut self, key: SeriesKey, value: f64) {
        let window = self.window;
        self.series
            .entry(key)
            .or_insert_with(|| TimeSeries::zeroed(window))
            .push_capped(value, window);
    }

    /// Drop every network series whose key is not in `active_keys`.
    /// Core and memory series are never pruned.
    pub fn prune_stale_series(&mut self, active_keys: &HashSet<SeriesKey>) {
        self.series
            .retain(|key, _| !key.is_network() || active_keys.contains(key));
    }

    /// Read-only view; an absent key yields an empty series.
    pub fn get_series(&self, key: &SeriesKey) -> &TimeSeries {
        self.series.get(key).unwrap_or(&EMPTY_SERIES)
    }

    pub fn contains(&self, key: &SeriesKey) -> bool {
        self.series.contains_key(key)
    }

    pub fn latest(&self, key: &SeriesKey) -> Option<f64> {
        self.series.get(key).and_then(TimeSeries::latest)
    }

    pub fn peak(&self, key: &SeriesKey) -> f64 {
        self.get_series(key).peak()
    }

    pub fn core_count(&self) -> usize {
        self.series
            .keys()
            .filter(|k| matches!(k, SeriesKey::Core(_)))
            .count()
    }

    /// Interfaces with at least one live series, sorted by name.
    pub fn network_interfaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .series
            .keys()
            .filter_map(|k| match k {
                SeriesKey::Network { interface, .. } => Some(interface.as_str()),
                _ => None,
            })
            .collect();
        names.dedup();
        names
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    /// Number of series in the store.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
