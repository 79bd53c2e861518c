use std::time::Duration;

/// Fixed-size ring buffer of millisecond samples with a running sum.
#[derive(Debug, Clone)]
pub(crate) struct RollingWindowMs<const N: usize> {
    samples_ms: [f32; N],
    head: usize,
    count: usize,
    sum_ms: f32,
    last_ms: f32,
}

impl<const N: usize> Default for RollingWindowMs<N> {
    fn default() -> Self {
        Self {
            samples_ms: [0.0; N],
            head: 0,
            count: 0,
            sum_ms: 0.0,
            last_ms: 0.0,
        }
    }
}

impl<const N: usize> RollingWindowMs<N> {
    pub(crate) fn push_ms(&mut self, value_ms: f32) {
        if N == 0 {
            return;
        }
        self.last_ms = value_ms;

        if self.count < N {
            self.samples_ms[self.head] = value_ms;
            self.head = (self.head + 1) % N;
            self.count += 1;
            self.sum_ms += value_ms;
            return;
        }

        let evicted = self.samples_ms[self.head];
        self.samples_ms[self.head] = value_ms;
        self.head = (self.head + 1) % N;
        self.sum_ms += value_ms - evicted;
    }

    pub(crate) fn average_ms(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum_ms / self.count as f32
    }

    pub(crate) fn last_ms(&self) -> f32 {
        self.last_ms
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

pub(crate) fn duration_to_ms(duration: Duration) -> f32 {
    duration.as_secs_f32() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_averages_to_zero() {
        let window = RollingWindowMs::<4>::default();
        assert_eq!(window.average_ms(), 0.0);
        assert_eq!(window.len(), 0);
    }

    #[test]
    fn partial_window_average_uses_current_sample_count() {
        let mut window = RollingWindowMs::<10>::default();
        window.push_ms(1.0);
        window.push_ms(2.0);
        window.push_ms(3.0);

        assert_eq!(window.last_ms(), 3.0);
        assert!((window.average_ms() - 2.0).abs() < 0.0001);
    }

    #[test]
    fn wraparound_eviction_updates_average() {
        let mut window = RollingWindowMs::<4>::default();
        for _ in 0..4 {
            window.push_ms(10.0);
        }
        window.push_ms(30.0);

        assert_eq!(window.len(), 4);
        assert!((window.average_ms() - 15.0).abs() < 0.001);
        window.clear();
        assert_eq!(window.len(), 0);
    }

    #[test]
    fn duration_to_ms_conversion_is_expected() {
        let value = duration_to_ms(Duration::from_micros(1_500));
        assert!((value - 1.5).abs() < 0.0001);
    }
}
