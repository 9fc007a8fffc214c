//! # Send pacing
//!
//! By default the driver submits messages as fast as the client accepts them.
//! A target rate can be set to model steadier traffic instead:
//!
//! - **Constant**: at most `amount` messages in any sliding window of `per`
//! - **Poisson**: exponentially distributed gaps averaging `per / amount`
//!
//! Pacing sits between sends in the driver loop, never inside a send, so the
//! queue-full wait remains the only suspension point of a send.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Maximum number of events over a time window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    pub amount: u32,
    pub per: Duration,
}

impl Rate {
    pub fn per_second(amount: u32) -> Self {
        Self {
            amount,
            per: Duration::from_secs(1),
        }
    }

    fn events_per_sec(&self) -> f64 {
        self.amount as f64 / self.per.as_secs_f64()
    }
}

/// Sliding-window limiter remembering the last `amount` send slots
#[derive(Debug)]
pub struct Throttler {
    rate: Rate,
    slots: VecDeque<Instant>,
}

impl Throttler {
    pub fn new(rate: Rate) -> Self {
        Self {
            rate,
            slots: VecDeque::with_capacity(rate.amount as usize),
        }
    }

    /// Wait required before sending at `now`, reserving the resulting slot
    pub fn next_wait_at(&mut self, now: Instant) -> Duration {
        while let Some(oldest) = self.slots.front() {
            if *oldest + self.rate.per <= now {
                self.slots.pop_front();
            } else {
                break;
            }
        }

        if self.slots.len() < self.rate.amount as usize {
            self.slots.push_back(now);
            return Duration::ZERO;
        }

        // Window full: the next slot opens when the oldest one expires.
        let Some(oldest) = self.slots.pop_front() else {
            return Duration::ZERO;
        };
        let slot = oldest + self.rate.per;
        self.slots.push_back(slot);
        slot.saturating_duration_since(now)
    }
}

/// Poisson arrival process: `-ln(U) / rate` with `U` uniform in (0, 1]
#[derive(Debug)]
pub struct PoissonArrivals<R: Rng> {
    rng: R,
    events_per_sec: f64,
}

impl<R: Rng> PoissonArrivals<R> {
    pub fn new(rng: R, rate: Rate) -> Self {
        Self {
            rng,
            events_per_sec: rate.events_per_sec(),
        }
    }

    pub fn next_wait(&mut self) -> Duration {
        let uniform: f64 = 1.0 - self.rng.gen::<f64>();
        let gap_secs = -uniform.ln() / self.events_per_sec;
        if gap_secs > 0.0 {
            Duration::from_secs_f64(gap_secs)
        } else {
            Duration::ZERO
        }
    }
}

/// Pacing strategy applied by the load driver between two sends
#[derive(Debug)]
pub enum TrafficShape {
    Unbounded,
    Constant(Throttler),
    Poisson(PoissonArrivals<StdRng>),
}

impl TrafficShape {
    pub fn constant(rate: Rate) -> Self {
        TrafficShape::Constant(Throttler::new(rate))
    }

    pub fn poisson(rate: Rate) -> Self {
        TrafficShape::Poisson(PoissonArrivals::new(StdRng::from_entropy(), rate))
    }

    /// How long to wait before the next send
    pub fn next_wait(&mut self) -> Duration {
        match self {
            TrafficShape::Unbounded => Duration::ZERO,
            TrafficShape::Constant(throttler) => throttler.next_wait_at(Instant::now()),
            TrafficShape::Poisson(arrivals) => arrivals.next_wait(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_never_waits() {
        let mut shape = TrafficShape::Unbounded;
        for _ in 0..1000 {
            assert_eq!(shape.next_wait(), Duration::ZERO);
        }
    }

    #[test]
    fn test_throttler_allows_burst_then_spaces_slots() {
        let mut throttler = Throttler::new(Rate {
            amount: 3,
            per: Duration::from_secs(1),
        });
        let origin = Instant::now();

        for _ in 0..3 {
            assert_eq!(throttler.next_wait_at(origin), Duration::ZERO);
        }
        // Fourth event in the same instant waits for the first slot to expire.
        assert_eq!(throttler.next_wait_at(origin), Duration::from_secs(1));

        // Once the window has passed, slots free up again.
        let later = origin + Duration::from_secs(3);
        assert_eq!(throttler.next_wait_at(later), Duration::ZERO);
    }

    #[test]
    fn test_throttler_rate_over_many_events() {
        let rate = Rate::per_second(100);
        let mut throttler = Throttler::new(rate);
        let origin = Instant::now();
        let mut clock = origin;

        for _ in 0..1_000 {
            clock += throttler.next_wait_at(clock);
        }

        // 1000 events at 100/s: the last batch starts after 9 full windows.
        assert_eq!(clock.duration_since(origin), Duration::from_secs(9));
    }

    #[test]
    fn test_poisson_mean_gap_matches_rate() {
        let rate = Rate::per_second(200);
        let mut arrivals = PoissonArrivals::new(StdRng::seed_from_u64(42), rate);
        let samples = 20_000;

        let total: Duration = (0..samples).map(|_| arrivals.next_wait()).sum();
        let mean_ms = total.as_secs_f64() * 1_000.0 / samples as f64;

        // Expected mean gap is 5ms.
        assert!((mean_ms - 5.0).abs() < 0.5, "mean gap was {}ms", mean_ms);
    }
}
