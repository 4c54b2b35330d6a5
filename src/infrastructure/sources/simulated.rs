//! # Simulated Source
//!
//! Stand-in for a remote weather API.
//!
//! Each call sleeps for a random latency, then fails with a configurable
//! probability or returns the source's fixed reading. The random generator
//! is owned by the source and can be seeded, so runs are reproducible in
//! tests.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use weather_aggregator::infrastructure::sources::simulated::{SimulatedSource, SimulationProfile};
//!
//! let profile = SimulationProfile::new(Duration::from_millis(10), Duration::from_millis(20), 0.0);
//! let source = SimulatedSource::seeded("API1", 24, profile, 7);
//! assert_eq!(source.profile().failure_probability(), 0.0);
//! ```

use crate::domain::value_objects::{Location, Reading, SourceName};
use crate::infrastructure::sources::error::{SourceError, SourceResult};
use crate::infrastructure::sources::traits::WeatherSource;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default lower bound of the simulated latency.
const DEFAULT_MIN_LATENCY_MS: u64 = 1000;

/// Default (exclusive) upper bound of the simulated latency.
const DEFAULT_MAX_LATENCY_MS: u64 = 3000;

/// Default probability that a call fails.
const DEFAULT_FAILURE_PROBABILITY: f64 = 0.5;

/// Readings of the three reference sources.
const REFERENCE_READINGS: [(&str, i32); 3] = [("API1", 24), ("API2", 35), ("API3", 54)];

/// Latency and failure behaviour of a simulated source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    min_latency: Duration,
    max_latency: Duration,
    failure_probability: f64,
}

impl SimulationProfile {
    /// Creates a profile with latency in `[min_latency, max_latency)`.
    ///
    /// The probability is clamped to `[0.0, 1.0]`. When `max_latency` is not
    /// above `min_latency`, every call takes exactly `min_latency`.
    #[must_use]
    pub fn new(min_latency: Duration, max_latency: Duration, failure_probability: f64) -> Self {
        let failure_probability = if failure_probability.is_nan() {
            0.0
        } else {
            failure_probability.clamp(0.0, 1.0)
        };
        Self {
            min_latency,
            max_latency,
            failure_probability,
        }
    }

    /// Creates a profile that never fails and always takes `latency`.
    #[must_use]
    pub fn reliable(latency: Duration) -> Self {
        Self::new(latency, latency, 0.0)
    }

    /// Returns the minimum latency.
    #[inline]
    #[must_use]
    pub fn min_latency(&self) -> Duration {
        self.min_latency
    }

    /// Returns the exclusive maximum latency.
    #[inline]
    #[must_use]
    pub fn max_latency(&self) -> Duration {
        self.max_latency
    }

    /// Returns the failure probability.
    #[inline]
    #[must_use]
    pub fn failure_probability(&self) -> f64 {
        self.failure_probability
    }

    fn draw(&self, rng: &mut StdRng) -> (Duration, bool) {
        let min = self.min_latency.as_millis() as u64;
        let max = self.max_latency.as_millis() as u64;
        let latency_ms = if max > min {
            rng.random_range(min..max)
        } else {
            min
        };
        let fails = rng.random_bool(self.failure_probability);
        (Duration::from_millis(latency_ms), fails)
    }
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_MIN_LATENCY_MS),
            Duration::from_millis(DEFAULT_MAX_LATENCY_MS),
            DEFAULT_FAILURE_PROBABILITY,
        )
    }
}

/// Simulated remote source with random latency and random failures.
#[derive(Debug)]
pub struct SimulatedSource {
    name: SourceName,
    reading: Reading,
    profile: SimulationProfile,
    rng: Mutex<StdRng>,
}

impl SimulatedSource {
    /// Creates a source with the default profile and an OS-seeded generator.
    #[must_use]
    pub fn new(name: impl Into<SourceName>, reading: i32) -> Self {
        Self::with_rng(
            name,
            reading,
            SimulationProfile::default(),
            StdRng::from_os_rng(),
        )
    }

    /// Creates a source with a deterministic generator.
    #[must_use]
    pub fn seeded(
        name: impl Into<SourceName>,
        reading: i32,
        profile: SimulationProfile,
        seed: u64,
    ) -> Self {
        Self::with_rng(name, reading, profile, StdRng::seed_from_u64(seed))
    }

    /// Creates a source with an explicit profile and generator.
    #[must_use]
    pub fn with_rng(
        name: impl Into<SourceName>,
        reading: i32,
        profile: SimulationProfile,
        rng: StdRng,
    ) -> Self {
        Self {
            name: name.into(),
            reading: Reading::new(reading),
            profile,
            rng: Mutex::new(rng),
        }
    }

    /// Returns the simulation profile.
    #[inline]
    #[must_use]
    pub fn profile(&self) -> &SimulationProfile {
        &self.profile
    }

    /// Returns the reading produced on success.
    #[inline]
    #[must_use]
    pub fn reading(&self) -> Reading {
        self.reading
    }
}

#[async_trait]
impl WeatherSource for SimulatedSource {
    fn name(&self) -> &SourceName {
        &self.name
    }

    async fn fetch_reading(&self, _location: &Location) -> SourceResult<Option<Reading>> {
        let (latency, fails) = self.profile.draw(&mut self.rng.lock());
        tokio::time::sleep(latency).await;

        if fails {
            return Err(SourceError::unavailable(format!("Fail in {}", self.name)));
        }
        Ok(Some(self.reading))
    }
}

/// Builds the three reference sources (API1=24, API2=35, API3=54).
///
/// With `seed` set, source `i` uses seed `seed + i`.
#[must_use]
pub fn reference_sources(
    profile: SimulationProfile,
    seed: Option<u64>,
) -> Vec<Arc<dyn WeatherSource>> {
    REFERENCE_READINGS
        .iter()
        .zip(0u64..)
        .map(|(&(name, reading), i)| -> Arc<dyn WeatherSource> {
            match seed {
                Some(seed) => Arc::new(SimulatedSource::seeded(
                    name,
                    reading,
                    profile,
                    seed.wrapping_add(i),
                )),
                None => Arc::new(SimulatedSource::with_rng(
                    name,
                    reading,
                    profile,
                    StdRng::from_os_rng(),
                )),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn location() -> Location {
        Location::from("London")
    }

    #[test]
    fn default_profile_matches_reference() {
        let profile = SimulationProfile::default();
        assert_eq!(profile.min_latency(), Duration::from_secs(1));
        assert_eq!(profile.max_latency(), Duration::from_secs(3));
        assert_eq!(profile.failure_probability(), 0.5);
    }

    #[test]
    fn probability_is_clamped() {
        let profile = SimulationProfile::new(Duration::ZERO, Duration::ZERO, 1.7);
        assert_eq!(profile.failure_probability(), 1.0);
        let profile = SimulationProfile::new(Duration::ZERO, Duration::ZERO, f64::NAN);
        assert_eq!(profile.failure_probability(), 0.0);
    }

    #[test]
    fn draws_latency_within_bounds() {
        let profile = SimulationProfile::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let (latency, _) = profile.draw(&mut rng);
            assert!(latency >= Duration::from_secs(1));
            assert!(latency < Duration::from_secs(3));
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let profile = SimulationProfile::default();
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            assert_eq!(profile.draw(&mut a), profile.draw(&mut b));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reliable_source_returns_reading_after_latency() {
        let source = SimulatedSource::seeded(
            "API1",
            24,
            SimulationProfile::reliable(Duration::from_millis(300)),
            1,
        );

        let started = tokio::time::Instant::now();
        let reading = source.fetch(&location()).await.unwrap();

        assert_eq!(reading, Reading::new(24));
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(started.elapsed() < Duration::from_millis(310));
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_source_reports_its_name() {
        let source = SimulatedSource::seeded(
            "API2",
            35,
            SimulationProfile::new(Duration::from_millis(5), Duration::from_millis(10), 1.0),
            1,
        );

        let err = source.fetch(&location()).await.unwrap_err();
        assert_eq!(err, SourceError::unavailable("Fail in API2"));
    }

    #[test]
    fn reference_sources_are_named_in_order() {
        let sources = reference_sources(SimulationProfile::default(), Some(1));
        let names: Vec<&str> = sources.iter().map(|s| s.name().as_str()).collect();
        assert_eq!(names, vec!["API1", "API2", "API3"]);
    }
}
