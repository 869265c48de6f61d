use crate::config::PacingConfig;
use rand::Rng;
use std::f64::consts::PI;
use std::time::Duration;

/// Source of randomized wait times
///
/// The scheduler only depends on this trait, so tests can substitute fixed
/// values and run pacing logic without randomness.
pub trait DelaySampler {
    /// Ordinary delay between two requests
    fn jittered_delay(&mut self) -> Duration;

    /// Number of requests until the next reading pause
    fn reading_pause_interval(&mut self) -> u32;

    /// Length of a reading pause
    fn reading_pause_duration(&mut self) -> Duration;

    /// Wait after the platform rejects a request for rate limiting
    fn rate_limit_backoff(&mut self) -> Duration;
}

/// Draws from a normal distribution and clamps the result into `[min, max]`
///
/// Uses the Box-Muller transform. All arguments are in seconds.
pub fn jittered_delay<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    stddev: f64,
    min: f64,
    max: f64,
) -> f64 {
    // 1 - gen() keeps u1 in (0, 1] so ln(u1) is finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();

    (mean + stddev * z).clamp(min, max)
}

/// Delay sampler backed by a random number generator and configured bounds
pub struct RandomDelaySampler<R: Rng> {
    config: PacingConfig,
    rng: R,
}

impl RandomDelaySampler<rand::rngs::StdRng> {
    /// Creates a sampler seeded from the operating system
    pub fn from_config(config: PacingConfig) -> Self {
        use rand::SeedableRng;
        Self::with_rng(config, rand::rngs::StdRng::from_entropy())
    }
}

impl<R: Rng> RandomDelaySampler<R> {
    /// Creates a sampler with an explicit generator
    pub fn with_rng(config: PacingConfig, rng: R) -> Self {
        Self { config, rng }
    }
}

impl<R: Rng> DelaySampler for RandomDelaySampler<R> {
    fn jittered_delay(&mut self) -> Duration {
        let seconds = jittered_delay(
            &mut self.rng,
            self.config.delay_mean,
            self.config.delay_stddev,
            self.config.delay_min,
            self.config.delay_max,
        );
        Duration::from_secs_f64(seconds)
    }

    fn reading_pause_interval(&mut self) -> u32 {
        self.rng
            .gen_range(self.config.pause_every_min..=self.config.pause_every_max)
    }

    fn reading_pause_duration(&mut self) -> Duration {
        Duration::from_secs(
            self.rng
                .gen_range(self.config.pause_min..=self.config.pause_max),
        )
    }

    fn rate_limit_backoff(&mut self) -> Duration {
        Duration::from_secs(
            self.rng
                .gen_range(self.config.backoff_min..=self.config.backoff_max),
        )
    }
}
