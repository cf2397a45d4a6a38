//! Synthetic competitor price generator
//!
//! Each iteration picks a product uniformly at random, draws a ratio
//! `u ~ Uniform(price_variation_min, price_variation_max)`, and pushes a
//! `PriceEvent` with `competitor_price = round(our_price * u, 2)` onto the
//! inbound queue. It then sleeps for a random delay in
//! `[min_delay, max_delay]`. A failed iteration is logged and followed by a
//! fixed one-second backoff; the loop itself never exits.

use {
    crate::{
        catalog::Catalog,
        config::SimulationSettings,
        event::{round_price, PriceEvent},
        queue::EventQueue,
    },
    chrono::Utc,
    rand::{rngs::StdRng, Rng, SeedableRng},
    std::time::Duration,
};

pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum EmitterError {
    InvalidPrice { product_id: u32, price: f64 },
}

impl std::fmt::Display for EmitterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmitterError::InvalidPrice { product_id, price } => write!(
                f,
                "Generated non-positive competitor price {} for product {}",
                price, product_id
            ),
        }
    }
}

impl std::error::Error for EmitterError {}

#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub variation_min: f64,
    pub variation_max: f64,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self::from(&SimulationSettings::default())
    }
}

impl From<&SimulationSettings> for EmitterConfig {
    fn from(sim: &SimulationSettings) -> Self {
        Self {
            min_delay: Duration::from_secs_f64(sim.min_delay_secs),
            max_delay: Duration::from_secs_f64(sim.max_delay_secs),
            variation_min: sim.price_variation_min,
            variation_max: sim.price_variation_max,
        }
    }
}

fn sample_between<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high <= low {
        low
    } else {
        rng.gen_range(low..high)
    }
}

pub struct PriceEmitter<R = StdRng> {
    catalog: Catalog,
    queue: EventQueue<PriceEvent>,
    config: EmitterConfig,
    rng: R,
    next_seq: u64,
}

impl PriceEmitter<StdRng> {
    pub fn new(catalog: Catalog, queue: EventQueue<PriceEvent>, config: EmitterConfig) -> Self {
        Self::with_rng(catalog, queue, config, StdRng::from_entropy())
    }
}

impl<R: Rng + Send> PriceEmitter<R> {
    pub fn with_rng(catalog: Catalog, queue: EventQueue<PriceEvent>, config: EmitterConfig, rng: R) -> Self {
        Self {
            catalog,
            queue,
            config,
            rng,
            next_seq: 0,
        }
    }

    /// Build one event without enqueuing it
    pub fn generate(&mut self) -> Result<PriceEvent, EmitterError> {
        let product = self.catalog.choose(&mut self.rng).clone();
        let ratio = sample_between(&mut self.rng, self.config.variation_min, self.config.variation_max);
        let competitor_price = round_price(product.our_price * ratio);

        if competitor_price <= 0.0 || !competitor_price.is_finite() {
            return Err(EmitterError::InvalidPrice {
                product_id: product.id,
                price: competitor_price,
            });
        }

        let event = PriceEvent::new(self.next_seq, &product, competitor_price, Utc::now());
        self.next_seq += 1;
        Ok(event)
    }

    /// Generate one event and push it onto the inbound queue
    pub fn emit_one(&mut self) -> Result<PriceEvent, EmitterError> {
        let event = self.generate()?;
        self.queue.push(event.clone());
        log::debug!(
            "Added pricing event #{} to queue: {} ${:.2}",
            event.seq,
            event.product_name,
            event.competitor_price
        );
        Ok(event)
    }

    pub fn next_delay(&mut self) -> Duration {
        let secs = sample_between(
            &mut self.rng,
            self.config.min_delay.as_secs_f64(),
            self.config.max_delay.as_secs_f64(),
        );
        Duration::from_secs_f64(secs)
    }

    async fn tick(&mut self) {
        match self.emit_one() {
            Ok(_) => {
                let delay = self.next_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                } else {
                    tokio::task::yield_now().await;
                }
            }
            Err(e) => {
                log::error!("❌ Price emitter error: {}", e);
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
        }
    }

    /// Run `count` iterations, including their inter-event sleeps
    pub async fn emit_n(&mut self, count: usize) {
        for _ in 0..count {
            self.tick().await;
        }
    }

    /// Emit forever
    pub async fn run(mut self) {
        log::info!("📈 Starting price emitter simulation ({} products)", self.catalog.len());
        loop {
            self.tick().await;
        }
    }
}
