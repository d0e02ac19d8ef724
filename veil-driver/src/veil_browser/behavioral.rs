use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
/// Produces human-like delays so request timing does not look scripted.
pub struct Pacer {}

impl Pacer {
    pub fn new() -> Self {
        Self {}
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        let mut rng = OsRng;
        let ms = rng.gen_range(min..=max);
        sleep(Duration::from_millis(ms)).await;
    }

    /// Short jittered pause used to let a page settle after load.
    pub async fn settle(&self) {
        self.random_delay(250, 700).await;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}
