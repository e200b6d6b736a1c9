use std::sync::atomic::{AtomicU32, Ordering};

/// Compteur de modifications d'un topic
///
/// Lu sans effet de bord, incrémenté par les sites de mutation. Un compteur
/// par topic, porté par le handler du topic.
#[derive(Debug, Default)]
pub struct UpdateCounter(AtomicU32);

impl UpdateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Incrémente le compteur et retourne la nouvelle valeur
    pub fn inc(&self) -> u32 {
        self.0.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }
}
