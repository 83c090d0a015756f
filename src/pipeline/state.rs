//! State shared between tier tasks

use crate::activity::ActivityAlert;
use crate::technical::ActiveSet;
use crate::universe::Universe;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Latest tier outputs; each tier reads what the previous one last published
pub struct ScanState {
    universe: RwLock<Arc<Universe>>,
    alerts: RwLock<Arc<Vec<ActivityAlert>>>,
    active: Mutex<ActiveSet>,
}

impl ScanState {
    pub fn new(active: ActiveSet) -> Self {
        Self {
            universe: RwLock::new(Arc::new(Universe::default())),
            alerts: RwLock::new(Arc::new(Vec::new())),
            active: Mutex::new(active),
        }
    }

    pub fn universe(&self) -> Arc<Universe> {
        self.universe.read().clone()
    }

    pub fn set_universe(&self, universe: Arc<Universe>) {
        *self.universe.write() = universe;
    }

    pub fn latest_alerts(&self) -> Arc<Vec<ActivityAlert>> {
        self.alerts.read().clone()
    }

    /// Publish a Tier 2 cycle's alerts and extend the working set
    pub fn record_alerts(&self, alerts: Vec<ActivityAlert>) {
        self.active.lock().record(&alerts);
        *self.alerts.write() = Arc::new(alerts);
    }

    /// Current Tier 3 working set
    pub fn active_tickers(&self, now: DateTime<Utc>) -> Vec<String> {
        self.active.lock().select(now)
    }

    pub fn active_len(&self) -> usize {
        self.active.lock().len()
    }
}
