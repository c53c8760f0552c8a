//! Debounced geocoding for live form edits
//!
//! Repeated city/country edits within the debounce window collapse to a
//! single lookup using only the latest values. Each reschedule aborts
//! the previous delayed task, so there is no queue to drain and no
//! timer-id bookkeeping.

use mosaic_common::geocode::{Coordinates, Geocoder};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Outcome of the most recent (possibly still pending) lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeocodeState {
    /// No lookup scheduled; an empty city never triggers one
    NotAttempted,
    /// A lookup is scheduled or running
    Pending,
    /// The lookup finished; `None` covers both misses and failures
    Resolved(Option<Coordinates>),
}

/// A cancellable, delayed geocode owned by the form session
pub struct DebouncedGeocoder {
    geocoder: Arc<dyn Geocoder>,
    delay: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    tx: watch::Sender<GeocodeState>,
}

impl DebouncedGeocoder {
    pub fn new(geocoder: Arc<dyn Geocoder>, delay: Duration) -> Self {
        let (tx, _) = watch::channel(GeocodeState::NotAttempted);
        Self {
            geocoder,
            delay,
            task: Mutex::new(None),
            tx,
        }
    }

    /// Schedule a lookup for the given place, cancelling any pending one.
    /// An empty city resets the state without ever calling the service.
    pub fn schedule(&self, city: &str, country: &str) {
        self.abort_pending();

        if city.trim().is_empty() {
            self.tx.send_replace(GeocodeState::NotAttempted);
            return;
        }

        self.tx.send_replace(GeocodeState::Pending);

        let geocoder = self.geocoder.clone();
        let tx = self.tx.clone();
        let delay = self.delay;
        let city = city.to_string();
        let country = country.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let result = geocoder.resolve(&city, &country).await;
            mosaic_common::metrics::record_geocode(result.is_some());
            debug!(city = %city, found = result.is_some(), "Debounced geocode resolved");

            tx.send_replace(GeocodeState::Resolved(result));
        });

        *self.lock_task() = Some(handle);
    }

    /// Cancel any pending lookup and reset the state
    pub fn cancel(&self) {
        self.abort_pending();
        self.tx.send_replace(GeocodeState::NotAttempted);
    }

    /// Watch lookup state changes
    pub fn subscribe(&self) -> watch::Receiver<GeocodeState> {
        self.tx.subscribe()
    }

    /// Current lookup state
    pub fn state(&self) -> GeocodeState {
        *self.tx.borrow()
    }

    fn abort_pending(&self) {
        if let Some(handle) = self.lock_task().take() {
            handle.abort();
        }
    }

    // A poisoned slot still holds a valid handle; recover it rather than
    // panicking inside Drop.
    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for DebouncedGeocoder {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mosaic_common::geocode::Place;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps a few known cities, counting lookups
    struct CityTable {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for CityTable {
        async fn resolve(&self, city: &str, _country: &str) -> Option<Coordinates> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match city {
                "Lagos" => Some(Coordinates {
                    latitude: 6.5244,
                    longitude: 3.3792,
                }),
                "Accra" => Some(Coordinates {
                    latitude: 5.6037,
                    longitude: -0.1870,
                }),
                _ => None,
            }
        }

        async fn reverse_resolve(&self, _lat: f64, _lon: f64) -> Option<Place> {
            None
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_collapse_to_latest() {
        let table = Arc::new(CityTable {
            calls: AtomicUsize::new(0),
        });
        let debouncer =
            DebouncedGeocoder::new(table.clone(), Duration::from_millis(1000));
        let mut rx = debouncer.subscribe();

        debouncer.schedule("Lag", "Nigeria");
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule("Lagos", "Nigeria");
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule("Accra", "Ghana");

        let state = *rx
            .wait_for(|s| matches!(s, GeocodeState::Resolved(_)))
            .await
            .unwrap();

        assert_eq!(table.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            state,
            GeocodeState::Resolved(Some(Coordinates {
                latitude: 5.6037,
                longitude: -0.1870,
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_city_never_invokes_service() {
        let table = Arc::new(CityTable {
            calls: AtomicUsize::new(0),
        });
        let debouncer = DebouncedGeocoder::new(table.clone(), Duration::from_millis(1000));

        debouncer.schedule("", "Nigeria");
        tokio::time::sleep(Duration::from_millis(3000)).await;

        assert_eq!(debouncer.state(), GeocodeState::NotAttempted);
        assert_eq!(table.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_resets_state() {
        let table = Arc::new(CityTable {
            calls: AtomicUsize::new(0),
        });
        let debouncer = DebouncedGeocoder::new(table.clone(), Duration::from_millis(1000));

        debouncer.schedule("Lagos", "Nigeria");
        assert_eq!(debouncer.state(), GeocodeState::Pending);

        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(3000)).await;

        assert_eq!(debouncer.state(), GeocodeState::NotAttempted);
        assert_eq!(table.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_resolves_to_none() {
        let table = Arc::new(CityTable {
            calls: AtomicUsize::new(0),
        });
        let debouncer = DebouncedGeocoder::new(table, Duration::from_millis(1000));
        let mut rx = debouncer.subscribe();

        debouncer.schedule("Atlantis", "");

        let state = *rx
            .wait_for(|s| matches!(s, GeocodeState::Resolved(_)))
            .await
            .unwrap();
        assert_eq!(state, GeocodeState::Resolved(None));
    }
}
