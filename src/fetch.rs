//! Background fetch slot with stale-response protection.
//!
//! Network calls run on worker threads and report back over an mpsc channel
//! polled once per frame. Every request carries a generation token; a
//! response whose token no longer matches the latest generation is a stale
//! answer to a superseded request and is discarded instead of overwriting
//! newer state.

use crate::api::ApiError;
use std::sync::mpsc::{self, Receiver, TryRecvError};

pub struct Fetch<T> {
    generation: u64,
    receiver: Option<Receiver<(u64, Result<T, ApiError>)>>,
    pub data: Option<T>,
    pub error: Option<String>,
    loading: bool,
}

impl<T> Default for Fetch<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            receiver: None,
            data: None,
            error: None,
            loading: false,
        }
    }
}

impl<T: Send + 'static> Fetch<T> {
    /// Kick off a request on a worker thread, superseding any in-flight one.
    pub fn start(&mut self, job: impl FnOnce() -> Result<T, ApiError> + Send + 'static) {
        self.generation += 1;
        self.loading = true;
        self.error = None;

        let generation = self.generation;
        let (tx, rx) = mpsc::channel();
        self.receiver = Some(rx);

        std::thread::spawn(move || {
            let result = job();
            // Receiver may be gone if the widget was dropped meanwhile.
            let _ = tx.send((generation, result));
        });
    }

    /// Drain the channel; apply the newest result matching the current
    /// generation, drop everything stale.
    pub fn poll(&mut self) {
        let Some(rx) = self.receiver.take() else {
            return;
        };

        loop {
            match rx.try_recv() {
                Ok((generation, result)) if generation == self.generation => {
                    match result {
                        Ok(data) => {
                            self.data = Some(data);
                            self.error = None;
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "fetch failed");
                            self.error = Some(err.to_string());
                        }
                    }
                    self.loading = false;
                    return;
                }
                Ok((generation, _)) => {
                    tracing::debug!(generation, "discarding stale response");
                }
                Err(TryRecvError::Empty) => {
                    self.receiver = Some(rx);
                    return;
                }
                Err(TryRecvError::Disconnected) => {
                    self.error = Some("request was cancelled".to_string());
                    self.loading = false;
                    return;
                }
            }
        }
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Drop current data and error without starting a new request.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.receiver = None;
        self.data = None;
        self.error = None;
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn poll_until_done(fetch: &mut Fetch<u32>) {
        for _ in 0..200 {
            fetch.poll();
            if !fetch.loading() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("fetch did not settle");
    }

    #[test]
    fn completed_fetch_stores_data() {
        let mut fetch = Fetch::default();
        fetch.start(|| Ok(42));
        poll_until_done(&mut fetch);
        assert_eq!(fetch.data, Some(42));
        assert!(fetch.error.is_none());
    }

    #[test]
    fn failed_fetch_stores_error() {
        let mut fetch: Fetch<u32> = Fetch::default();
        fetch.start(|| Err(ApiError::Http(reqwest::StatusCode::BAD_GATEWAY)));
        poll_until_done(&mut fetch);
        assert!(fetch.data.is_none());
        assert!(fetch.error.as_deref().unwrap().contains("502"));
    }

    #[test]
    fn superseded_response_does_not_overwrite() {
        let mut fetch = Fetch::default();
        // slow first request, superseded by a fast second one
        fetch.start(|| {
            std::thread::sleep(Duration::from_millis(50));
            Ok(1)
        });
        fetch.start(|| Ok(2));
        poll_until_done(&mut fetch);
        assert_eq!(fetch.data, Some(2));

        // give the stale response time to arrive, then poll again
        std::thread::sleep(Duration::from_millis(100));
        fetch.poll();
        assert_eq!(fetch.data, Some(2));
    }
}
