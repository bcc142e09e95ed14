//! Shared helpers for the pipeline's tests
//!
//! Real decodes read files and burn CPU. These fakes let the tests
//! control exactly when a decode finishes, fails, or hangs waiting
//! for cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use image::DynamicImage;

use crate::data::{AssetKey, CancellationToken};
use crate::error::DecodeError;
use crate::source::decoder::ImageDecoder;
use crate::source::picture::DecodedImage;

/// A solid bitmap of the given dimensions
pub(crate) fn test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::new_rgba8(width, height)
}

/// A ready decoded image for cache tests
pub(crate) fn decoded_image(key: &AssetKey) -> Arc<DecodedImage> {
    Arc::new(DecodedImage::new(key.clone(), test_image(4, 4), 0))
}

/// Something a gated fake decode can be parked on until the test
/// releases it.
pub(crate) struct Gate {
    released: Mutex<bool>,
    signal: Condvar,
}

impl Gate {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            released: Mutex::new(false),
            signal: Condvar::new(),
        })
    }

    pub(crate) fn open(&self) {
        *self.released.lock().unwrap() = true;
        self.signal.notify_all();
    }

    /// Wait for the gate to open. Returns false when the token fires
    /// or the timeout runs out first.
    fn wait(&self, token: &CancellationToken, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut released = self.released.lock().unwrap();
        while !*released {
            if token.is_cancelled() || Instant::now() >= deadline {
                return false;
            }
            let (guard, _) = self
                .signal
                .wait_timeout(released, Duration::from_millis(10))
                .unwrap();
            released = guard;
        }
        true
    }
}

/// What a [`FakeDecoder`] should do with one key.
#[derive(Clone)]
pub(crate) enum DecodePlan {
    /// Return a bitmap of the given size immediately
    Succeed { width: u32, height: u32 },
    /// Fail with the given message
    Fail(String),
    /// Park until the gate opens, then succeed
    Gated {
        gate: Arc<Gate>,
        width: u32,
        height: u32,
    },
    /// Park until the token fires, then report cancellation
    WaitForCancel,
}

/// Scriptable decoder. Keys without a plan succeed with a 64x64
/// bitmap.
pub(crate) struct FakeDecoder {
    plans: Mutex<HashMap<AssetKey, DecodePlan>>,
    started: Mutex<Vec<AssetKey>>,
}

impl FakeDecoder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            plans: Mutex::new(HashMap::new()),
            started: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn plan(&self, key: impl Into<AssetKey>, plan: DecodePlan) {
        self.plans.lock().unwrap().insert(key.into(), plan);
    }

    /// How many decodes have started for `key`
    pub(crate) fn decodes_started(&self, key: &AssetKey) -> usize {
        self.started.lock().unwrap().iter().filter(|k| *k == key).count()
    }
}

impl ImageDecoder for FakeDecoder {
    fn decode(
        &self,
        key: &AssetKey,
        token: &CancellationToken,
    ) -> Result<DynamicImage, DecodeError> {
        self.started.lock().unwrap().push(key.clone());

        let plan = self
            .plans
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or(DecodePlan::Succeed {
                width: 64,
                height: 64,
            });

        match plan {
            DecodePlan::Succeed { width, height } => Ok(test_image(width, height)),
            DecodePlan::Fail(message) => Err(DecodeError::Open {
                key: key.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, message),
            }),
            DecodePlan::Gated {
                gate,
                width,
                height,
            } => {
                if gate.wait(token, Duration::from_secs(5)) {
                    Ok(test_image(width, height))
                } else if token.is_cancelled() {
                    Err(DecodeError::Cancelled)
                } else {
                    Err(DecodeError::Open {
                        key: key.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            "gate never opened",
                        ),
                    })
                }
            }
            DecodePlan::WaitForCancel => {
                let deadline = Instant::now() + Duration::from_secs(5);
                while Instant::now() < deadline {
                    if token.is_cancelled() {
                        return Err(DecodeError::Cancelled);
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Err(DecodeError::Open {
                    key: key.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "was never cancelled",
                    ),
                })
            }
        }
    }
}
