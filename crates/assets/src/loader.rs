use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use tracing::{debug, error, info};

use crate::decode::{decode_image, decode_model, ImageData, ModelData};
use crate::AssetError;

/// One asynchronously decoded asset.
///
/// A slot decodes at most once: the first `request` spawns a worker, later
/// calls are no-ops, and the result (success or failure) is kept for good.
pub enum AssetSlot<T> {
    Idle,
    Loading {
        label: String,
        receiver: Receiver<Result<T, AssetError>>,
    },
    Ready(Arc<T>),
    Failed,
}

impl<T> Default for AssetSlot<T> {
    fn default() -> Self {
        AssetSlot::Idle
    }
}

impl<T: Send + 'static> AssetSlot<T> {
    pub fn request(
        &mut self,
        label: impl Into<String>,
        job: impl FnOnce() -> Result<T, AssetError> + Send + 'static,
    ) {
        if !matches!(self, AssetSlot::Idle) {
            return;
        }
        let label = label.into();
        let (sender, receiver) = bounded(1);
        let spawned = thread::Builder::new()
            .name(format!("asset-{label}"))
            .spawn(move || {
                let _ = sender.send(job());
            });
        match spawned {
            Ok(_) => {
                debug!(asset = %label, "asset decode started");
                *self = AssetSlot::Loading { label, receiver };
            }
            Err(err) => {
                error!(asset = %label, error = %err, "failed to spawn asset worker");
                *self = AssetSlot::Failed;
            }
        }
    }

    /// Non-blocking check for the decoded value.
    pub fn poll(&mut self) -> Option<Arc<T>> {
        let outcome = match self {
            AssetSlot::Ready(value) => return Some(Arc::clone(value)),
            AssetSlot::Idle | AssetSlot::Failed => return None,
            AssetSlot::Loading { label, receiver } => match receiver.try_recv() {
                Ok(Ok(value)) => {
                    info!(asset = %label, "asset ready");
                    Some(Arc::new(value))
                }
                Ok(Err(err)) => {
                    error!(asset = %label, error = %err, "asset decode failed");
                    None
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    error!(asset = %label, "asset worker exited without a result");
                    None
                }
            },
        };
        match outcome {
            Some(value) => {
                *self = AssetSlot::Ready(Arc::clone(&value));
                Some(value)
            }
            None => {
                *self = AssetSlot::Failed;
                None
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AssetSlot::Failed)
    }
}

/// Background loader for the image and model the sequence depends on.
pub struct AssetLoader {
    image_path: PathBuf,
    model_path: PathBuf,
    max_pixels: usize,
    image: AssetSlot<ImageData>,
    model: AssetSlot<ModelData>,
}

impl AssetLoader {
    pub fn new(image_path: PathBuf, model_path: PathBuf, max_pixels: usize) -> Self {
        Self {
            image_path,
            model_path,
            max_pixels,
            image: AssetSlot::Idle,
            model: AssetSlot::Idle,
        }
    }

    /// Kicks off both decodes; safe to call repeatedly.
    pub fn request_all(&mut self) {
        let path = self.image_path.clone();
        let max_pixels = self.max_pixels;
        self.image
            .request("image", move || decode_image(&path, max_pixels));
        let path = self.model_path.clone();
        self.model.request("model", move || decode_model(&path));
    }

    pub fn image(&mut self) -> Option<Arc<ImageData>> {
        self.image.poll()
    }

    pub fn model(&mut self) -> Option<Arc<ModelData>> {
        self.model.poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn wait_for<T: Send + 'static>(slot: &mut AssetSlot<T>) -> Option<Arc<T>> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(value) = slot.poll() {
                return Some(value);
            }
            if slot.is_failed() {
                return None;
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn decodes_once_even_when_requested_repeatedly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut slot = AssetSlot::default();
        for _ in 0..3 {
            let runs = Arc::clone(&runs);
            slot.request("counter", move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(42u32)
            });
        }
        let first = wait_for(&mut slot).expect("value");
        slot.request("counter", || Ok(7u32));
        let second = slot.poll().expect("cached");
        assert_eq!(*first, 42);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_sticky() {
        let mut slot: AssetSlot<u32> = AssetSlot::default();
        slot.request("broken", || Err(AssetError::Empty("nothing here")));
        assert!(wait_for(&mut slot).is_none());
        assert!(slot.is_failed());
        slot.request("broken", || Ok(1));
        assert!(slot.poll().is_none());
    }

    #[test]
    fn idle_slot_yields_nothing() {
        let mut slot: AssetSlot<u32> = AssetSlot::default();
        assert!(slot.poll().is_none());
        assert!(matches!(slot, AssetSlot::Idle));
    }

    #[test]
    fn loader_reports_missing_files_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = AssetLoader::new(dir.path().join("a.png"), dir.path().join("b.gltf"), 16);
        loader.request_all();
        assert!(wait_for(&mut loader.image).is_none());
        assert!(wait_for(&mut loader.model).is_none());
    }
}
