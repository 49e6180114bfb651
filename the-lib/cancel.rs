use std::sync::{
  Arc,
  atomic::{
    AtomicBool,
    Ordering,
  },
};

/// Shared flag a caller flips to abandon in-flight work. Clones observe the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}
