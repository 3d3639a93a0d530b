use std::{future::Future, pin::Pin, sync::Arc};

use tokio::sync::OnceCell;
use tracing::info;

use crate::error::Result;

type Loader<T> =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<Arc<T>>> + Send>> + Send + Sync>;

/// An inference model loaded on first use and shared afterwards.
///
/// Concurrent first callers wait on a single load. A failed load leaves the
/// handle empty so the next caller tries again.
pub struct LazyCapability<T: ?Sized> {
    name: &'static str,
    cell: OnceCell<Arc<T>>,
    loader: Loader<T>,
}

impl<T: ?Sized + Send + Sync + 'static> LazyCapability<T> {
    pub fn new<F, Fut>(name: &'static str, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<T>>> + Send + 'static,
    {
        Self {
            name,
            cell: OnceCell::new(),
            loader: Box::new(move || Box::pin(load())),
        }
    }

    /// A handle that is already loaded
    pub fn ready(name: &'static str, value: Arc<T>) -> Self {
        let preloaded = Arc::clone(&value);
        Self {
            name,
            cell: OnceCell::new_with(Some(preloaded)),
            loader: Box::new(move || {
                let value = Arc::clone(&value);
                Box::pin(async move { Ok(value) })
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the model has been loaded. Never triggers a load.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> Result<Arc<T>> {
        let value = self
            .cell
            .get_or_try_init(|| {
                info!("Loading {} model...", self.name);
                (self.loader)()
            })
            .await?;
        Ok(Arc::clone(value))
    }
}
