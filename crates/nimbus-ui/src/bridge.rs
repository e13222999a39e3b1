use std::sync::OnceLock;

// Static tokio runtime that lives for the duration of the application
static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Initialize the background runtime (idempotent).
/// Returns `None` if the runtime could not be built.
pub fn init_runtime() -> Option<tokio::runtime::Handle> {
    if let Some(handle) = get_runtime() {
        return Some(handle);
    }

    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("nimbus-tokio")
        .build()
    {
        Ok(runtime) => {
            // Another thread may have won the race; its runtime is kept.
            let _ = RUNTIME.set(runtime);
            get_runtime()
        }
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            None
        }
    }
}

/// Handle to the background runtime, if it has been initialized
pub fn get_runtime() -> Option<tokio::runtime::Handle> {
    RUNTIME.get().map(|r| r.handle().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_runtime_is_idempotent() {
        assert!(init_runtime().is_some());
        assert!(init_runtime().is_some());
        assert!(get_runtime().is_some());
    }
}
