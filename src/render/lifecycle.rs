//! GPU resource lifecycle
//!
//! GPU handles die with their context (surface loss, app pause). Instead of
//! recreating objects implicitly, the owner holds them in a
//! `ResourceLifecycle` and calls `reinitialize` once a context is available
//! again.

/// Where a set of resources is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Never built, or the last build failed
    Uninitialized,
    /// Built and usable
    Ready,
    /// Context lost; handles dropped until the next `reinitialize`
    Invalidated,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Uninitialized => write!(f, "uninitialized"),
            LifecycleState::Ready => write!(f, "ready"),
            LifecycleState::Invalidated => write!(f, "invalidated"),
        }
    }
}

/// Owner of resources that must be rebuilt after context loss
#[derive(Debug)]
pub struct ResourceLifecycle<R> {
    resources: Option<R>,
    state: LifecycleState,
    generation: u64,
}

impl<R> Default for ResourceLifecycle<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ResourceLifecycle<R> {
    pub fn new() -> Self {
        Self {
            resources: None,
            state: LifecycleState::Uninitialized,
            generation: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    /// Successful builds so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop any existing resources and build new ones.
    ///
    /// On failure nothing is held and the state is `Uninitialized`.
    pub fn reinitialize<E, F>(&mut self, factory: F) -> Result<&mut R, E>
    where
        F: FnOnce() -> Result<R, E>,
    {
        // old handles must go before the new context allocates
        self.resources = None;
        self.state = LifecycleState::Uninitialized;

        let resources = factory()?;
        self.generation += 1;
        self.state = LifecycleState::Ready;
        tracing::debug!("GPU resources ready (generation {})", self.generation);
        Ok(self.resources.insert(resources))
    }

    /// Forget all handles after context loss.
    pub fn invalidate(&mut self) {
        if self.resources.take().is_some() {
            tracing::debug!("GPU resources invalidated (generation {})", self.generation);
        }
        if self.state == LifecycleState::Ready {
            self.state = LifecycleState::Invalidated;
        }
    }

    pub fn get(&self) -> Option<&R> {
        self.resources.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.resources.as_mut()
    }
}
