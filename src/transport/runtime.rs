//! Process-wide MPI environment
//!
//! MPI may be initialised and finalised only once per process. [Runtime]
//! handles share one [Universe]; the first [Runtime::acquire] initialises
//! MPI and dropping the last handle finalises it.
use crate::types::{Error, Result};
use log::debug;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use std::sync::{Arc, Mutex, Weak};

lazy_static! {
    static ref UNIVERSE: Mutex<Weak<Universe>> = Mutex::new(Weak::new());
}

/// Shared handle on the MPI environment of this process.
#[derive(Clone)]
pub struct Runtime {
    universe: Arc<Universe>,
}

impl Runtime {
    /// Get a handle, initialising MPI if no handle is alive.
    ///
    /// Fails if MPI was initialised by someone else or has already been
    /// finalised, since it cannot be started a second time.
    pub fn acquire() -> Result<Self> {
        let mut slot = UNIVERSE.lock().map_err(|_| {
            Error::Configuration("MPI runtime guard was poisoned".to_string())
        })?;
        if let Some(universe) = slot.upgrade() {
            return Ok(Self { universe });
        }
        if mpi::environment::is_finalized() {
            return Err(Error::Configuration(
                "MPI has already been finalised in this process".to_string(),
            ));
        }
        let universe = mpi::initialize().ok_or_else(|| {
            Error::Configuration("MPI was initialised outside of this runtime".to_string())
        })?;
        debug!("Initialised MPI");
        let universe = Arc::new(universe);
        *slot = Arc::downgrade(&universe);
        Ok(Self { universe })
    }

    /// The world communicator
    pub fn world(&self) -> SimpleCommunicator {
        self.universe.world()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if Arc::strong_count(&self.universe) == 1 {
            debug!("Finalising MPI");
        }
    }
}
