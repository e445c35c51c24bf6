//! Run parameters shared by every process
use crate::topology::ProcessTopology;
use crate::traits::Transport;
use crate::types::{Error, Result};
use log::debug;

/// Global extent and stopping criteria of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParameters {
    /// Rows of the global grid
    pub rows: usize,
    /// Columns of the global grid
    pub cols: usize,
    /// Convergence threshold
    pub epsilon: f64,
    /// Maximum number of iterations
    pub max_iter: usize,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            rows: 102,
            cols: 102,
            epsilon: 1e-2,
            max_iter: 10000,
        }
    }
}

impl RunParameters {
    /// Parameters for a square `dim x dim` grid.
    pub fn square(dim: usize, epsilon: f64, max_iter: usize) -> Self {
        Self {
            rows: dim,
            cols: dim,
            epsilon,
            max_iter,
        }
    }

    /// Check that the parameters describe a solvable problem.
    ///
    /// A zero or negative epsilon is accepted; such a run stops at the
    /// iteration cap unless the iterate becomes exactly stationary.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(Error::Configuration(format!(
                "The grid must not be empty, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.epsilon.is_nan() {
            return Err(Error::Configuration(
                "Epsilon must be a number, got NaN".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace these parameters by those of rank 0 on every process.
    pub fn broadcast<C: Transport>(&mut self, topology: &ProcessTopology<C>) {
        let mut words = [
            self.rows as u64,
            self.cols as u64,
            self.epsilon.to_bits(),
            self.max_iter as u64,
        ];
        topology.transport().broadcast_words(&mut words, 0);
        self.rows = words[0] as usize;
        self.cols = words[1] as usize;
        self.epsilon = f64::from_bits(words[2]);
        self.max_iter = words[3] as usize;
        debug!("Rank {}: run parameters {:?}", topology.rank(), self);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::{LocalGroup, SerialTransport};
    use std::thread;

    #[test]
    fn test_defaults() {
        let params = RunParameters::default();
        assert_eq!((params.rows, params.cols), (102, 102));
        assert_eq!(params.epsilon, 1e-2);
        assert_eq!(params.max_iter, 10000);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(RunParameters::square(0, 1e-3, 10).validate().is_err());
        assert!(RunParameters::square(4, f64::NAN, 10).validate().is_err());
        assert!(RunParameters::square(4, 0.0, 0).validate().is_ok());
        assert!(RunParameters::square(4, -1.0, 10).validate().is_ok());
        assert!(RunParameters::square(4, f64::INFINITY, 10).validate().is_ok());
    }

    #[test]
    fn test_broadcast_serial() {
        let mut params = RunParameters::square(8, 1e-5, 3);
        params.broadcast(&ProcessTopology::new(SerialTransport));
        assert_eq!(params, RunParameters::square(8, 1e-5, 3));
    }

    #[test]
    fn test_broadcast_from_rank_zero() {
        let endpoints = LocalGroup::new(4).unwrap();
        let received = thread::scope(|s| {
            let handles = endpoints
                .into_iter()
                .map(|t| {
                    s.spawn(move || {
                        let topology = ProcessTopology::new(t);
                        let mut params = if topology.rank() == 0 {
                            RunParameters::square(64, 1.5e-7, 250)
                        } else {
                            RunParameters::default()
                        };
                        params.broadcast(&topology);
                        params
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });
        assert!(received
            .iter()
            .all(|p| *p == RunParameters::square(64, 1.5e-7, 250)));
    }
}
