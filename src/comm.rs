//! Message passing between the ranks of a parallel run.

use std::{
    any::Any,
    sync::mpsc::{channel, Receiver, Sender},
};

use crate::errors::ExchangeError;

/// Element types that can be sent between ranks.
#[cfg(not(feature = "mpi"))]
pub trait Datum: Copy + Default + Send + 'static {}

/// Element types that can be sent between ranks.
#[cfg(feature = "mpi")]
pub trait Datum: Copy + Default + Send + 'static + mpi::datatype::Equivalence {}

impl Datum for f64 {}
impl Datum for i64 {}
impl Datum for u64 {}

/// Rank introspection, collectives and paired point to point exchange.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Send `send_counts[k]` to rank `k` and return the count received from every rank.
    fn all_to_all_counts(&self, send_counts: &[usize]) -> Result<Vec<usize>, ExchangeError>;

    /// Global minimum of `value` over all ranks.
    fn all_reduce_min(&self, value: f64) -> Result<f64, ExchangeError>;

    /// Send `send` to `partner` and simultaneously receive exactly `recv.len()` elements from it.
    fn send_recv<T: Datum>(
        &self,
        send: &[T],
        recv: &mut [T],
        partner: usize,
    ) -> Result<(), ExchangeError>;
}

/// The single rank of a serial run.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_to_all_counts(&self, send_counts: &[usize]) -> Result<Vec<usize>, ExchangeError> {
        if send_counts.len() != 1 {
            return Err(ExchangeError::MalformedExport(format!(
                "expected 1 send count, got {}",
                send_counts.len()
            )));
        }
        Ok(send_counts.to_vec())
    }

    fn all_reduce_min(&self, value: f64) -> Result<f64, ExchangeError> {
        Ok(value)
    }

    fn send_recv<T: Datum>(
        &self,
        send: &[T],
        recv: &mut [T],
        partner: usize,
    ) -> Result<(), ExchangeError> {
        if partner != 0 {
            return Err(ExchangeError::Disconnected(partner));
        }
        if send.len() != recv.len() {
            return Err(ExchangeError::SizeMismatch {
                partner,
                expected: recv.len(),
                received: send.len(),
            });
        }
        recv.copy_from_slice(send);
        Ok(())
    }
}

type Message = Box<dyn Any + Send>;

/// One rank of a world of in-process ranks, each meant to live on its own thread.
///
/// Every ordered pair of ranks has its own channel, so messages between two ranks are received in
/// the order they were sent.
pub struct ThreadComm {
    rank: usize,
    senders: Vec<Sender<Message>>,
    receivers: Vec<Receiver<Message>>,
}

impl ThreadComm {
    /// Create the communicators of all `size` ranks.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        // channels[from][to]
        let mut senders: Vec<Vec<Sender<Message>>> = (0..size).map(|_| vec![]).collect();
        let mut receivers: Vec<Vec<Receiver<Message>>> = (0..size).map(|_| vec![]).collect();
        for from in 0..size {
            for to in 0..size {
                let (tx, rx) = channel();
                senders[from].push(tx);
                // receivers[to] is indexed by `from`
                receivers[to].push(rx);
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| ThreadComm {
                rank,
                senders,
                receivers,
            })
            .collect()
    }

    fn send<T: Send + 'static>(&self, to: usize, data: Vec<T>) -> Result<(), ExchangeError> {
        self.senders
            .get(to)
            .ok_or(ExchangeError::Disconnected(to))?
            .send(Box::new(data))
            .map_err(|_| ExchangeError::Disconnected(to))
    }

    fn receive<T: Send + 'static>(&self, from: usize) -> Result<Vec<T>, ExchangeError> {
        let message = self
            .receivers
            .get(from)
            .ok_or(ExchangeError::Disconnected(from))?
            .recv()
            .map_err(|_| ExchangeError::Disconnected(from))?;
        message
            .downcast::<Vec<T>>()
            .map(|data| *data)
            .map_err(|_| ExchangeError::PropertyType(format!("message from rank {from}")))
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn all_to_all_counts(&self, send_counts: &[usize]) -> Result<Vec<usize>, ExchangeError> {
        if send_counts.len() != self.size() {
            return Err(ExchangeError::MalformedExport(format!(
                "expected {} send counts, got {}",
                self.size(),
                send_counts.len()
            )));
        }
        for (to, &count) in send_counts.iter().enumerate() {
            self.send(to, vec![count])?;
        }
        (0..self.size())
            .map(|from| {
                self.receive::<usize>(from)?
                    .first()
                    .copied()
                    .ok_or(ExchangeError::SizeMismatch {
                        partner: from,
                        expected: 1,
                        received: 0,
                    })
            })
            .collect()
    }

    fn all_reduce_min(&self, value: f64) -> Result<f64, ExchangeError> {
        for to in 0..self.size() {
            self.send(to, vec![value])?;
        }
        let mut min = f64::INFINITY;
        for from in 0..self.size() {
            for v in self.receive::<f64>(from)? {
                min = min.min(v);
            }
        }
        Ok(min)
    }

    fn send_recv<T: Datum>(
        &self,
        send: &[T],
        recv: &mut [T],
        partner: usize,
    ) -> Result<(), ExchangeError> {
        self.send(partner, send.to_vec())?;
        let received = self.receive::<T>(partner)?;
        if received.len() != recv.len() {
            return Err(ExchangeError::SizeMismatch {
                partner,
                expected: recv.len(),
                received: received.len(),
            });
        }
        recv.copy_from_slice(&received);
        Ok(())
    }
}

#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

#[cfg(feature = "mpi")]
mod mpi_comm {
    use mpi::{collective::SystemOperation, topology::SimpleCommunicator, traits::*};

    use super::{Communicator, Datum};
    use crate::errors::ExchangeError;

    /// Communicator backed by an MPI world.
    pub struct MpiComm {
        world: SimpleCommunicator,
    }

    impl MpiComm {
        pub fn new(world: SimpleCommunicator) -> Self {
            Self { world }
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.world.rank() as usize
        }

        fn size(&self) -> usize {
            self.world.size() as usize
        }

        fn all_to_all_counts(&self, send_counts: &[usize]) -> Result<Vec<usize>, ExchangeError> {
            if send_counts.len() != self.size() {
                return Err(ExchangeError::MalformedExport(format!(
                    "expected {} send counts, got {}",
                    self.size(),
                    send_counts.len()
                )));
            }
            let send: Vec<u64> = send_counts.iter().map(|&c| c as u64).collect();
            let mut recv = vec![0u64; self.size()];
            self.world.all_to_all_into(&send[..], &mut recv[..]);
            Ok(recv.into_iter().map(|c| c as usize).collect())
        }

        fn all_reduce_min(&self, value: f64) -> Result<f64, ExchangeError> {
            let mut min = value;
            self.world
                .all_reduce_into(&value, &mut min, SystemOperation::min());
            Ok(min)
        }

        fn send_recv<T: Datum>(
            &self,
            send: &[T],
            recv: &mut [T],
            partner: usize,
        ) -> Result<(), ExchangeError> {
            let process = self.world.process_at_rank(partner as i32);
            // Lower rank sends first
            let (received, _status) = if self.rank() < partner {
                process.send(send);
                process.receive_vec::<T>()
            } else {
                let received = process.receive_vec::<T>();
                process.send(send);
                received
            };
            if received.len() != recv.len() {
                return Err(ExchangeError::SizeMismatch {
                    partner,
                    expected: recv.len(),
                    received: received.len(),
                });
            }
            recv.copy_from_slice(&received);
            Ok(())
        }
    }
}
