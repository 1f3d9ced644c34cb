//! In-process transport
//!
//! Routes packets between peers living in the same process through plain
//! queues. Useful for single-machine sessions, bots sharing the host
//! process, and tests that need a full host/client round trip without
//! sockets.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::rc::Rc;

use presage_core::PeerId;

use crate::{Error, Packet, Result, Route, Wire};

/// A packet together with the peer that sent it
#[derive(Debug, Clone)]
pub struct Delivery<I, S> {
    /// Sending peer
    pub from: PeerId,
    /// The delivered packet
    pub packet: Packet<I, S>,
}

struct Inboxes<I, S> {
    host: PeerId,
    queues: HashMap<PeerId, VecDeque<Delivery<I, S>>>,
}

/// Shared in-process message bus
pub struct LoopbackNetwork<I, S> {
    inner: Rc<RefCell<Inboxes<I, S>>>,
}

impl<I: Clone, S: Clone> LoopbackNetwork<I, S> {
    /// Create a network whose authoritative host is `host`
    ///
    /// The host is attached implicitly; clients join with [`attach`].
    ///
    /// [`attach`]: LoopbackNetwork::attach
    pub fn new(host: PeerId) -> Self {
        let mut queues = HashMap::new();
        queues.insert(host, VecDeque::new());
        Self {
            inner: Rc::new(RefCell::new(Inboxes { host, queues })),
        }
    }

    /// Attach a peer and get its sending endpoint
    pub fn attach(&self, peer: PeerId) -> LoopbackEndpoint<I, S> {
        self.inner
            .borrow_mut()
            .queues
            .entry(peer)
            .or_insert_with(VecDeque::new);
        LoopbackEndpoint {
            peer,
            inner: Rc::clone(&self.inner),
        }
    }

    /// Drain every packet queued for `peer`, in arrival order
    pub fn drain(&self, peer: PeerId) -> Vec<Delivery<I, S>> {
        match self.inner.borrow_mut().queues.get_mut(&peer) {
            Some(queue) => queue.drain(..).collect(),
            None => Vec::new(),
        }
    }
}

impl<I, S> Clone for LoopbackNetwork<I, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// One peer's sending handle into a [`LoopbackNetwork`]
pub struct LoopbackEndpoint<I, S> {
    peer: PeerId,
    inner: Rc<RefCell<Inboxes<I, S>>>,
}

impl<I: Clone, S: Clone> Wire<I, S> for LoopbackEndpoint<I, S> {
    fn send(&mut self, route: Route, packet: Packet<I, S>) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let host = inner.host;
        let from = self.peer;

        match route {
            Route::ToHost => {
                let queue = inner
                    .queues
                    .get_mut(&host)
                    .ok_or(Error::UnknownPeer(host))?;
                queue.push_back(Delivery { from, packet });
            }
            Route::ToPeer(peer) => {
                let queue = inner
                    .queues
                    .get_mut(&peer)
                    .ok_or(Error::UnknownPeer(peer))?;
                queue.push_back(Delivery { from, packet });
            }
            Route::Broadcast { except } => {
                for (&peer, queue) in inner.queues.iter_mut() {
                    if peer == except || peer == from {
                        continue;
                    }
                    queue.push_back(Delivery {
                        from,
                        packet: packet.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presage_core::{EntityId, Stamped};

    fn input_packet(tick: u64) -> Packet<u8, u8> {
        Packet::Input {
            entity: EntityId(1),
            input: Stamped::new(tick, 0),
            previous: None,
        }
    }

    #[test]
    fn test_to_host() {
        let network: LoopbackNetwork<u8, u8> = LoopbackNetwork::new(PeerId(0));
        let mut client = network.attach(PeerId(1));

        client.send(Route::ToHost, input_packet(5)).unwrap();

        let delivered = network.drain(PeerId(0));
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].from, PeerId(1));
        assert!(network.drain(PeerId(1)).is_empty());
    }

    #[test]
    fn test_broadcast_excludes_owner_and_sender() {
        let network: LoopbackNetwork<u8, u8> = LoopbackNetwork::new(PeerId(0));
        let mut host = network.attach(PeerId(0));
        network.attach(PeerId(1));
        network.attach(PeerId(2));

        host.send(Route::Broadcast { except: PeerId(1) }, input_packet(5))
            .unwrap();

        assert!(network.drain(PeerId(0)).is_empty());
        assert!(network.drain(PeerId(1)).is_empty());
        assert_eq!(network.drain(PeerId(2)).len(), 1);
    }

    #[test]
    fn test_directed_send_to_unknown_peer() {
        let network: LoopbackNetwork<u8, u8> = LoopbackNetwork::new(PeerId(0));
        let mut host = network.attach(PeerId(0));

        let err = host.send(Route::ToPeer(PeerId(9)), input_packet(5));
        assert!(matches!(err, Err(Error::UnknownPeer(PeerId(9)))));
    }

    #[test]
    fn test_arrival_order_preserved() {
        let network: LoopbackNetwork<u8, u8> = LoopbackNetwork::new(PeerId(0));
        let mut client = network.attach(PeerId(1));

        for tick in 1..=3u64 {
            client.send(Route::ToHost, input_packet(tick)).unwrap();
        }

        let ticks: Vec<_> = network
            .drain(PeerId(0))
            .into_iter()
            .map(|d| match d.packet {
                Packet::Input { input, .. } => input.tick,
                Packet::State { snapshot, .. } => snapshot.tick,
            })
            .collect();
        assert_eq!(ticks, vec![1, 2, 3]);
    }
}
