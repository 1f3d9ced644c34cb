//! Full host/client/observer sessions over the loopback transport
//!
//! Three processes share one in-memory network: the host, the client that
//! owns the entity, and a watcher that only observes it. Each test pumps
//! frames through all three coordinators and ferries packets between them,
//! checking the end-to-end behavior of prediction, reconciliation, input
//! redundancy, clock alignment and delayed interpolation.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Quat, Vec3};
use presage_core::{
    ClockConfig, ControllerIdentity, EntityId, FrameContext, PeerId, Role, RuntimeContext,
    Simulator, Snapshot, TickDriven,
};
use presage_hub::TickCoordinator;
use presage_netcode::{Controller, ControllerConfig, LoopbackNetwork, Packet, SharedWire};

const HOST: PeerId = PeerId(0);
const CLIENT: PeerId = PeerId(1);
const WATCHER: PeerId = PeerId(2);
const ENTITY: EntityId = EntityId(42);

const SPEED: f32 = 30.0;
const DT: f64 = 1.0 / 30.0;

#[derive(Debug, Clone, Default, PartialEq)]
struct MoveInput {
    direction: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct BodyState {
    velocity: Vec3,
}

/// Constant-speed character, deterministic in (input, state)
struct CharacterSim {
    position: Vec3,
    rotation: Quat,
    velocity: Vec3,
    stick: Vec3,
    presented: Option<(Vec3, Quat)>,
    reconciles: usize,
}

impl CharacterSim {
    fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            stick: Vec3::X,
            presented: None,
            reconciles: 0,
        }
    }
}

impl Simulator for CharacterSim {
    type Input = MoveInput;
    type State = BodyState;

    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn build_input(&mut self, input: &mut MoveInput) {
        input.direction = self.stick;
    }

    fn step(&mut self, input: &MoveInput, dt: f32) {
        self.velocity = input.direction * SPEED;
        self.position += self.velocity * dt;
    }

    fn write_state(&mut self, state: &mut BodyState) {
        state.velocity = self.velocity;
    }

    fn read_state(&mut self, state: &BodyState) {
        self.velocity = state.velocity;
    }

    fn present(&mut self, position: Vec3, rotation: Quat) {
        self.presented = Some((position, rotation));
    }

    fn on_reconcile(&mut self, _server: &Snapshot<BodyState>, _predicted: &Snapshot<BodyState>) {
        self.reconciles += 1;
    }
}

struct Peer {
    coordinator: TickCoordinator,
    controller: Rc<RefCell<Controller<CharacterSim>>>,
    // Keeps the trait-object registration alive
    _driven: Rc<RefCell<dyn TickDriven>>,
}

fn make_peer(
    network: &LoopbackNetwork<MoveInput, BodyState>,
    id: PeerId,
    is_host: bool,
    owner: PeerId,
) -> Peer {
    let ctx = if is_host {
        RuntimeContext::host(id)
    } else {
        RuntimeContext::client(id)
    };
    let mut coordinator = TickCoordinator::new(ctx, ClockConfig::default());
    let wire: SharedWire<MoveInput, BodyState> = Rc::new(RefCell::new(network.attach(id)));
    let controller = Rc::new(RefCell::new(Controller::with_simulator(
        ControllerIdentity::new(ENTITY, owner),
        ctx,
        ControllerConfig::default(),
        coordinator.clock(),
        wire,
        CharacterSim::new(),
    )));
    let driven: Rc<RefCell<dyn TickDriven>> = controller.clone();
    coordinator.register(&driven);
    Peer {
        coordinator,
        controller,
        _driven: driven,
    }
}

struct Session {
    network: LoopbackNetwork<MoveInput, BodyState>,
    host: Peer,
    client: Peer,
    watcher: Peer,
    wall: f64,
    drop_next_client_inputs: usize,
}

impl Session {
    /// A session whose entity is owned by the client peer
    fn new() -> Self {
        let network = LoopbackNetwork::new(HOST);
        let host = make_peer(&network, HOST, true, CLIENT);
        let client = make_peer(&network, CLIENT, false, CLIENT);
        let watcher = make_peer(&network, WATCHER, false, CLIENT);

        // The host announces its tick out of band once at join time
        client.coordinator.update_server_tick(100);
        watcher.coordinator.update_server_tick(100);

        Self {
            network,
            host,
            client,
            watcher,
            wall: 10.0,
            drop_next_client_inputs: 0,
        }
    }

    fn deliver(&mut self) {
        for delivery in self.network.drain(HOST) {
            if let Packet::Input {
                input, previous, ..
            } = delivery.packet
            {
                if self.drop_next_client_inputs > 0 {
                    self.drop_next_client_inputs -= 1;
                    continue;
                }
                self.host
                    .controller
                    .borrow_mut()
                    .receive_input(input, previous);
            }
        }
        for delivery in self.network.drain(CLIENT) {
            if let Packet::State { snapshot, .. } = delivery.packet {
                self.client
                    .controller
                    .borrow_mut()
                    .receive_state(snapshot, self.wall);
            }
        }
        for delivery in self.network.drain(WATCHER) {
            if let Packet::State { snapshot, .. } = delivery.packet {
                self.watcher
                    .controller
                    .borrow_mut()
                    .receive_state(snapshot, self.wall);
            }
        }
    }

    /// One render frame on every peer, with packets ferried in between
    fn frame(&mut self) {
        self.wall += DT;
        let frame = FrameContext {
            wall_now: self.wall,
            delta: DT,
        };

        self.deliver();
        self.client.coordinator.update(frame);
        self.deliver();
        self.host.coordinator.update(frame);
        self.deliver();
        self.watcher.coordinator.update(frame);
    }

    fn client_position(&self) -> Vec3 {
        self.client.controller.borrow().simulator().unwrap().position
    }

    fn host_position(&self) -> Vec3 {
        self.host.controller.borrow().simulator().unwrap().position
    }

    fn client_reconciles(&self) -> usize {
        self.client.controller.borrow().simulator().unwrap().reconciles
    }

    fn set_client_stick(&self, direction: Vec3) {
        self.client
            .controller
            .borrow_mut()
            .simulator_mut()
            .unwrap()
            .stick = direction;
    }
}

#[test]
fn test_roles_across_the_session() {
    let session = Session::new();
    assert_eq!(session.host.controller.borrow().role(), Role::HostProxy);
    assert_eq!(session.client.controller.borrow().role(), Role::LocalClient);
    assert_eq!(session.watcher.controller.borrow().role(), Role::RemoteObserver);
}

#[test]
fn test_perfect_prediction_never_corrects() {
    let mut session = Session::new();
    for _ in 0..30 {
        session.frame();
    }

    // Both simulations walked the same inputs from the same start
    assert_eq!(session.client_reconciles(), 0);
    let client = session.client_position();
    let host = session.host_position();
    assert!(client.x > 0.5, "client never moved: {client:?}");
    assert!(
        client.distance(host) < 1e-3,
        "authority diverged: client {client:?}, host {host:?}"
    );

    // Acknowledged predictions are trimmed as they are confirmed
    assert_eq!(session.client.controller.borrow().pending_inputs(), 0);
    assert_eq!(session.client.controller.borrow().visual_offset(), Vec3::ZERO);
}

#[test]
fn test_authoritative_push_causes_one_correction() {
    let mut session = Session::new();
    for _ in 0..10 {
        session.frame();
    }
    assert_eq!(session.client_reconciles(), 0);

    // Something authoritative happens host-side that the client could not
    // have predicted
    session
        .host
        .controller
        .borrow_mut()
        .simulator_mut()
        .unwrap()
        .position += Vec3::new(0.0, 0.0, -1.5);

    session.frame();
    assert_eq!(session.client_reconciles(), 1);

    // The correction is real in the simulation and hidden on screen
    let offset = session.client.controller.borrow().visual_offset();
    assert!((offset.length() - 1.5).abs() < 1e-3);

    // After converging, the trajectories agree again and the offset decays
    for _ in 0..40 {
        session.frame();
    }
    assert_eq!(session.client_reconciles(), 1);
    assert!(session.client_position().distance(session.host_position()) < 1e-3);
    assert!(session.client.controller.borrow().visual_offset().length() < 1e-2);
}

#[test]
fn test_lost_input_recovered_from_redundancy() {
    let mut session = Session::new();
    // Vary the stick so a gap-filled tick would produce a different
    // trajectory than the true input stream
    let directions = [Vec3::X, Vec3::Z, Vec3::X, Vec3::NEG_Z, Vec3::Z, Vec3::X];

    for (i, direction) in directions.iter().cycle().take(5).enumerate() {
        session.set_client_stick(*direction);
        if i == 3 {
            // This frame's input packet never reaches the host
            session.drop_next_client_inputs = 1;
        }
        session.frame();
    }
    for direction in directions.iter().cycle().take(10) {
        session.set_client_stick(*direction);
        session.frame();
    }

    // The follow-up packet carried the lost input redundantly, so the host
    // simulated the true stream and every prediction held
    assert_eq!(session.client_reconciles(), 0);
    assert!(session.client_position().distance(session.host_position()) < 1e-3);
}

#[test]
fn test_unsynchronized_client_stays_silent() {
    let network = LoopbackNetwork::new(HOST);
    let _host = make_peer(&network, HOST, true, CLIENT);
    let mut client = make_peer(&network, CLIENT, false, CLIENT);

    let mut wall = 5.0;
    for _ in 0..10 {
        wall += DT;
        client.coordinator.update(FrameContext {
            wall_now: wall,
            delta: DT,
        });
    }

    // No server tick was ever announced: no simulation, no sends
    assert!(network.drain(HOST).is_empty());
    assert_eq!(client.controller.borrow().pending_inputs(), 0);
}

#[test]
fn test_observer_renders_behind_the_authority() {
    let mut session = Session::new();
    for _ in 0..40 {
        session.frame();
    }

    let host = session.host_position();
    let (presented, _) = session
        .watcher
        .controller
        .borrow()
        .simulator()
        .unwrap()
        .presented
        .expect("watcher never presented a pose");

    // The watcher lags by the interpolation delay, a handful of ticks at
    // this speed, and never overtakes the authority
    assert!(presented.x > 0.0);
    assert!(presented.x < host.x);
    assert!(host.x - presented.x < SPEED * 0.3);
}

#[test]
fn test_forced_tick_jump_resyncs_and_converges() {
    let mut session = Session::new();
    for _ in 0..10 {
        session.frame();
    }

    // An announcement far outside the drift window realigns the clock
    let server_tick = session.client.coordinator.clock().borrow().server_tick();
    session.client.coordinator.update_server_tick(server_tick + 40);
    let realigned = session.client.coordinator.clock().borrow().current_tick();
    assert_eq!(realigned, server_tick + 42);

    // The tick domain jumped: the host gap-fills up to the new input ticks,
    // the first authoritative reply lands as a hard correction, and the
    // session settles back into agreement
    for _ in 0..30 {
        session.frame();
    }
    assert!(session.client_reconciles() >= 1);
    assert!(session.client_position().distance(session.host_position()) < 1e-2);
}

#[test]
fn test_host_owned_entity_is_observed_everywhere() {
    let network = LoopbackNetwork::new(HOST);
    let mut host = make_peer(&network, HOST, true, HOST);
    let mut client = make_peer(&network, CLIENT, false, HOST);
    client.coordinator.update_server_tick(100);

    assert_eq!(host.controller.borrow().role(), Role::LocalHost);
    assert_eq!(client.controller.borrow().role(), Role::RemoteObserver);

    let mut wall = 20.0;
    for _ in 0..20 {
        wall += DT;
        let frame = FrameContext {
            wall_now: wall,
            delta: DT,
        };
        host.coordinator.update(frame);
        for delivery in network.drain(CLIENT) {
            if let Packet::State { snapshot, .. } = delivery.packet {
                client.controller.borrow_mut().receive_state(snapshot, wall);
            }
        }
        client.coordinator.update(frame);
    }

    let host_position = host.controller.borrow().simulator().unwrap().position;
    let (presented, _) = client
        .controller
        .borrow()
        .simulator()
        .unwrap()
        .presented
        .expect("observer never presented a pose");
    assert!(host_position.x > 0.5);
    assert!(presented.x > 0.0);
    assert!(presented.x <= host_position.x);
}
