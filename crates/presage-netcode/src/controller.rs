//! The per-entity prediction state machine
//!
//! One controller drives one entity. Depending on where it runs and who owns
//! the entity it either simulates authoritatively (host), predicts ahead and
//! reconciles (owning client), feeds remote inputs through the authoritative
//! simulation (host proxy), or renders delayed interpolation (observer).
//!
//! The controller owns all of its history. The shared pieces are the scene
//! clock, which it reads and acknowledges into, and the outbound wire.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use presage_core::{
    ControllerIdentity, EntityId, FrameContext, PeerId, Role, RuntimeContext, Simulator, Snapshot,
    Stamped, SyncClock, SyncEvent, Tick, TickContext, TickDriven,
};
use tracing::{debug, trace, warn};

use crate::{
    ControllerConfig, InputHistory, InputQueue, Packet, RemoteInterpolator, Route, StateBuffer,
    VisualSmoother, Wire,
};

/// Outbound wire shared by the controllers of one process
pub type SharedWire<I, S> = Rc<RefCell<dyn Wire<I, S>>>;

/// Prediction, reconciliation and observation for a single entity
pub struct Controller<S: Simulator> {
    identity: ControllerIdentity,
    ctx: RuntimeContext,
    config: ControllerConfig,
    clock: Rc<RefCell<SyncClock>>,
    wire: SharedWire<S::Input, S::State>,
    simulator: Option<S>,
    warned_no_simulator: bool,
    role: Role,

    // Local prediction
    input_history: InputHistory<S::Input>,
    state_history: StateBuffer<S::State>,
    previous_input: Option<Stamped<S::Input>>,
    last_reconciled_tick: Tick,
    smoother: VisualSmoother,

    // Host proxy
    input_queue: InputQueue<S::Input>,
    last_server_input: Option<Stamped<S::Input>>,
    proxy_tick: Tick,

    // Observer
    interpolator: RemoteInterpolator<S::State>,
}

impl<S: Simulator> Controller<S> {
    /// Create a controller without a simulator
    ///
    /// The controller stays inert (no simulation, no sends) until a
    /// simulator is attached; a warning is logged once if it is asked to
    /// run without one.
    pub fn new(
        identity: ControllerIdentity,
        ctx: RuntimeContext,
        config: ControllerConfig,
        clock: Rc<RefCell<SyncClock>>,
        wire: SharedWire<S::Input, S::State>,
    ) -> Self {
        Self {
            identity,
            ctx,
            config,
            role: Role::determine(&ctx, &identity),
            simulator: None,
            warned_no_simulator: false,
            input_history: InputHistory::new(config.history_size),
            state_history: StateBuffer::new(config.history_size),
            previous_input: None,
            last_reconciled_tick: 0,
            smoother: VisualSmoother::new(config.error_smooth_time, config.max_visual_offset),
            input_queue: InputQueue::new(config.history_size),
            last_server_input: None,
            proxy_tick: 0,
            interpolator: RemoteInterpolator::new(
                config.history_size,
                config.interpolation_delay,
                config.teleport_threshold,
            ),
            clock,
            wire,
        }
    }

    /// Create a controller with its simulator wired in
    pub fn with_simulator(
        identity: ControllerIdentity,
        ctx: RuntimeContext,
        config: ControllerConfig,
        clock: Rc<RefCell<SyncClock>>,
        wire: SharedWire<S::Input, S::State>,
        simulator: S,
    ) -> Self {
        let mut controller = Self::new(identity, ctx, config, clock, wire);
        controller.simulator = Some(simulator);
        controller
    }

    /// Attach (or replace) the simulator
    pub fn attach_simulator(&mut self, simulator: S) {
        self.simulator = Some(simulator);
        self.warned_no_simulator = false;
    }

    /// The controller's identity
    pub fn identity(&self) -> ControllerIdentity {
        self.identity
    }

    /// The controller's configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Replicate the host-assigned owner of this entity
    ///
    /// The owner drives the role; histories belonging to a newly entered
    /// role start empty.
    pub fn set_owner(&mut self, owner: Option<PeerId>) {
        self.identity.owner = owner;
        self.refresh_role();
    }

    /// Borrow the simulator, if attached
    pub fn simulator(&self) -> Option<&S> {
        self.simulator.as_ref()
    }

    /// Mutably borrow the simulator, if attached
    pub fn simulator_mut(&mut self) -> Option<&mut S> {
        self.simulator.as_mut()
    }

    /// Newest tick confirmed by the authority for this controller
    pub fn last_reconciled_tick(&self) -> Tick {
        self.last_reconciled_tick
    }

    /// Current visual position offset (zero when nothing is being hidden)
    pub fn visual_offset(&self) -> Vec3 {
        self.smoother.position_offset()
    }

    /// Inputs predicted but not yet acknowledged
    pub fn pending_inputs(&self) -> usize {
        self.input_history.len()
    }

    /// Remote inputs queued for the authoritative simulation
    pub fn queued_remote_inputs(&self) -> usize {
        self.input_queue.len()
    }

    /// Authoritative snapshots buffered for interpolation
    pub fn buffered_states(&self) -> usize {
        self.interpolator.len()
    }

    /// Feed a received remote input pair into the host-side queue
    ///
    /// Only meaningful on the host for a proxied controller; other roles
    /// ignore it.
    pub fn receive_input(&mut self, input: Stamped<S::Input>, previous: Option<Stamped<S::Input>>) {
        if self.role != Role::HostProxy {
            trace!(
                entity = %self.identity.entity,
                tick = input.tick,
                "ignoring remote input outside host proxy role"
            );
            return;
        }
        self.input_queue.observe(input, previous);
    }

    /// Feed a received authoritative snapshot into the controller
    ///
    /// The owning client reconciles against it; observers buffer it for
    /// delayed interpolation. `wall_now` is the local receive time.
    pub fn receive_state(&mut self, snapshot: Snapshot<S::State>, wall_now: f64) {
        match self.role {
            Role::LocalClient => {
                match self.clock.borrow_mut().observe_server_tick(snapshot.tick) {
                    SyncEvent::Resynced => warn!(
                        entity = %self.identity.entity,
                        server_tick = snapshot.tick,
                        "tick drift exceeded the window, realigned clock"
                    ),
                    SyncEvent::Synchronized => debug!(
                        entity = %self.identity.entity,
                        server_tick = snapshot.tick,
                        "clock synchronized"
                    ),
                    SyncEvent::Advanced | SyncEvent::Ignored => {}
                }
                self.reconcile(snapshot, wall_now);
            }
            Role::RemoteObserver => self.interpolator.push(snapshot, wall_now),
            _ => trace!(
                entity = %self.identity.entity,
                tick = snapshot.tick,
                "ignoring authoritative state in local-authority role"
            ),
        }
    }

    /// Compare a received authoritative snapshot against the prediction made
    /// for the same tick, and rewind/replay when they disagree
    fn reconcile(&mut self, server: Snapshot<S::State>, wall_now: f64) {
        if server.tick <= self.last_reconciled_tick {
            trace!(
                entity = %self.identity.entity,
                tick = server.tick,
                "discarding out-of-order authoritative state"
            );
            return;
        }

        // Without the matching prediction (history wrapped, or we just took
        // control) there is nothing to compare or replay against. Skip and
        // wait for a snapshot inside the window.
        let Some(predicted) = self.state_history.get(server.tick).cloned() else {
            trace!(
                entity = %self.identity.entity,
                tick = server.tick,
                "no predicted state for acknowledged tick"
            );
            return;
        };

        self.clock.borrow_mut().acknowledge_tick(server.tick);
        self.input_history.clear_through(server.tick);
        self.state_history.clear_through(server.tick);
        self.last_reconciled_tick = server.tick;

        let position_ok =
            predicted.within_tolerance(&server, self.config.reconciliation_tolerance);
        let payload_ok = self
            .simulator
            .as_ref()
            .is_none_or(|s| s.payload_matches(&predicted.payload, &server.payload));
        if position_ok && payload_ok {
            return;
        }

        let Some(simulator) = self.simulator.as_mut() else {
            return;
        };
        debug!(
            entity = %self.identity.entity,
            tick = server.tick,
            error = predicted.position_error(&server),
            "misprediction, rewinding"
        );

        // Remember what is on screen right now, then snap the simulation to
        // the authoritative state.
        let (visual_position, visual_rotation) =
            self.smoother.apply(simulator.position(), simulator.rotation());
        self.smoother.clear();
        simulator.set_position(server.position);
        simulator.set_rotation(server.rotation);
        simulator.read_state(&server.payload);

        // Replay every unacknowledged input on top of the correction,
        // rebuilding both histories so they describe the new trajectory.
        let replay = self.input_history.after(server.tick);
        self.input_history.clear();
        self.state_history.clear();

        let dt = self.clock.borrow().tick_interval() as f32;
        for input in &replay {
            simulator.step(&input.value, dt);
            let snapshot = capture(simulator, input.tick, wall_now);
            let _ = self.input_history.record(input);
            let _ = self.state_history.record(snapshot);
        }

        // The screen keeps the old pose for now; the offset decays it onto
        // the corrected trajectory over the next frames.
        let offset = visual_position - simulator.position();
        let rotation_offset = simulator.rotation().inverse() * visual_rotation;
        self.smoother.set_correction(offset, rotation_offset);

        simulator.on_reconcile(&server, &predicted);
    }

    /// Simulate one authoritative tick for a proxied controller and publish
    /// the resulting snapshot on both state channels
    fn step_proxy_tick(&mut self, input: &S::Input, dt: f32, wall_now: f64, owner: PeerId) {
        let Some(simulator) = self.simulator.as_mut() else {
            return;
        };
        simulator.step(input, dt);
        let snapshot = capture(simulator, self.proxy_tick, wall_now);
        self.proxy_tick += 1;

        self.send(
            Route::ToPeer(owner),
            Packet::State {
                entity: self.identity.entity,
                snapshot: snapshot.clone(),
            },
        );
        self.send(
            Route::Broadcast { except: owner },
            Packet::State {
                entity: self.identity.entity,
                snapshot,
            },
        );
    }

    fn send(&self, route: Route, packet: Packet<S::Input, S::State>) {
        if let Err(err) = self.wire.borrow_mut().send(route, packet) {
            warn!(entity = %self.identity.entity, %err, "dropping outbound packet");
        }
    }

    fn warn_no_simulator(&mut self) {
        if !self.warned_no_simulator {
            warn!(
                entity = %self.identity.entity,
                "controller has no simulator attached, staying inert"
            );
            self.warned_no_simulator = true;
        }
    }
}

/// Capture the transform and application payload after a simulation step
fn capture<S: Simulator>(simulator: &mut S, tick: Tick, wall_time: f64) -> Snapshot<S::State> {
    let mut payload = S::State::default();
    simulator.write_state(&mut payload);
    Snapshot {
        tick,
        wall_time,
        position: simulator.position(),
        rotation: simulator.rotation(),
        payload,
    }
}

impl<S: Simulator> TickDriven for Controller<S> {
    fn entity(&self) -> EntityId {
        self.identity.entity
    }

    fn role(&self) -> Role {
        self.role
    }

    fn refresh_role(&mut self) {
        let new_role = Role::determine(&self.ctx, &self.identity);
        if new_role == self.role {
            return;
        }
        debug!(
            entity = %self.identity.entity,
            from = ?self.role,
            to = ?new_role,
            "controller role changed"
        );

        match new_role {
            Role::LocalClient => {
                self.input_history.clear();
                self.state_history.clear();
                self.previous_input = None;
                self.last_reconciled_tick = 0;
                self.smoother.clear();
            }
            Role::LocalHost => self.smoother.clear(),
            Role::HostProxy => {
                self.input_queue.clear();
                self.last_server_input = None;
                self.proxy_tick = self.clock.borrow().current_tick();
            }
            Role::RemoteObserver => self.interpolator.reset(),
            Role::Dormant => {}
        }
        self.role = new_role;
    }

    fn process_input_queue(&mut self, tick: &TickContext) {
        if self.role != Role::HostProxy {
            return;
        }
        let Some(owner) = self.identity.owner else {
            return;
        };
        if self.simulator.is_none() {
            self.warn_no_simulator();
            return;
        }

        let mut consumed = 0;
        while consumed < self.config.max_inputs_per_tick {
            let Some(next) = self.input_queue.pop() else {
                break;
            };
            consumed += 1;

            if next.tick < self.proxy_tick {
                trace!(
                    entity = %self.identity.entity,
                    tick = next.tick,
                    "dropping already-simulated remote input"
                );
                continue;
            }

            match self.last_server_input.clone() {
                Some(filler) if self.proxy_tick < next.tick => {
                    // Inputs went missing in transit; reuse the last known
                    // input so the owner's entity keeps moving predictably.
                    while self.proxy_tick < next.tick {
                        debug!(
                            entity = %self.identity.entity,
                            tick = self.proxy_tick,
                            "gap-filling lost remote input"
                        );
                        self.step_proxy_tick(&filler.value, tick.dt, tick.wall_now, owner);
                    }
                }
                None => {
                    // First input from this owner sets the baseline tick.
                    self.proxy_tick = next.tick;
                }
                Some(_) => {}
            }

            self.step_proxy_tick(&next.value, tick.dt, tick.wall_now, owner);
            self.last_server_input = Some(next);
        }
    }

    fn simulate(&mut self, tick: &TickContext) {
        if !self.role.is_local() {
            return;
        }
        if self.simulator.is_none() {
            self.warn_no_simulator();
            return;
        }
        let Some(simulator) = self.simulator.as_mut() else {
            return;
        };

        let mut value = S::Input::default();
        simulator.build_input(&mut value);
        let input = Stamped::new(tick.tick, value);

        simulator.step(&input.value, tick.dt);
        let snapshot = capture(simulator, tick.tick, tick.wall_now);

        match self.role {
            Role::LocalHost => {
                // The host is its own authority; its states only feed the
                // observer channel.
                self.send(
                    Route::Broadcast {
                        except: self.ctx.local_peer,
                    },
                    Packet::State {
                        entity: self.identity.entity,
                        snapshot,
                    },
                );
            }
            Role::LocalClient => {
                if let Err(err) = self.input_history.record(&input) {
                    trace!(entity = %self.identity.entity, %err, "input not recorded");
                }
                if let Err(err) = self.state_history.record(snapshot) {
                    trace!(entity = %self.identity.entity, %err, "prediction not recorded");
                }
                let previous = self.previous_input.take();
                self.send(
                    Route::ToHost,
                    Packet::Input {
                        entity: self.identity.entity,
                        input: input.clone(),
                        previous,
                    },
                );
                self.previous_input = Some(input);
            }
            _ => {}
        }
    }

    fn update_visuals(&mut self, frame: &FrameContext) {
        match self.role {
            Role::RemoteObserver => {
                if let Some((position, rotation)) = self.interpolator.sample(frame.wall_now) {
                    if let Some(simulator) = self.simulator.as_mut() {
                        simulator.present(position, rotation);
                    }
                }
            }
            Role::LocalClient | Role::LocalHost => {
                self.smoother.decay(frame.delta as f32);
                let Some(simulator) = self.simulator.as_mut() else {
                    return;
                };
                let (position, rotation) =
                    self.smoother.apply(simulator.position(), simulator.rotation());
                simulator.present(position, rotation);
            }
            Role::HostProxy | Role::Dormant => {}
        }
    }
}
