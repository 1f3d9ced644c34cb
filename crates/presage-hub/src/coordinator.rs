//! The per-scene tick coordinator

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use presage_core::{
    ClockConfig, FrameContext, Role, RuntimeContext, SyncClock, SyncEvent, Tick, TickContext,
    TickDriven,
};
use tracing::{debug, warn};

/// Scene-wide simulation clock and controller dispatch
///
/// Registration is idempotent set membership. Controllers added while a
/// frame is running take effect on the next frame; destroyed controllers
/// are swept lazily before each update pass.
pub struct TickCoordinator {
    ctx: RuntimeContext,
    clock: Rc<RefCell<SyncClock>>,
    controllers: Vec<Weak<RefCell<dyn TickDriven>>>,
}

impl TickCoordinator {
    /// Create a coordinator for one scene
    pub fn new(ctx: RuntimeContext, config: ClockConfig) -> Self {
        Self {
            ctx,
            clock: Rc::new(RefCell::new(SyncClock::new(config))),
            controllers: Vec::new(),
        }
    }

    /// The process context this coordinator runs under
    pub fn context(&self) -> RuntimeContext {
        self.ctx
    }

    /// The shared scene clock
    ///
    /// Controllers keep a clone so they can read the tick interval and push
    /// acknowledgements without going through the coordinator.
    pub fn clock(&self) -> Rc<RefCell<SyncClock>> {
        Rc::clone(&self.clock)
    }

    /// Add a controller; adding one twice has no effect
    pub fn register(&mut self, controller: &Rc<RefCell<dyn TickDriven>>) {
        let handle = Rc::downgrade(controller);
        if self
            .controllers
            .iter()
            .any(|existing| Weak::ptr_eq(existing, &handle))
        {
            return;
        }
        self.controllers.push(handle);
    }

    /// Remove a controller; removing an unknown one has no effect
    pub fn unregister(&mut self, controller: &Rc<RefCell<dyn TickDriven>>) {
        let handle = Rc::downgrade(controller);
        self.controllers
            .retain(|existing| !Weak::ptr_eq(existing, &handle));
    }

    /// Number of live registered controllers
    pub fn controller_count(&self) -> usize {
        self.controllers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Record a tick acknowledged by the authority
    pub fn acknowledge_tick(&self, tick: Tick) {
        self.clock.borrow_mut().acknowledge_tick(tick);
    }

    /// Feed an announced server tick into the clock
    ///
    /// Hosts are their own authority and ignore this. On clients the first
    /// announcement synchronizes the clock; later ones only matter when the
    /// drift window is violated.
    pub fn update_server_tick(&self, tick: Tick) {
        if self.ctx.is_host {
            return;
        }
        match self.clock.borrow_mut().observe_server_tick(tick) {
            SyncEvent::Synchronized => {
                debug!(server_tick = tick, "clock synchronized");
            }
            SyncEvent::Resynced => {
                warn!(server_tick = tick, "tick drift exceeded the window, realigned clock");
            }
            SyncEvent::Advanced | SyncEvent::Ignored => {}
        }
    }

    /// Run the frame driver: drain whole ticks, then the visual pass
    ///
    /// Call once per render frame, after inbound messages have been
    /// delivered to their controllers.
    pub fn update(&mut self, frame: FrameContext) {
        self.controllers.retain(|w| w.strong_count() > 0);
        let live: Vec<Rc<RefCell<dyn TickDriven>>> =
            self.controllers.iter().filter_map(Weak::upgrade).collect();

        for controller in &live {
            controller.borrow_mut().refresh_role();
        }

        // A client that has never heard from the host has no tick to stand
        // on; it neither simulates nor renders interpolation yet.
        if !self.ctx.is_host && !self.clock.borrow().is_synchronized() {
            return;
        }

        let ticks = self.clock.borrow_mut().begin_frame(frame.delta);
        for _ in 0..ticks {
            self.run_tick(&live, frame.wall_now);
        }

        for controller in &live {
            controller.borrow_mut().update_visuals(&frame);
        }
    }

    fn run_tick(&mut self, live: &[Rc<RefCell<dyn TickDriven>>], wall_now: f64) {
        let tick = {
            let clock = self.clock.borrow();
            TickContext {
                tick: clock.current_tick(),
                wall_now,
                dt: clock.tick_interval() as f32,
            }
        };

        // Proxies first, so the states broadcast this tick already contain
        // every remote input dispatched in it.
        for controller in live {
            let mut controller = controller.borrow_mut();
            if controller.role() == Role::HostProxy {
                controller.process_input_queue(&tick);
            }
        }
        for controller in live {
            let mut controller = controller.borrow_mut();
            if controller.role().is_local() {
                controller.simulate(&tick);
            }
        }

        self.clock.borrow_mut().advance_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presage_core::{EntityId, PeerId};

    /// Records every dispatch it receives into a shared log
    struct Probe {
        entity: EntityId,
        role: Role,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Probe {
        fn shared(
            entity: u64,
            role: Role,
            log: &Rc<RefCell<Vec<String>>>,
        ) -> Rc<RefCell<dyn TickDriven>> {
            Rc::new(RefCell::new(Probe {
                entity: EntityId(entity),
                role,
                log: Rc::clone(log),
            }))
        }
    }

    impl TickDriven for Probe {
        fn entity(&self) -> EntityId {
            self.entity
        }

        fn role(&self) -> Role {
            self.role
        }

        fn refresh_role(&mut self) {}

        fn process_input_queue(&mut self, tick: &TickContext) {
            self.log
                .borrow_mut()
                .push(format!("proxy:{}:{}", self.entity.raw(), tick.tick));
        }

        fn simulate(&mut self, tick: &TickContext) {
            self.log
                .borrow_mut()
                .push(format!("sim:{}:{}", self.entity.raw(), tick.tick));
        }

        fn update_visuals(&mut self, _frame: &FrameContext) {
            self.log.borrow_mut().push(format!("vis:{}", self.entity.raw()));
        }
    }

    fn host_coordinator() -> TickCoordinator {
        TickCoordinator::new(
            RuntimeContext::host(PeerId(0)),
            ClockConfig {
                tick_interval: 0.25,
                ..ClockConfig::default()
            },
        )
    }

    fn frame(wall_now: f64, delta: f64) -> FrameContext {
        FrameContext { wall_now, delta }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut coordinator = host_coordinator();
        let log = Rc::new(RefCell::new(Vec::new()));
        let probe = Probe::shared(1, Role::LocalHost, &log);

        coordinator.register(&probe);
        coordinator.register(&probe);
        assert_eq!(coordinator.controller_count(), 1);

        coordinator.unregister(&probe);
        coordinator.unregister(&probe);
        assert_eq!(coordinator.controller_count(), 0);
    }

    #[test]
    fn test_dropped_controllers_are_swept() {
        let mut coordinator = host_coordinator();
        let log = Rc::new(RefCell::new(Vec::new()));
        let probe = Probe::shared(1, Role::LocalHost, &log);
        coordinator.register(&probe);

        drop(probe);
        coordinator.update(frame(0.0, 0.1));

        assert_eq!(coordinator.controller_count(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_proxies_run_before_locals() {
        let mut coordinator = host_coordinator();
        let log = Rc::new(RefCell::new(Vec::new()));
        let local = Probe::shared(1, Role::LocalHost, &log);
        let proxy = Probe::shared(2, Role::HostProxy, &log);
        // Local registered first: phase order, not registration order, wins
        coordinator.register(&local);
        coordinator.register(&proxy);

        coordinator.update(frame(0.0, 0.25));

        assert_eq!(
            log.borrow().as_slice(),
            ["proxy:2:0", "sim:1:0", "vis:1", "vis:2"]
        );
    }

    #[test]
    fn test_multiple_ticks_then_one_visual_pass() {
        let mut coordinator = host_coordinator();
        let log = Rc::new(RefCell::new(Vec::new()));
        let local = Probe::shared(1, Role::LocalHost, &log);
        coordinator.register(&local);

        coordinator.update(frame(0.0, 0.75));

        assert_eq!(
            log.borrow().as_slice(),
            ["sim:1:0", "sim:1:1", "sim:1:2", "vis:1"]
        );
    }

    #[test]
    fn test_client_waits_for_synchronization() {
        let mut coordinator = TickCoordinator::new(
            RuntimeContext::client(PeerId(5)),
            ClockConfig {
                tick_interval: 0.25,
                ..ClockConfig::default()
            },
        );
        let log = Rc::new(RefCell::new(Vec::new()));
        let local = Probe::shared(1, Role::LocalClient, &log);
        coordinator.register(&local);

        coordinator.update(frame(0.0, 0.5));
        assert!(log.borrow().is_empty());

        coordinator.update_server_tick(100);
        coordinator.update(frame(0.5, 0.25));

        // current tick starts at server + lead
        assert_eq!(log.borrow().as_slice(), ["sim:1:102", "vis:1"]);
    }

    #[test]
    fn test_host_ignores_server_tick_announcements() {
        let coordinator = host_coordinator();
        coordinator.update_server_tick(500);
        assert_eq!(coordinator.clock().borrow().server_tick(), 0);
    }

    #[test]
    fn test_observers_only_get_visual_pass() {
        let mut coordinator = host_coordinator();
        let log = Rc::new(RefCell::new(Vec::new()));
        let observer = Probe::shared(3, Role::RemoteObserver, &log);
        coordinator.register(&observer);

        coordinator.update(frame(0.0, 0.25));

        assert_eq!(log.borrow().as_slice(), ["vis:3"]);
    }
}
