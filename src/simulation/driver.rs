use crate::simulation::config::Config;
use crate::simulation::events::{
    EventTrait, EventsPublisher, MovementFinishedEventBuilder, PositionChangedEventBuilder,
};
use crate::simulation::route::{Route, RoutePoint};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Lifecycle of the simulated driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No route loaded.
    Idle,
    /// Route loaded, positioned at the first waypoint, not moving.
    Ready,
    /// Ticker active, advancing one waypoint per tick.
    Moving,
    /// Last waypoint reached, ticker released.
    Finished,
}

struct DriverState {
    route: Route,
    current_index: usize,
    current_position: Option<RoutePoint>,
    phase: Phase,
    // bumped on every (re)start so that a cancelled ticker's in-flight tick
    // can detect it is stale
    run_id: u64,
}

/// This struct is a wrapper around the JoinHandle of the ticker task.
/// Additionally, it holds a shutdown sender for the task. At most one live
/// ticker exists per simulator; replacing it goes through `shutdown` first.
struct TickerHandle {
    handle: JoinHandle<()>,
    shutdown_sender: watch::Sender<bool>,
}

impl TickerHandle {
    fn shutdown(self) {
        self.shutdown_sender.send_replace(true);
        self.handle.abort();
    }
}

enum TickOutcome {
    Advanced(usize, RoutePoint),
    Finished(usize),
    Stale,
}

/// Drives a position cursor through a [`Route`] on a fixed cadence and
/// publishes each new position.
///
/// Position changes go out on two paths: the [`EventsPublisher`] registry
/// (future changes only) and a `tokio::sync::watch` channel obtained via
/// [`DriverSimulator::subscribe_position`] (replay of the last value plus
/// future changes).
pub struct DriverSimulator {
    state: Arc<Mutex<DriverState>>,
    events: Arc<Mutex<EventsPublisher>>,
    position_sender: watch::Sender<Option<RoutePoint>>,
    configured_route: Route,
    tick_interval: Duration,
    ticker: Option<TickerHandle>,
}

impl Default for DriverSimulator {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl DriverSimulator {
    pub fn new(config: &Config) -> Self {
        let state = DriverState {
            route: Route::default(),
            current_index: 0,
            current_position: None,
            phase: Phase::Idle,
            run_id: 0,
        };
        let (position_sender, _) = watch::channel(None);
        DriverSimulator {
            state: Arc::new(Mutex::new(state)),
            events: Arc::new(Mutex::new(EventsPublisher::new())),
            position_sender,
            configured_route: config.route().to_route(),
            tick_interval: config.simulation().tick_interval(),
            ticker: None,
        }
    }

    /// Loads the configured route and positions the driver at its first
    /// waypoint. Publishes the initial position.
    pub fn setup_route(&mut self) {
        let first = {
            let mut state = self.state.lock();
            state.route = self.configured_route.clone();
            state.current_index = 0;
            state.current_position = state.route.first().copied();
            state.phase = if state.route.is_empty() {
                Phase::Idle
            } else {
                Phase::Ready
            };
            state.current_position
        };
        if let Some(point) = first {
            Self::publish_position(&self.events, &self.position_sender, 0, point);
        }
    }

    /// Starts driver movement from the first waypoint. Restarting while the
    /// driver is already moving (or finished) cancels the previous ticker
    /// before installing the new one, so the advancement rate never doubles.
    ///
    /// Starting with an empty route is a no-op. Must be called from within a
    /// tokio runtime.
    pub fn start(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.shutdown();
        }

        let (first, run_id) = {
            let mut state = self.state.lock();
            if state.route.is_empty() {
                debug!("start requested without a route, ignoring");
                return;
            }
            state.run_id += 1;
            state.current_index = 0;
            state.current_position = state.route.first().copied();
            state.phase = Phase::Moving;
            (state.current_position, state.run_id)
        };
        if let Some(point) = first {
            Self::publish_position(&self.events, &self.position_sender, 0, point);
        }

        let state = Arc::clone(&self.state);
        let events = Arc::clone(&self.events);
        let position_sender = self.position_sender.clone();
        let (shutdown_sender, mut shutdown) = watch::channel(false);
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first tick of a fresh interval completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if !Self::tick(&state, &events, &position_sender, run_id) {
                            break;
                        }
                    }
                }
            }
            debug!("ticker task exited");
        });
        self.ticker = Some(TickerHandle {
            handle,
            shutdown_sender,
        });
    }

    /// Halts further advancement. Position and index are left untouched.
    /// A no-op when the driver is not moving.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.shutdown();
        }
        let mut state = self.state.lock();
        if matches!(state.phase, Phase::Moving | Phase::Finished) {
            state.phase = Phase::Ready;
        }
    }

    /// Waits for the active ticker task to run the route to its end (or to
    /// be cancelled). Returns immediately when no ticker is active.
    pub async fn join_movement(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.handle.await;
        }
    }

    /// Last published position plus all future changes. The receiver starts
    /// out with the current value, so late subscribers observe the most
    /// recent position immediately.
    pub fn subscribe_position(&self) -> watch::Receiver<Option<RoutePoint>> {
        self.position_sender.subscribe()
    }

    /// Registers a callback for a specific event type. Callbacks run on the
    /// ticker task and must not call back into the simulator.
    pub fn on<E, F>(&self, f: F)
    where
        E: EventTrait,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.events.lock().on(f);
    }

    /// Registers a callback for all event types.
    pub fn on_any<F>(&self, f: F)
    where
        F: Fn(&dyn EventTrait) + Send + Sync + 'static,
    {
        self.events.lock().on_any(f);
    }

    /// Registers a hook that runs once movement has finished.
    pub fn on_finish<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events.lock().on_finish(f);
    }

    pub fn route(&self) -> Route {
        self.state.lock().route.clone()
    }

    pub fn current_position(&self) -> Option<RoutePoint> {
        self.state.lock().current_position
    }

    pub fn current_index(&self) -> usize {
        self.state.lock().current_index
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// One timer-driven advancement step. Returns false when the ticker task
    /// should end. The state lock is released before callbacks run.
    fn tick(
        state: &Mutex<DriverState>,
        events: &Mutex<EventsPublisher>,
        position_sender: &watch::Sender<Option<RoutePoint>>,
        run_id: u64,
    ) -> bool {
        let outcome = {
            let mut state = state.lock();
            if state.run_id != run_id || state.phase != Phase::Moving {
                TickOutcome::Stale
            } else {
                let next = state.current_index + 1;
                match state.route.get(next).copied() {
                    Some(point) => {
                        state.current_index = next;
                        state.current_position = Some(point);
                        TickOutcome::Advanced(next, point)
                    }
                    // also covers an index already at or beyond the last
                    // valid one
                    None => {
                        state.phase = Phase::Finished;
                        TickOutcome::Finished(state.current_index)
                    }
                }
            }
        };

        match outcome {
            TickOutcome::Advanced(index, point) => {
                Self::publish_position(events, position_sender, index, point);
                true
            }
            TickOutcome::Finished(index) => {
                let events = events.lock();
                events.publish_event(
                    &MovementFinishedEventBuilder::default()
                        .index(index)
                        .build()
                        .unwrap(),
                );
                events.finish();
                false
            }
            TickOutcome::Stale => false,
        }
    }

    fn publish_position(
        events: &Mutex<EventsPublisher>,
        position_sender: &watch::Sender<Option<RoutePoint>>,
        index: usize,
        point: RoutePoint,
    ) {
        events.lock().publish_event(
            &PositionChangedEventBuilder::default()
                .index(index)
                .point(point)
                .build()
                .unwrap(),
        );
        position_sender.send_replace(Some(point));
    }
}

impl Drop for DriverSimulator {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::{Config, RouteConfig};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_setup_route_positions_driver_at_first_waypoint() {
        let mut sim = DriverSimulator::default();
        assert_eq!(sim.phase(), Phase::Idle);
        assert_eq!(sim.current_position(), None);
        assert!(sim.route().is_empty());

        sim.setup_route();

        assert_eq!(sim.phase(), Phase::Ready);
        assert_eq!(sim.route().len(), 3);
        assert_eq!(sim.current_index(), 0);
        let position = sim.current_position().unwrap();
        assert_approx_eq!(position.lat, 37.7749);
        assert_approx_eq!(position.lon, -122.4194);
    }

    #[test]
    fn test_setup_route_with_empty_config_stays_idle() {
        let mut config = Config::default();
        config.set_route(RouteConfig::from_waypoints(vec![]));
        let mut sim = DriverSimulator::new(&config);

        sim.setup_route();

        assert_eq!(sim.phase(), Phase::Idle);
        assert_eq!(sim.current_position(), None);
    }

    #[test]
    fn test_stop_without_movement_is_a_no_op() {
        let mut sim = DriverSimulator::default();
        sim.setup_route();
        sim.stop();

        assert_eq!(sim.phase(), Phase::Ready);
        assert_eq!(sim.current_index(), 0);
        assert!(sim.current_position().is_some());
    }

    #[tokio::test]
    async fn test_start_without_route_is_a_no_op() {
        let mut sim = DriverSimulator::default();
        sim.start();

        assert_eq!(sim.phase(), Phase::Idle);
        assert_eq!(sim.current_position(), None);
        assert!(sim.ticker.is_none());
    }

    #[tokio::test]
    async fn test_start_publishes_first_waypoint() {
        let mut sim = DriverSimulator::default();
        sim.setup_route();
        sim.start();

        assert_eq!(sim.phase(), Phase::Moving);
        assert_eq!(sim.current_index(), 0);
        let position = sim.current_position().unwrap();
        assert_approx_eq!(position.lat, 37.7749);
        assert_approx_eq!(position.lon, -122.4194);
        sim.stop();
    }

    #[test]
    fn test_stale_tick_does_not_advance() {
        let config = Config::default();
        let mut sim = DriverSimulator::new(&config);
        sim.setup_route();

        // a tick carrying an outdated run id must leave the state alone
        let stale =
            DriverSimulator::tick(&sim.state, &sim.events, &sim.position_sender, u64::MAX);
        assert!(!stale);
        assert_eq!(sim.current_index(), 0);
        assert_eq!(sim.phase(), Phase::Ready);
    }

    #[test]
    fn test_tick_beyond_last_waypoint_finishes() {
        let mut sim = DriverSimulator::default();
        sim.setup_route();
        {
            let mut state = sim.state.lock();
            state.phase = Phase::Moving;
            state.current_index = 2;
            state.run_id = 1;
        }

        let advanced = DriverSimulator::tick(&sim.state, &sim.events, &sim.position_sender, 1);
        assert!(!advanced);
        assert_eq!(sim.phase(), Phase::Finished);
        assert_eq!(sim.current_index(), 2);
    }
}
