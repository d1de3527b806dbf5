use crate::simulation::route::RoutePoint;
use derive_builder::Builder;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub trait EventTrait: Debug + Any + Send + Sync {
    //This can't be a const, because traits with const fields are not dyn compatible.
    fn type_(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

type OnEventFn = dyn Fn(&dyn EventTrait) + Send + Sync + 'static;

/// The EventsPublisher holds call-backs for event processing. Registrations
/// are keyed by the concrete event type, which allows compile-time checking
/// of the event types while dispatch stays dynamic.
///
/// Subscribers registered after a publication do not see past values; the
/// registry delivers future changes only.
#[derive(Default)]
pub struct EventsPublisher {
    per_type: HashMap<TypeId, Vec<Arc<OnEventFn>>>,
    catch_all: Vec<Arc<OnEventFn>>,
    finish: Vec<Box<dyn Fn() + Send + Sync + 'static>>,
}

impl Debug for EventsPublisher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EventsPublisher {{ per_type: {:?}, catch_all: {:?}, finish: {:?} }}",
            self.per_type.len(),
            self.catch_all.len(),
            self.finish.len()
        )
    }
}

impl EventsPublisher {
    pub fn new() -> Self {
        EventsPublisher {
            per_type: HashMap::new(),
            catch_all: Vec::new(),
            finish: Vec::new(),
        }
    }

    pub fn publish_event(&self, event: &dyn EventTrait) {
        let tid = event.as_any().type_id();
        if let Some(list) = self.per_type.get(&tid) {
            for h in list {
                h(event);
            }
        }
        for h in &self.catch_all {
            h(event);
        }
    }

    pub fn finish(&self) {
        for f in self.finish.iter() {
            f()
        }
    }

    /// This function is used to register callbacks for specific event types.
    pub fn on<E, F>(&mut self, f: F)
    where
        E: EventTrait,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<E>();
        let entry = self.per_type.entry(type_id).or_default();
        entry.push(Arc::new(move |ev: &dyn EventTrait| {
            if let Some(e) = ev.as_any().downcast_ref::<E>() {
                f(e);
            }
        }));
    }

    /// This function is used to register callbacks for all event types.
    pub fn on_any<F>(&mut self, f: F)
    where
        F: Fn(&dyn EventTrait) + Send + Sync + 'static,
    {
        self.catch_all.push(Arc::new(f));
    }

    pub fn on_finish<F>(&mut self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.finish.push(Box::new(f));
    }
}

/// Published whenever the driver position changes: on route setup, on a
/// (re)start reset and on every advancing tick.
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct PositionChangedEvent {
    pub index: usize,
    pub point: RoutePoint,
}

impl PositionChangedEvent {
    pub const TYPE: &'static str = "position changed";
}

impl EventTrait for PositionChangedEvent {
    fn type_(&self) -> &'static str {
        Self::TYPE
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Published once when the driver reaches the last waypoint.
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct MovementFinishedEvent {
    pub index: usize,
}

impl MovementFinishedEvent {
    pub const TYPE: &'static str = "movement finished";
}

impl EventTrait for MovementFinishedEvent {
    fn type_(&self) -> &'static str {
        Self::TYPE
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}
