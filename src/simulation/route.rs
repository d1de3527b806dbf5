use serde::{Deserialize, Serialize};

/// A single waypoint on a route. Coordinates are WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lon: f64,
}

impl RoutePoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        RoutePoint { lat, lon }
    }
}

/// An ordered sequence of waypoints. Insertion order defines traversal order.
/// A route may be empty before setup; the simulator treats an empty route as
/// "nothing to drive".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    points: Vec<RoutePoint>,
}

impl Route {
    pub fn from_points(points: Vec<RoutePoint>) -> Self {
        Route { points }
    }

    /// The fixed demo route through San Francisco. Same three waypoints on
    /// every call.
    pub fn demo() -> Self {
        Route::from_points(vec![
            RoutePoint::new(37.7749, -122.4194),
            RoutePoint::new(37.7849, -122.4094),
            RoutePoint::new(37.7949, -122.3994),
        ])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RoutePoint> {
        self.points.get(index)
    }

    pub fn first(&self) -> Option<&RoutePoint> {
        self.points.first()
    }

    /// Index of the final waypoint. `None` for an empty route.
    pub fn last_index(&self) -> Option<usize> {
        self.points.len().checked_sub(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutePoint> {
        self.points.iter()
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_demo_route_is_deterministic() {
        let route = Route::demo();
        assert_eq!(route.len(), 3);
        assert_eq!(route, Route::demo());

        assert_approx_eq!(route.get(0).unwrap().lat, 37.7749);
        assert_approx_eq!(route.get(0).unwrap().lon, -122.4194);
        assert_approx_eq!(route.get(1).unwrap().lat, 37.7849);
        assert_approx_eq!(route.get(1).unwrap().lon, -122.4094);
        assert_approx_eq!(route.get(2).unwrap().lat, 37.7949);
        assert_approx_eq!(route.get(2).unwrap().lon, -122.3994);
    }

    #[test]
    fn test_empty_route() {
        let route = Route::default();
        assert!(route.is_empty());
        assert_eq!(route.first(), None);
        assert_eq!(route.last_index(), None);
    }

    #[test]
    fn test_last_index() {
        assert_eq!(Route::demo().last_index(), Some(2));
    }
}
