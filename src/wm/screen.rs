//! Screen Module
//!
//! The fixed set of physical display regions. Every screen is bound to
//! exactly one group for the daemon's whole lifetime; only *which* group
//! changes, through the scheduler's pull operation. Geometry is kept so new
//! windows can be routed to the screen they appear on.

use tracing::debug;

/// A rectangle in root-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    /// Whether the point lies inside this rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x + self.width as i32
            && y >= self.y
            && y < self.y + self.height as i32
    }
}

/// One physical display region and the group currently shown on it.
#[derive(Debug)]
pub struct Screen {
    /// Position in the topology order reported at startup.
    pub index: usize,

    /// Region in root coordinates.
    pub geometry: Geometry,

    /// Index of the bound group. Screens are never idle.
    pub group: usize,
}

/// All screens, indexed `0..len()`. The set is fixed at startup; outputs are
/// not added or removed at runtime.
#[derive(Debug)]
pub struct ScreenSet {
    screens: Vec<Screen>,
}

impl ScreenSet {
    /// Bind screens one-to-one to groups `0..N-1` in topology order.
    pub fn new(geometries: Vec<Geometry>) -> Self {
        let screens: Vec<Screen> = geometries
            .into_iter()
            .enumerate()
            .map(|(index, geometry)| {
                debug!(
                    "Screen {}: {}x{} at ({}, {}), initial group {}",
                    index, geometry.width, geometry.height, geometry.x, geometry.y, index
                );
                Screen {
                    index,
                    geometry,
                    group: index,
                }
            })
            .collect();

        Self { screens }
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn get(&self, index: usize) -> &Screen {
        &self.screens[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Screen {
        &mut self.screens[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Screen> {
        self.screens.iter()
    }

    /// Screen containing the given root coordinate. Windows mapped off every
    /// monitor land on screen 0.
    pub fn at_point(&self, x: i32, y: i32) -> usize {
        self.screens
            .iter()
            .find(|screen| screen.geometry.contains(x, y))
            .map(|screen| screen.index)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side_by_side(count: usize) -> ScreenSet {
        let geometries = (0..count)
            .map(|i| Geometry {
                x: i as i32 * 800,
                y: 0,
                width: 800,
                height: 600,
            })
            .collect();
        ScreenSet::new(geometries)
    }

    #[test]
    fn initial_binding_is_one_to_one() {
        let screens = side_by_side(2);
        assert_eq!(screens.len(), 2);
        assert_eq!(screens.get(0).group, 0);
        assert_eq!(screens.get(1).group, 1);
    }

    #[test]
    fn at_point_picks_containing_screen() {
        let screens = side_by_side(2);
        assert_eq!(screens.at_point(10, 10), 0);
        assert_eq!(screens.at_point(799, 599), 0);
        assert_eq!(screens.at_point(800, 0), 1);
        assert_eq!(screens.at_point(1200, 300), 1);
    }

    #[test]
    fn at_point_off_every_screen_falls_back_to_zero() {
        let screens = side_by_side(2);
        assert_eq!(screens.at_point(-50, -50), 0);
        assert_eq!(screens.at_point(5000, 0), 0);
    }
}
