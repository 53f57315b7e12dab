use std::fmt::Display;

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        };
        f.write_str(name)
    }
}

impl Axis {
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];
    pub const HORIZONTAL: [Self; 2] = [Self::X, Self::Z];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    #[must_use]
    pub const fn of(self, v: DVec3) -> f64 {
        match self {
            Self::X => v.x,
            Self::Y => v.y,
            Self::Z => v.z,
        }
    }

    #[must_use]
    pub const fn of_cell(self, v: IVec3) -> i32 {
        match self {
            Self::X => v.x,
            Self::Y => v.y,
            Self::Z => v.z,
        }
    }

    pub const fn set(self, v: &mut DVec3, value: f64) {
        match self {
            Self::X => v.x = value,
            Self::Y => v.y = value,
            Self::Z => v.z = value,
        }
    }

    pub const fn set_cell(self, v: &mut IVec3, value: i32) {
        match self {
            Self::X => v.x = value,
            Self::Y => v.y = value,
            Self::Z => v.z = value,
        }
    }

    /// A vector of length `d` along this axis.
    #[must_use]
    pub fn vec(self, d: f64) -> DVec3 {
        let mut v = DVec3::ZERO;
        self.set(&mut v, d);
        v
    }

    /// The two axes perpendicular to this one, in cyclic order.
    #[must_use]
    pub const fn others(self) -> [Self; 2] {
        match self {
            Self::X => [Self::Y, Self::Z],
            Self::Y => [Self::Z, Self::X],
            Self::Z => [Self::X, Self::Y],
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::Axis;

    #[test]
    fn set_then_of() {
        let mut v = DVec3::ZERO;
        for (i, axis) in Axis::ALL.into_iter().enumerate() {
            axis.set(&mut v, i as f64 + 1.0);
        }
        assert_eq!(v, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(Axis::Z.vec(2.5), DVec3::new(0.0, 0.0, 2.5));
    }

    #[test]
    fn others_exclude_self() {
        for axis in Axis::ALL {
            assert!(!axis.others().contains(&axis));
        }
    }
}
