use eframe::egui::{Vec2, vec2};

use super::quadtree::Cell;

const THETA: f32 = 0.72;
const MIN_DISTANCE: f32 = 0.0001;

/// Direction for coincident points, spread by index so pairs separate.
fn fallback_direction(a: usize, b: usize) -> Vec2 {
    let angle = (a as f32 * 0.618_034 + b as f32 * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

#[derive(Clone, Copy)]
pub(super) struct Repulsion {
    pub(super) strength: f32,
    pub(super) softening: f32,
}

impl Repulsion {
    fn between(self, delta: Vec2, mass: f32) -> Vec2 {
        let distance_sq = delta.length_sq();
        let distance = distance_sq.sqrt();
        let direction = if distance > MIN_DISTANCE {
            delta / distance
        } else {
            vec2(1.0, 0.0)
        };
        direction * (self.strength * mass / (distance_sq + self.softening))
    }

    /// Repulsion on point `index` from every other point, approximating far
    /// cells by their centroid.
    pub(super) fn accumulate(self, cell: &Cell, index: usize, positions: &[Vec2]) -> Vec2 {
        if cell.mass <= 0.0 {
            return Vec2::ZERO;
        }
        let point = positions[index];

        if cell.is_leaf() {
            return cell
                .points
                .iter()
                .filter(|&&other| other != index)
                .map(|&other| self.between(point - positions[other], 1.0))
                .fold(Vec2::ZERO, |acc, force| acc + force);
        }

        let delta = point - cell.centroid;
        let distance = delta.length().max(MIN_DISTANCE);
        if !cell.square.contains(point) && cell.square.side() / distance < THETA && cell.mass > 1.0 {
            return self.between(delta, cell.mass);
        }

        cell.children()
            .map(|child| self.accumulate(child, index, positions))
            .fold(Vec2::ZERO, |acc, force| acc + force)
    }
}

#[derive(Clone, Copy)]
pub(super) struct Collision {
    pub(super) strength: f32,
    /// Largest possible radius sum; cells further apart are skipped.
    pub(super) reach: f32,
}

impl Collision {
    fn resolve(self, from: usize, to: usize, positions: &[Vec2], radii: &[f32], forces: &mut [Vec2]) {
        let delta = positions[from] - positions[to];
        let distance = delta.length();
        let minimum = radii[from] + radii[to];
        if distance >= minimum {
            return;
        }
        let direction = if distance > MIN_DISTANCE {
            delta / distance
        } else {
            fallback_direction(from, to)
        };
        let push = direction * ((minimum - distance) * self.strength);
        forces[from] += push;
        forces[to] -= push;
    }

    /// Pushes apart every pair of overlapping circles, pruning cell pairs that
    /// are out of reach.
    pub(super) fn accumulate(
        self,
        a: &Cell,
        b: &Cell,
        same: bool,
        positions: &[Vec2],
        radii: &[f32],
        forces: &mut [Vec2],
    ) {
        if a.square.gap_sq(b.square) > self.reach * self.reach {
            return;
        }

        if a.is_leaf() && b.is_leaf() {
            if same {
                for (offset, &from) in a.points.iter().enumerate() {
                    for &to in &a.points[offset + 1..] {
                        self.resolve(from, to, positions, radii, forces);
                    }
                }
            } else {
                for &from in &a.points {
                    for &to in &b.points {
                        self.resolve(from, to, positions, radii, forces);
                    }
                }
            }
            return;
        }

        if same {
            let children: Vec<&Cell> = a.children().collect();
            for (offset, first) in children.iter().enumerate() {
                self.accumulate(first, first, true, positions, radii, forces);
                for second in &children[offset + 1..] {
                    self.accumulate(first, second, false, positions, radii, forces);
                }
            }
            return;
        }

        let split_a = !a.is_leaf() && (b.is_leaf() || a.square.half >= b.square.half);
        if split_a {
            for child in a.children() {
                self.accumulate(child, b, false, positions, radii, forces);
            }
        } else {
            for child in b.children() {
                self.accumulate(a, child, false, positions, radii, forces);
            }
        }
    }
}

#[derive(Clone, Copy)]
pub(super) struct Springs {
    pub(super) rest_length: f32,
    pub(super) strength: f32,
    pub(super) damping: f32,
}

impl Springs {
    pub(super) fn accumulate(
        self,
        links: &[(usize, usize)],
        positions: &[Vec2],
        velocities: &[Vec2],
        radii: &[f32],
        forces: &mut [Vec2],
    ) {
        for &(from, to) in links {
            let delta = positions[from] - positions[to];
            let distance = delta.length();
            if distance <= MIN_DISTANCE {
                continue;
            }
            let direction = delta / distance;
            let rest = self.rest_length + radii[from] + radii[to];
            let stretch = (distance - rest) * self.strength;
            let closing = (velocities[from] - velocities[to]).dot(direction) * self.damping;
            let correction = direction * (stretch + closing);
            forces[from] -= correction;
            forces[to] += correction;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repulsion_pushes_points_apart() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let root = Cell::build(&positions).expect("finite");
        let repulsion = Repulsion {
            strength: 1000.0,
            softening: 1.0,
        };

        assert!(repulsion.accumulate(&root, 0, &positions).x < 0.0);
        assert!(repulsion.accumulate(&root, 1, &positions).x > 0.0);
    }

    #[test]
    fn overlapping_circles_separate() {
        let positions = vec![vec2(0.0, 0.0), vec2(5.0, 0.0)];
        let radii = vec![4.0, 4.0];
        let mut forces = vec![Vec2::ZERO; 2];
        let root = Cell::build(&positions).expect("finite");
        let collision = Collision {
            strength: 1.0,
            reach: 8.0,
        };

        collision.accumulate(&root, &root, true, &positions, &radii, &mut forces);
        assert_eq!(forces[0], vec2(-3.0, 0.0));
        assert_eq!(forces[1], vec2(3.0, 0.0));
    }

    #[test]
    fn stretched_spring_pulls_together() {
        let positions = vec![vec2(0.0, 0.0), vec2(200.0, 0.0)];
        let velocities = vec![Vec2::ZERO; 2];
        let radii = vec![0.0; 2];
        let mut forces = vec![Vec2::ZERO; 2];
        let springs = Springs {
            rest_length: 100.0,
            strength: 0.1,
            damping: 0.0,
        };

        springs.accumulate(&[(0, 1)], &positions, &velocities, &radii, &mut forces);
        assert!(forces[0].x > 0.0);
        assert!(forces[1].x < 0.0);
    }
}
