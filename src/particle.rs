use glam::DVec3;

use crate::boundary::GhostImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleTag {
    Real,
    /// Ghost image of the real particle with index `origin`.
    Ghost { origin: usize },
}

/// A generator point of the moving mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: DVec3,
    pub id: i64,
    pub tag: ParticleTag,
}

impl Particle {
    pub fn real(position: DVec3, id: i64) -> Self {
        Self {
            position,
            id,
            tag: ParticleTag::Real,
        }
    }

    pub fn is_ghost(&self) -> bool {
        matches!(self.tag, ParticleTag::Ghost { .. })
    }
}

/// A ghost particle together with the image that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostEntry {
    pub origin: usize,
    pub image: GhostImage,
}

/// Partition of the combined particle array into real particles (the prefix
/// `0..num_real`) and ghosts (the tail), with the back-reference of every ghost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleIndex {
    num_real: usize,
    ghosts: Vec<GhostEntry>,
}

impl ParticleIndex {
    pub fn real_only(num_real: usize) -> Self {
        Self {
            num_real,
            ghosts: vec![],
        }
    }

    pub fn new(num_real: usize, ghosts: Vec<GhostEntry>) -> Self {
        Self { num_real, ghosts }
    }

    pub fn num_real(&self) -> usize {
        self.num_real
    }

    pub fn num_ghost(&self) -> usize {
        self.ghosts.len()
    }

    pub fn len(&self) -> usize {
        self.num_real + self.ghosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_real(&self, idx: usize) -> bool {
        idx < self.num_real
    }

    pub fn is_ghost(&self, idx: usize) -> bool {
        idx >= self.num_real && idx < self.len()
    }

    pub fn real(&self) -> std::ops::Range<usize> {
        0..self.num_real
    }

    pub fn ghost_entry(&self, idx: usize) -> Option<&GhostEntry> {
        idx.checked_sub(self.num_real)
            .and_then(|offset| self.ghosts.get(offset))
    }

    /// Index of the real particle `idx` refers to (itself when real).
    pub fn origin(&self, idx: usize) -> usize {
        self.ghost_entry(idx).map_or(idx, |entry| entry.origin)
    }

    pub fn tag(&self, idx: usize) -> ParticleTag {
        match self.ghost_entry(idx) {
            Some(entry) => ParticleTag::Ghost {
                origin: entry.origin,
            },
            None => ParticleTag::Real,
        }
    }

    pub fn ghosts(&self) -> &[GhostEntry] {
        &self.ghosts
    }

    /// Tagged particles for the combined `positions`, ghosts carrying the id of their origin.
    pub fn particles(&self, positions: &[DVec3], ids: &[i64]) -> Vec<Particle> {
        positions
            .iter()
            .take(self.len())
            .enumerate()
            .map(|(idx, &position)| {
                let id = ids.get(self.origin(idx)).copied().unwrap_or(-1);
                match self.tag(idx) {
                    ParticleTag::Real => Particle::real(position, id),
                    tag => Particle { position, id, tag },
                }
            })
            .collect()
    }

    /// Drop all ghosts, keeping only the real particles.
    pub fn reset(&mut self) {
        self.ghosts.clear();
    }
}

#[cfg(test)]
mod test {
    use glam::DVec3;

    use super::*;

    #[test]
    fn test_ghost_lookup() {
        let image = GhostImage::translation(DVec3::X);
        let index = ParticleIndex::new(
            3,
            vec![
                GhostEntry { origin: 2, image },
                GhostEntry { origin: 0, image },
            ],
        );
        assert_eq!(index.len(), 5);
        assert!(index.is_real(2));
        assert!(index.is_ghost(3));
        assert!(!index.is_ghost(5));
        assert_eq!(index.origin(4), 0);
        assert_eq!(index.origin(1), 1);
        assert_eq!(index.tag(3), ParticleTag::Ghost { origin: 2 });
        assert_eq!(index.tag(0), ParticleTag::Real);

        let positions = [DVec3::ZERO, DVec3::Y, DVec3::ONE, 2. * DVec3::X, DVec3::X];
        let particles = index.particles(&positions, &[10, 11, 12]);
        assert_eq!(particles.len(), 5);
        assert!(!particles[1].is_ghost());
        assert_eq!(particles[1].id, 11);
        assert!(particles[3].is_ghost());
        assert_eq!(particles[3].id, 12);
        assert_eq!(particles[4].id, 10);
        assert_eq!(particles[4].position, DVec3::X);
    }
}
