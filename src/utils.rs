use glam::DVec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
#[repr(usize)]
pub enum HydroDimension {
    HydroDimension2D = 2,
    HydroDimension3D = 3,
}

impl HydroDimension {
    /// Number of spatial dimensions.
    pub fn dim(&self) -> usize {
        (*self).into()
    }

    /// Minimal number of generators that can span a simplex.
    pub fn simplex_size(&self) -> usize {
        self.dim() + 1
    }

    /// Radius of the sphere (disc) with the given volume (area).
    pub fn effective_radius(&self, volume: f64) -> f64 {
        match self {
            HydroDimension::HydroDimension2D => (volume * std::f64::consts::FRAC_1_PI).sqrt(),
            HydroDimension::HydroDimension3D => {
                (0.75 * volume * std::f64::consts::FRAC_1_PI).cbrt()
            }
        }
    }

    /// Zero out the components that do not exist in this dimensionality.
    pub fn project(&self, v: DVec3) -> DVec3 {
        match self {
            HydroDimension::HydroDimension2D => DVec3::new(v.x, v.y, 0.),
            HydroDimension::HydroDimension3D => v,
        }
    }
}

pub fn contains(min: DVec3, max: DVec3, pos: DVec3, dimension: usize) -> bool {
    let mut contains = true;
    for i in 0..dimension {
        contains &= pos[i] >= min[i] && pos[i] < max[i];
    }
    contains
}

pub fn box_wrap(min: DVec3, max: DVec3, pos: &mut DVec3, dimension: usize) {
    let box_size = max - min;
    for i in 0..dimension {
        while pos[i] < min[i] {
            pos[i] += box_size[i];
        }
        while pos[i] >= max[i] {
            pos[i] -= box_size[i];
        }
    }
}

pub fn box_reflect(min: DVec3, max: DVec3, pos: &mut DVec3, dimension: usize) {
    for i in 0..dimension {
        if pos[i] < min[i] {
            pos[i] -= 2. * (pos[i] - min[i]);
        }
        if pos[i] > max[i] {
            pos[i] -= 2. * (pos[i] - max[i]);
        }
    }
}
