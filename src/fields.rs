//! Named per-particle property arrays.

use std::collections::BTreeMap;

use crate::{errors::ExchangeError, utils::HydroDimension};

/// A single property array.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    F64(Vec<f64>),
    I64(Vec<i64>),
}

impl Property {
    pub fn len(&self) -> usize {
        match self {
            Property::F64(values) => values.len(),
            Property::I64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resize(&mut self, num_particles: usize) {
        match self {
            Property::F64(values) => values.resize(num_particles, 0.),
            Property::I64(values) => values.resize(num_particles, 0),
        }
    }

    fn retain_mask(&mut self, keep: &[bool]) {
        fn retain<T>(values: &mut Vec<T>, keep: &[bool]) {
            let mut keep = keep.iter();
            values.retain(|_| keep.next().copied().unwrap_or(true));
        }
        match self {
            Property::F64(values) => retain(values, keep),
            Property::I64(values) => retain(values, keep),
        }
    }

    fn select(&self, ids: &[usize]) -> Self {
        match self {
            Property::F64(values) => Property::F64(ids.iter().map(|&i| values[i]).collect()),
            Property::I64(values) => Property::I64(ids.iter().map(|&i| values[i]).collect()),
        }
    }
}

/// Keyed store of equally long property arrays, one entry per particle.
///
/// Properties are kept in name order, so that every rank iterates them identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleContainer {
    num_particles: usize,
    properties: BTreeMap<String, Property>,
}

impl ParticleContainer {
    pub fn new(num_particles: usize) -> Self {
        Self {
            num_particles,
            properties: BTreeMap::new(),
        }
    }

    /// Container with the fields of the hydro scheme registered: the generator positions, ids
    /// and the conserved quantities. Only real particles are exchanged, so no tag is stored.
    pub fn hydro(num_particles: usize, dimensionality: HydroDimension) -> Self {
        let axes = &["x", "y", "z"][..dimensionality.dim()];
        let mut container = Self::new(num_particles);
        for axis in axes {
            container.register_f64(&format!("position-{axis}"));
            container.register_f64(&format!("momentum-{axis}"));
        }
        container.register_f64("mass");
        container.register_f64("energy");
        container.register_i64("ids");
        container
    }

    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(|name| name.as_str())
    }

    /// Register a floating point property, initialised to zero. Existing properties are kept.
    pub fn register_f64(&mut self, name: &str) {
        let num_particles = self.num_particles;
        self.properties
            .entry(name.to_string())
            .or_insert_with(|| Property::F64(vec![0.; num_particles]));
    }

    /// Register an integer property, initialised to zero. Existing properties are kept.
    pub fn register_i64(&mut self, name: &str) {
        let num_particles = self.num_particles;
        self.properties
            .entry(name.to_string())
            .or_insert_with(|| Property::I64(vec![0; num_particles]));
    }

    pub fn get(&self, name: &str) -> Result<&Property, ExchangeError> {
        self.properties
            .get(name)
            .ok_or_else(|| ExchangeError::UnknownProperty(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Property, ExchangeError> {
        self.properties
            .get_mut(name)
            .ok_or_else(|| ExchangeError::UnknownProperty(name.to_string()))
    }

    pub fn f64(&self, name: &str) -> Result<&[f64], ExchangeError> {
        match self.get(name)? {
            Property::F64(values) => Ok(values.as_slice()),
            Property::I64(_) => Err(ExchangeError::PropertyType(name.to_string())),
        }
    }

    pub fn f64_mut(&mut self, name: &str) -> Result<&mut [f64], ExchangeError> {
        match self.get_mut(name)? {
            Property::F64(values) => Ok(values.as_mut_slice()),
            Property::I64(_) => Err(ExchangeError::PropertyType(name.to_string())),
        }
    }

    pub fn i64(&self, name: &str) -> Result<&[i64], ExchangeError> {
        match self.get(name)? {
            Property::I64(values) => Ok(values.as_slice()),
            Property::F64(_) => Err(ExchangeError::PropertyType(name.to_string())),
        }
    }

    pub fn i64_mut(&mut self, name: &str) -> Result<&mut [i64], ExchangeError> {
        match self.get_mut(name)? {
            Property::I64(values) => Ok(values.as_mut_slice()),
            Property::F64(_) => Err(ExchangeError::PropertyType(name.to_string())),
        }
    }

    pub(crate) fn properties_mut(&mut self) -> impl Iterator<Item = (&str, &mut Property)> {
        self.properties
            .iter_mut()
            .map(|(name, property)| (name.as_str(), property))
    }

    /// Grow or shrink every property. New entries are zero.
    pub fn resize(&mut self, num_particles: usize) {
        for property in self.properties.values_mut() {
            property.resize(num_particles);
        }
        self.num_particles = num_particles;
    }

    /// Remove the particles with the given indices, keeping the order of the others.
    pub fn remove(&mut self, ids: &[usize]) -> Result<(), ExchangeError> {
        let mut keep = vec![true; self.num_particles];
        for &id in ids {
            match keep.get_mut(id) {
                Some(flag) => *flag = false,
                None => {
                    return Err(ExchangeError::MalformedExport(format!(
                        "cannot remove particle {id} of {}",
                        self.num_particles
                    )))
                }
            }
        }
        for property in self.properties.values_mut() {
            property.retain_mask(&keep);
        }
        self.num_particles = keep.iter().filter(|&&k| k).count();
        Ok(())
    }

    /// Copy the particles with the given indices (in that order) into a new container.
    pub fn extract(&self, ids: &[usize]) -> Result<ParticleContainer, ExchangeError> {
        if let Some(&id) = ids.iter().find(|&&id| id >= self.num_particles) {
            return Err(ExchangeError::MalformedExport(format!(
                "cannot extract particle {id} of {}",
                self.num_particles
            )));
        }
        Ok(ParticleContainer {
            num_particles: ids.len(),
            properties: self
                .properties
                .iter()
                .map(|(name, property)| (name.clone(), property.select(ids)))
                .collect(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn numbered(n: usize) -> ParticleContainer {
        let mut container = ParticleContainer::hydro(n, HydroDimension::HydroDimension2D);
        for (i, x) in container.f64_mut("position-x").unwrap().iter_mut().enumerate() {
            *x = i as f64;
        }
        for (i, id) in container.i64_mut("ids").unwrap().iter_mut().enumerate() {
            *id = 100 + i as i64;
        }
        container
    }

    #[test]
    fn test_hydro_fields() {
        let container = ParticleContainer::hydro(4, HydroDimension::HydroDimension2D);
        let names: Vec<_> = container.property_names().collect();
        assert_eq!(
            names,
            vec!["energy", "ids", "mass", "momentum-x", "momentum-y", "position-x", "position-y"]
        );
        assert_eq!(container.f64("mass").unwrap().len(), 4);
        assert!(matches!(
            container.f64("position-z"),
            Err(ExchangeError::UnknownProperty(_))
        ));
        assert!(matches!(container.f64("ids"), Err(ExchangeError::PropertyType(_))));
    }

    #[test]
    fn test_remove_extract_resize() {
        let mut container = numbered(6);
        let extracted = container.extract(&[4, 1]).unwrap();
        assert_eq!(extracted.num_particles(), 2);
        assert_eq!(extracted.f64("position-x").unwrap(), &[4., 1.]);
        assert_eq!(extracted.i64("ids").unwrap(), &[104, 101]);

        container.remove(&[4, 1]).unwrap();
        assert_eq!(container.num_particles(), 4);
        assert_eq!(container.f64("position-x").unwrap(), &[0., 2., 3., 5.]);

        container.resize(6);
        assert_eq!(container.f64("position-x").unwrap(), &[0., 2., 3., 5., 0., 0.]);
        assert_eq!(container.i64("ids").unwrap().len(), 6);

        assert!(container.remove(&[6]).is_err());
        assert!(container.extract(&[7]).is_err());
    }
}
