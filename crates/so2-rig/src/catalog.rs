//! Rig model catalog
//!
//! Built once at startup from whatever registry the rig-control layer offers,
//! then only read. Manufacturers are sorted by name and each manufacturer's
//! models by model name, so indices are stable for the lifetime of the
//! catalog and can back a two-level picker.

use std::collections::BTreeMap;

/// One entry reported by a model registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RigModel {
    /// Numeric model id
    pub id: u32,
    /// Manufacturer name
    pub manufacturer: String,
    /// Model name
    pub name: String,
}

impl RigModel {
    /// Build an entry
    pub fn new(id: u32, manufacturer: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            manufacturer: manufacturer.into(),
            name: name.into(),
        }
    }
}

/// Capability enumeration of the rig-control layer
pub trait ModelRegistry {
    /// Every model the layer can drive
    fn models(&self) -> Vec<RigModel>;
}

/// Models backed by the transports in this crate
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinModels;

impl ModelRegistry for BuiltinModels {
    fn models(&self) -> Vec<RigModel> {
        vec![
            RigModel::new(2, "Hamlib", "NET rigctl"),
            RigModel::new(2014, "Kenwood", "TS-2000"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Manufacturer {
    name: String,
    models: Vec<(String, u32)>,
}

/// Immutable manufacturer → models table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    manufacturers: Vec<Manufacturer>,
}

impl ModelCatalog {
    /// Build the catalog from a registry
    pub fn from_registry(registry: &dyn ModelRegistry) -> Self {
        Self::from_models(registry.models())
    }

    /// Build the catalog from a list of models
    pub fn from_models(models: impl IntoIterator<Item = RigModel>) -> Self {
        let mut grouped: BTreeMap<String, Vec<(String, u32)>> = BTreeMap::new();
        for model in models {
            grouped
                .entry(model.manufacturer)
                .or_default()
                .push((model.name, model.id));
        }

        let manufacturers = grouped
            .into_iter()
            .map(|(name, mut models)| {
                models.sort();
                Manufacturer { name, models }
            })
            .collect();
        Self { manufacturers }
    }

    /// Number of manufacturers
    pub fn n_mfg(&self) -> usize {
        self.manufacturers.len()
    }

    /// Manufacturer name by index
    pub fn mfg_name(&self, mfg: usize) -> Option<&str> {
        self.manufacturers.get(mfg).map(|m| m.name.as_str())
    }

    /// Number of models for a manufacturer (0 for a bad index)
    pub fn n_models(&self, mfg: usize) -> usize {
        self.manufacturers.get(mfg).map_or(0, |m| m.models.len())
    }

    /// Model name by manufacturer and model index
    pub fn model_name(&self, mfg: usize, model: usize) -> Option<&str> {
        self.manufacturers
            .get(mfg)?
            .models
            .get(model)
            .map(|(name, _)| name.as_str())
    }

    /// Model id by manufacturer and model index
    pub fn model_id(&self, mfg: usize, model: usize) -> Option<u32> {
        self.manufacturers
            .get(mfg)?
            .models
            .get(model)
            .map(|(_, id)| *id)
    }

    /// Position of model `id` within manufacturer `mfg`
    pub fn model_index(&self, mfg: usize, id: u32) -> Option<usize> {
        self.manufacturers
            .get(mfg)?
            .models
            .iter()
            .position(|(_, model_id)| *model_id == id)
    }

    /// Find model `id`, returning `(manufacturer index, model index)`
    pub fn lookup(&self, id: u32) -> Option<(usize, usize)> {
        self.manufacturers
            .iter()
            .enumerate()
            .find_map(|(mfg, m)| {
                m.models
                    .iter()
                    .position(|(_, model_id)| *model_id == id)
                    .map(|model| (mfg, model))
            })
    }

    /// `"Manufacturer Model"` for model `id`
    pub fn describe(&self, id: u32) -> Option<String> {
        let (mfg, model) = self.lookup(id)?;
        Some(format!(
            "{} {}",
            self.mfg_name(mfg)?,
            self.model_name(mfg, model)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl ModelRegistry for Fixed {
        fn models(&self) -> Vec<RigModel> {
            vec![
                RigModel::new(3073, "Icom", "IC-7300"),
                RigModel::new(2014, "Kenwood", "TS-2000"),
                RigModel::new(1035, "Yaesu", "FT-991"),
                RigModel::new(3078, "Icom", "IC-7610"),
                RigModel::new(3060, "Icom", "IC-7100"),
                RigModel::new(2029, "Kenwood", "TS-590S"),
            ]
        }
    }

    #[test]
    fn test_sorted() {
        let catalog = ModelCatalog::from_registry(&Fixed);

        assert_eq!(catalog.n_mfg(), 3);
        assert_eq!(catalog.mfg_name(0), Some("Icom"));
        assert_eq!(catalog.mfg_name(2), Some("Yaesu"));
        assert_eq!(catalog.n_models(0), 3);
        assert_eq!(catalog.model_name(0, 0), Some("IC-7100"));
        assert_eq!(catalog.model_name(0, 2), Some("IC-7610"));
        assert_eq!(catalog.model_id(1, 1), Some(2029));
    }

    #[test]
    fn test_lookup() {
        let catalog = ModelCatalog::from_registry(&Fixed);

        assert_eq!(catalog.lookup(3073), Some((0, 1)));
        assert_eq!(catalog.model_index(1, 2014), Some(0));
        assert_eq!(catalog.model_index(0, 2014), None);
        assert_eq!(catalog.lookup(9999), None);
        assert_eq!(catalog.describe(1035).as_deref(), Some("Yaesu FT-991"));
    }

    #[test]
    fn test_bad_indices() {
        let catalog = ModelCatalog::from_registry(&Fixed);
        assert_eq!(catalog.mfg_name(7), None);
        assert_eq!(catalog.n_models(7), 0);
        assert_eq!(catalog.model_name(0, 9), None);
    }

    #[test]
    fn test_builtin() {
        let catalog = ModelCatalog::from_registry(&BuiltinModels);
        assert_eq!(catalog.describe(2).as_deref(), Some("Hamlib NET rigctl"));
    }
}
