pub const DEFAULT_LAYER: &str = "Default";
pub const MAP_LAYER: &str = "Map";
pub const OBSTACLE_LAYER: &str = "Obstacle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(u8);

impl LayerId {
    pub fn index(self) -> u8 {
        self.0
    }
}

/// Bit set of layers; a query only sees colliders whose layer bit is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LayerMask(u32);

impl LayerMask {
    pub const NONE: Self = Self(0);

    pub fn of(layer: LayerId) -> Self {
        Self(1u32 << layer.index())
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(self, layer: LayerId) -> bool {
        self.0 & (1u32 << layer.index()) != 0
    }
}

/// Named layers, resolved by name the way scene data refers to them.
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    names: Vec<String>,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self {
            names: vec![
                DEFAULT_LAYER.to_string(),
                MAP_LAYER.to_string(),
                OBSTACLE_LAYER.to_string(),
            ],
        }
    }
}

impl LayerRegistry {
    pub fn name_to_layer(&self, name: &str) -> Option<LayerId> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|index| LayerId(index as u8))
    }

    /// Unknown names contribute nothing to the mask.
    pub fn mask_of(&self, names: &[&str]) -> LayerMask {
        names
            .iter()
            .filter_map(|name| self.name_to_layer(name))
            .fold(LayerMask::NONE, |mask, layer| mask.union(LayerMask::of(layer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layers_resolve_in_order() {
        let registry = LayerRegistry::default();
        assert_eq!(registry.name_to_layer(DEFAULT_LAYER).map(LayerId::index), Some(0));
        assert_eq!(registry.name_to_layer(MAP_LAYER).map(LayerId::index), Some(1));
        assert_eq!(registry.name_to_layer(OBSTACLE_LAYER).map(LayerId::index), Some(2));
        assert!(registry.name_to_layer("Water").is_none());
    }

    #[test]
    fn mask_of_combines_named_layers_and_skips_unknown() {
        let registry = LayerRegistry::default();
        let mask = registry.mask_of(&[MAP_LAYER, OBSTACLE_LAYER, "Water"]);
        let map = registry.name_to_layer(MAP_LAYER).expect("map");
        let obstacle = registry.name_to_layer(OBSTACLE_LAYER).expect("obstacle");
        let default = registry.name_to_layer(DEFAULT_LAYER).expect("default");
        assert!(mask.contains(map));
        assert!(mask.contains(obstacle));
        assert!(!mask.contains(default));
        assert_eq!(mask, LayerMask::of(map).union(LayerMask::of(obstacle)));
    }
}
