use std::fmt;

/// Identifier of a custom layer registered with the map engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const MODEL_LAYER_PREFIX: &str = "3d-model";

/// Hands out `3d-model-<n>` ids, never the same one twice.
#[derive(Debug, Default)]
pub struct LayerIdGenerator {
    next: u64,
}

impl LayerIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> LayerId {
        self.next += 1;
        LayerId(format!("{MODEL_LAYER_PREFIX}-{}", self.next))
    }
}

pub trait Layer {
    fn id(&self) -> &LayerId;
}
