use serde::{Deserialize, Serialize};

/// A coefficient together with the flag saying whether it is used
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Element {
    pub value: f64,
    pub active: bool,
}

impl Element {
    pub fn new(value: f64, active: bool) -> Self {
        Self { value, active }
    }

    pub fn toggle(&mut self) {
        self.active = !self.active;
    }
}
