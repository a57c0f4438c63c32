//! # devsim-engine::ids
//!
//! Provides a generator for unique, monotonic model ids. Ids are never
//! reused, so references held by tombstoned events stay unambiguous after a
//! model is deleted.

use devsim_types::id::ModelId;

pub struct IdGen {
    model_id: ModelId,
}

impl IdGen {
    pub fn new() -> Self {
        Self { model_id: 0 }
    }

    pub fn next_model_id(&mut self) -> ModelId {
        let id = self.model_id;
        self.model_id = self.model_id.checked_add(1).expect("ModelId overflow");
        id
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}
