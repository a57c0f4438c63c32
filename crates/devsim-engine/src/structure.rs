//! # devsim-engine::structure
//!
//! Structural changes staged by an executive. Calls made through the context
//! during an executive transition are recorded as values here and applied by
//! the coordinator once the transition has returned, so the graph every other
//! simulator sees within the bag stays consistent.

use devsim_model::ctx::NewModel;
use devsim_types::id::ModelId;

#[derive(Debug)]
pub enum StructuralChange {
    CreateModel {
        /// Path of the coupled model that will own the newcomer.
        parent: String,
        model: NewModel,
        /// Id reserved at staging time and returned to the executive.
        id: ModelId,
    },
    CreateFromClass {
        class: String,
        name: String,
        /// The executive's own scope, captured at staging time.
        parent: String,
        id: ModelId,
    },
    DeleteModel {
        model: String,
    },
    AddConnection {
        src: String,
        src_port: String,
        dst: String,
        dst_port: String,
    },
    RemoveConnection {
        src: String,
        src_port: String,
        dst: String,
        dst_port: String,
    },
    AddPort {
        model: String,
        port: String,
        input: bool,
    },
    RemovePort {
        model: String,
        port: String,
        input: bool,
    },
}
