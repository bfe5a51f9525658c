//! Persistence adapter - the save artifact
//!
//! One JSON save artifact per run, containing the full game snapshot.

mod save;

pub use save::{
    delete_save, has_save, load, load_from_path, save, save_to_path, SaveError,
};
