pub mod availability;
pub mod collab;
pub mod common;
pub mod engine;
pub mod model;
pub mod reconciler;
mod state;
mod wear;

pub use availability::is_available;
pub use collab::{AuthProvider, Classification, Classifier, Recommender, UserId};
pub use engine::{Closet, MutationError};
pub use model::{
    ClothingItem, Criteria, ImageRef, ItemId, ItemUpdate, NewItem, Outfit, ScheduleEntry,
    ScheduleUpdate, TempId, UserSettings,
};
pub use reconciler::SyncStatus;
