// steward-core/src/domain/batch/mod.rs

pub mod group;
pub mod negative_ages;

pub use group::{CoGroup, Record, co_group_by_person, person_key};
pub use negative_ages::DropNegativeAges;
