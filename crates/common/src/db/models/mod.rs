//! SeaORM entity models

mod story;

pub use story::{
    Entity as StoryEntity,
    Model as Story,
    ActiveModel as StoryActiveModel,
    Column as StoryColumn,
};
