use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate, JsonSchema)]
pub struct Deck {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(nested)]
    pub cards: Vec<Card>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate, JsonSchema)]
pub struct Card {
    #[validate(length(min = 1))]
    pub front: String, // prompt side
    #[validate(length(min = 1))]
    pub back: String, // answer side
}
