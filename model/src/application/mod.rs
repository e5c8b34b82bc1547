//! Application-owned objects: interactions and their typed data.

mod interaction;

pub use self::interaction::{
    CommandData, ComponentData, Interaction, InteractionData, InteractionResponse,
    InteractionType, ModalData,
};
