pub mod behavior;
pub mod columns;
pub mod data_model;
pub mod drag;
pub mod editing;
pub mod events;
pub mod export;
pub mod filter;
pub mod grid_state;
pub mod grouping;
pub mod navigation;
pub mod options;
pub mod pipeline;
pub mod selection;
pub mod server;
pub mod sort;
pub mod viewport;

pub use grid_state::GridState;
