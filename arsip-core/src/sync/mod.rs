mod controller;
mod state;

pub use self::{
    controller::{BoardEvent, BoardView, SyncController},
    state::{reduce, Action, Alert, BoardState, Effect, LoadPhase},
};
