//! Pure board state machine.  `reduce` never touches the network or the disk,
//! it only describes what the executor has to do next.

use crate::record::{sort_newest_first, Record, RecordId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    /// Nothing to show yet, waiting for the network.
    Loading,
    /// Showing the cached snapshot, refreshed copy not (yet) available.
    StaleDisplayed,
    /// Showing what the remote store returned last.
    Fresh,
    /// Nothing cached and the network failed.
    Empty,
}

/// User-visible failure notices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alert {
    CreateFailed,
    UpdateFailed,
    DeleteFailed,
}

impl Alert {
    pub fn message(self) -> &'static str {
        match self {
            Self::CreateFailed => "Gagal menyimpan kenangan. Silakan coba lagi.",
            Self::UpdateFailed => "Gagal memperbarui kenangan.",
            Self::DeleteFailed => "Gagal menghapus kenangan.",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Action {
    CacheLoaded(Option<Vec<Record>>),
    FetchSucceeded(Vec<Record>),
    FetchFailed,
    CreateFailed,
    /// Carries the snapshot slot bytes as they were before the delete.
    DeleteRequested {
        id: RecordId,
        snapshot: Option<Vec<u8>>,
    },
    DeleteConfirmed(RecordId),
    DeleteFailed(RecordId),
    UpdateSucceeded {
        id: RecordId,
        title: String,
        caption: String,
    },
    UpdateFailed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    SaveSnapshot(Vec<Record>),
    /// Write back earlier snapshot bytes unchanged, `None` clears the slot.
    RestoreSnapshot(Option<Vec<u8>>),
    Render,
    Alert(Alert),
}

/// Board as it was right before an optimistic delete.
#[derive(Clone, Debug, PartialEq)]
struct PendingDelete {
    id: RecordId,
    records: Vec<Record>,
    snapshot: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoardState {
    records: Vec<Record>,
    phase: LoadPhase,
    pending_deletes: Vec<PendingDelete>,
}

impl BoardState {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn has_pending_delete(&self, id: &RecordId) -> bool {
        self.pending_deletes.iter().any(|pending| &pending.id == id)
    }
}

pub fn reduce(prev: &BoardState, action: Action) -> (BoardState, Vec<Effect>) {
    let mut next = prev.clone();
    let effects = match action {
        Action::CacheLoaded(Some(records)) if !records.is_empty() => {
            next.records = records;
            next.phase = LoadPhase::StaleDisplayed;
            vec![Effect::Render]
        }
        Action::CacheLoaded(_) => {
            next.phase = LoadPhase::Loading;
            vec![Effect::Render]
        }
        Action::FetchSucceeded(mut records) => {
            sort_newest_first(&mut records);
            next.records = records;
            next.phase = LoadPhase::Fresh;
            vec![Effect::SaveSnapshot(next.records.clone()), Effect::Render]
        }
        Action::FetchFailed => match prev.phase {
            LoadPhase::Loading if prev.records.is_empty() => {
                next.phase = LoadPhase::Empty;
                vec![Effect::Render]
            }
            LoadPhase::Loading => {
                next.phase = LoadPhase::StaleDisplayed;
                vec![Effect::Render]
            }
            _ => vec![],
        },
        Action::CreateFailed => vec![Effect::Alert(Alert::CreateFailed)],
        Action::DeleteRequested { id, snapshot } => {
            next.records.retain(|record| record.id != id);
            next.pending_deletes.push(PendingDelete {
                id,
                records: prev.records.clone(),
                snapshot,
            });
            vec![Effect::SaveSnapshot(next.records.clone()), Effect::Render]
        }
        Action::DeleteConfirmed(id) => {
            next.pending_deletes.retain(|pending| pending.id != id);
            vec![]
        }
        Action::DeleteFailed(id) => {
            let position = next
                .pending_deletes
                .iter()
                .position(|pending| pending.id == id);
            match position {
                Some(position) => {
                    let pending = next.pending_deletes.remove(position);
                    next.records = pending.records;
                    vec![
                        Effect::RestoreSnapshot(pending.snapshot),
                        Effect::Render,
                        Effect::Alert(Alert::DeleteFailed),
                    ]
                }
                None => vec![Effect::Alert(Alert::DeleteFailed)],
            }
        }
        Action::UpdateSucceeded { id, title, caption } => {
            match next.records.iter_mut().find(|record| record.id == id) {
                Some(record) => {
                    record.title = title;
                    record.caption = caption;
                    vec![Effect::SaveSnapshot(next.records.clone()), Effect::Render]
                }
                None => vec![Effect::Render],
            }
        }
        Action::UpdateFailed => vec![Effect::Alert(Alert::UpdateFailed)],
    };
    (next, effects)
}
