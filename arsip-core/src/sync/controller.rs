use crossbeam_channel::{unbounded, Receiver, Sender};
use time::OffsetDateTime;

use crate::{
    cache::SnapshotCache,
    error::Error,
    record::{Draft, Record, RecordId},
    remote::{RemoteRow, RemoteStore},
    search,
    session::Session,
};

use super::state::{reduce, Action, Alert, BoardState, Effect, LoadPhase};

/// What the presentation layer gets to see.
#[derive(Clone, Debug, PartialEq)]
pub enum BoardEvent {
    Render(BoardView),
    Alert(Alert),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoardView {
    pub phase: LoadPhase,
    pub records: Vec<Record>,
}

/// Executes board operations against the remote store and the local
/// snapshot, driving `BoardState` through `reduce`.  Every state change is
/// published as a `BoardEvent`.
pub struct SyncController<R> {
    remote: R,
    cache: SnapshotCache,
    state: BoardState,
    sender: Sender<BoardEvent>,
    receiver: Receiver<BoardEvent>,
}

impl<R: RemoteStore> SyncController<R> {
    pub fn new(remote: R, cache: SnapshotCache) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            remote,
            cache,
            state: BoardState::default(),
            sender,
            receiver,
        }
    }

    pub fn receiver(&self) -> Receiver<BoardEvent> {
        self.receiver.clone()
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn records(&self) -> &[Record] {
        self.state.records()
    }

    pub fn search(&self, term: &str) -> Vec<&Record> {
        search::filter(self.state.records(), term)
    }

    /// Show the cached snapshot right away (if there is one), then refresh
    /// from the remote store.  A failed refresh is logged, not surfaced, and
    /// not retried.
    pub fn load(&mut self, session: &Session) -> Result<LoadPhase, Error> {
        session.ensure_authenticated()?;
        self.refresh();
        Ok(self.state.phase())
    }

    /// Write a new record through to the remote store, then reload the whole
    /// board so server-assigned fields (like the stored image URL) show up.
    pub fn create(&mut self, session: &Session, draft: Draft) -> Result<RecordId, Error> {
        session.ensure_authenticated()?;
        draft.validate()?;

        let record = Record::from_draft(draft, OffsetDateTime::now_utc(), &mut rand::rng());
        match self.remote.create(&record) {
            Ok(()) => {
                log::info!("created record {}", record.id);
                self.refresh();
                Ok(record.id)
            }
            Err(err) => {
                log::error!("failed to create record {}: {}", record.id, err);
                self.dispatch(Action::CreateFailed);
                Err(err)
            }
        }
    }

    /// Remove the record locally first, then confirm with the remote store.
    /// On failure the previous record set comes back, in memory and on disk.
    pub fn delete(&mut self, session: &Session, id: &RecordId) -> Result<(), Error> {
        session.ensure_authenticated()?;

        self.dispatch(Action::DeleteRequested {
            id: id.clone(),
            snapshot: self.cache.raw(),
        });
        match self.remote.delete(id) {
            Ok(()) => {
                log::info!("deleted record {}", id);
                self.dispatch(Action::DeleteConfirmed(id.clone()));
                Ok(())
            }
            Err(err) => {
                log::error!("failed to delete record {}, rolling back: {}", id, err);
                self.dispatch(Action::DeleteFailed(id.clone()));
                Err(err)
            }
        }
    }

    /// Change title and caption.  Applied locally only once the remote store
    /// accepted it.
    pub fn update(
        &mut self,
        session: &Session,
        id: &RecordId,
        title: &str,
        caption: &str,
    ) -> Result<(), Error> {
        session.ensure_authenticated()?;
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("title is required"));
        }
        if caption.trim().is_empty() {
            return Err(Error::InvalidInput("caption is required"));
        }

        match self.remote.update(id, title, caption) {
            Ok(()) => {
                log::info!("updated record {}", id);
                self.dispatch(Action::UpdateSucceeded {
                    id: id.clone(),
                    title: title.to_owned(),
                    caption: caption.to_owned(),
                });
                Ok(())
            }
            Err(err) => {
                log::error!("failed to update record {}: {}", id, err);
                self.dispatch(Action::UpdateFailed);
                Err(err)
            }
        }
    }

    fn refresh(&mut self) {
        self.dispatch(Action::CacheLoaded(self.cache.load()));

        match self.remote.fetch_all() {
            Ok(rows) => {
                let total = rows.len();
                let records: Vec<Record> =
                    rows.into_iter().filter_map(RemoteRow::into_record).collect();
                if records.len() < total {
                    log::debug!("dropped {} unusable rows", total - records.len());
                }
                self.dispatch(Action::FetchSucceeded(records));
            }
            Err(err) => {
                log::warn!("fetching records failed, keeping what we have: {}", err);
                self.dispatch(Action::FetchFailed);
            }
        }
    }

    fn dispatch(&mut self, action: Action) {
        let (next, effects) = reduce(&self.state, action);
        self.state = next;
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&self, effect: Effect) {
        match effect {
            Effect::SaveSnapshot(records) => {
                if let Err(err) = self.cache.save(&records) {
                    log::error!("failed to save memories snapshot: {}", err);
                }
            }
            Effect::RestoreSnapshot(raw) => {
                if let Err(err) = self.cache.restore(raw.as_deref()) {
                    log::error!("failed to restore memories snapshot: {}", err);
                }
            }
            Effect::Render => self.publish(BoardEvent::Render(BoardView {
                phase: self.state.phase(),
                records: self.state.records().to_vec(),
            })),
            Effect::Alert(alert) => self.publish(BoardEvent::Alert(alert)),
        }
    }

    fn publish(&self, event: BoardEvent) {
        if self.sender.send(event).is_err() {
            log::warn!("board event dropped, no receiver");
        }
    }
}
