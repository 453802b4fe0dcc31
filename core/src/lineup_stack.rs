use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::artist::ArtistId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackError {
    #[error("artist {0} is not in this stack")]
    NotInStack(ArtistId),
    #[error("artist {0} is already in this stack")]
    AlreadyInStack(ArtistId),
}

/// One lineup slot: a primary artist plus interchangeable alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativesStack {
    id: Uuid,
    primary: ArtistId,
    alternatives: Vec<ArtistId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackRemoval {
    /// The stack still groups at least two artists.
    Remaining(AlternativesStack),
    /// Too few members were left; these artists are no longer stacked.
    Dissolved { released: Vec<ArtistId> },
    /// The artist was not a member; the stack is handed back untouched.
    NotMember(AlternativesStack),
}

impl AlternativesStack {
    pub fn new(primary: ArtistId) -> Self {
        Self::with_id(Uuid::new_v4(), primary)
    }

    pub fn with_id(id: Uuid, primary: ArtistId) -> Self {
        Self {
            id,
            primary,
            alternatives: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn primary(&self) -> ArtistId {
        self.primary
    }

    pub fn alternatives(&self) -> &[ArtistId] {
        &self.alternatives
    }

    /// Primary first, then alternatives in order.
    pub fn members(&self) -> Vec<ArtistId> {
        std::iter::once(self.primary)
            .chain(self.alternatives.iter().copied())
            .collect()
    }

    pub fn member_count(&self) -> usize {
        1 + self.alternatives.len()
    }

    pub fn contains(&self, artist_id: ArtistId) -> bool {
        self.primary == artist_id || self.alternatives.contains(&artist_id)
    }

    pub fn add(&mut self, artist_id: ArtistId) -> Result<(), StackError> {
        if self.contains(artist_id) {
            return Err(StackError::AlreadyInStack(artist_id));
        }
        self.alternatives.push(artist_id);
        Ok(())
    }

    /// Makes `artist_id` the primary; the previous primary takes its place among the alternatives.
    pub fn promote(&mut self, artist_id: ArtistId) -> Result<(), StackError> {
        if self.primary == artist_id {
            return Ok(());
        }
        let position = self
            .alternatives
            .iter()
            .position(|&id| id == artist_id)
            .ok_or(StackError::NotInStack(artist_id))?;

        self.alternatives[position] = self.primary;
        self.primary = artist_id;
        Ok(())
    }

    pub fn remove(mut self, artist_id: ArtistId) -> StackRemoval {
        if !self.contains(artist_id) {
            return StackRemoval::NotMember(self);
        }

        if self.member_count() <= 2 {
            let released = self
                .members()
                .into_iter()
                .filter(|&id| id != artist_id)
                .collect();
            return StackRemoval::Dissolved { released };
        }

        if self.primary == artist_id {
            self.primary = self.alternatives.remove(0);
        } else {
            self.alternatives.retain(|&id| id != artist_id);
        }
        StackRemoval::Remaining(self)
    }

    /// Breaks the grouping up, returning every member.
    pub fn dissolve(self) -> Vec<ArtistId> {
        self.members()
    }
}
