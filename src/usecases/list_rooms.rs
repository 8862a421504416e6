use async_trait::async_trait;

use crate::domain::room::RoomSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRoomsOutput {
    pub rooms: Vec<RoomSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomsSourceError {
    Unauthorized,
    Unavailable,
    InvalidData,
}

#[async_trait]
pub trait RoomsSource: Send + Sync {
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, RoomsSourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRoomsError {
    Unauthorized,
    TemporarilyUnavailable,
    DataContractViolation,
}

/// Fetches the baseline room list. Rooms keep the server's order; live
/// ordering is applied when they are merged with room updates.
pub async fn list_rooms(source: &dyn RoomsSource) -> Result<ListRoomsOutput, ListRoomsError> {
    let rooms = source.list_rooms().await.map_err(map_source_error)?;

    Ok(ListRoomsOutput { rooms })
}

fn map_source_error(error: RoomsSourceError) -> ListRoomsError {
    match error {
        RoomsSourceError::Unauthorized => ListRoomsError::Unauthorized,
        RoomsSourceError::Unavailable => ListRoomsError::TemporarilyUnavailable,
        RoomsSourceError::InvalidData => ListRoomsError::DataContractViolation,
    }
}
