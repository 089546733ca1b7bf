//! Ticket handlers.

use axum::{
    Json,
    extract::{Path, State},
};

use ticketdesk_core::TicketId;

use crate::error::Result;
use crate::models::{Ticket, TicketDetails};
use crate::state::AppState;

pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Ticket>>> {
    Ok(Json(state.tickets().list_tickets().await?))
}

/// Create a ticket. Over-long fields answer 400.
pub async fn create(
    State(state): State<AppState>,
    Json(details): Json<TicketDetails>,
) -> Result<Json<Ticket>> {
    details.validate()?;
    let ticket = state.tickets().create_ticket(details).await?;
    tracing::info!(ticket_id = %ticket.id, "Ticket created");
    Ok(Json(ticket))
}

/// Replace a ticket's fields. 404 if the id is unknown.
pub async fn update(State(state): State<AppState>, Json(ticket): Json<Ticket>) -> Result<Json<Ticket>> {
    ticket.details.validate()?;
    let ticket = state.tickets().update_ticket(ticket).await?;
    tracing::info!(ticket_id = %ticket.id, "Ticket updated");
    Ok(Json(ticket))
}

/// Delete a ticket. Answers `true` if it existed.
pub async fn remove(State(state): State<AppState>, Path(id): Path<TicketId>) -> Result<Json<bool>> {
    let removed = state.tickets().delete_ticket(id).await?;
    if removed {
        tracing::info!(ticket_id = %id, "Ticket deleted");
    }
    Ok(Json(removed))
}
