use async_trait::async_trait;

use ticketdesk_core::TicketId;

use super::PgStore;
use crate::db::{RepositoryError, TicketStore};
use crate::models::{Ticket, TicketDetails};

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i32,
    cep: String,
    cidade: String,
    bairro: String,
    rua: String,
    contribuinte: String,
    telefone: String,
    data_do_pedido: String,
    status_do_pedido: String,
    os: String,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Self {
            id: TicketId::new(row.id),
            details: TicketDetails {
                postal_code: row.cep,
                city: row.cidade,
                neighborhood: row.bairro,
                street: row.rua,
                taxpayer: row.contribuinte,
                phone: row.telefone,
                order_date: row.data_do_pedido,
                order_status: row.status_do_pedido,
                service_order: row.os,
            },
        }
    }
}

const TICKET_COLUMNS: &str = "id, cep, cidade, bairro, rua, contribuinte, telefone, \
                              data_do_pedido, status_do_pedido, os";

#[async_trait]
impl TicketStore for PgStore {
    async fn list_tickets(&self) -> Result<Vec<Ticket>, RepositoryError> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn create_ticket(&self, details: TicketDetails) -> Result<Ticket, RepositoryError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            INSERT INTO tickets (cep, cidade, bairro, rua, contribuinte, telefone,
                                 data_do_pedido, status_do_pedido, os)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(&details.postal_code)
        .bind(&details.city)
        .bind(&details.neighborhood)
        .bind(&details.street)
        .bind(&details.taxpayer)
        .bind(&details.phone)
        .bind(&details.order_date)
        .bind(&details.order_status)
        .bind(&details.service_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_ticket(&self, ticket: Ticket) -> Result<Ticket, RepositoryError> {
        let details = &ticket.details;
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            UPDATE tickets
            SET cep = $2, cidade = $3, bairro = $4, rua = $5, contribuinte = $6,
                telefone = $7, data_do_pedido = $8, status_do_pedido = $9, os = $10
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(ticket.id)
        .bind(&details.postal_code)
        .bind(&details.city)
        .bind(&details.neighborhood)
        .bind(&details.street)
        .bind(&details.taxpayer)
        .bind(&details.phone)
        .bind(&details.order_date)
        .bind(&details.order_status)
        .bind(&details.service_order)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Ticket::from).ok_or(RepositoryError::NotFound)
    }

    async fn delete_ticket(&self, id: TicketId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
