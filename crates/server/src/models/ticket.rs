//! Ticket domain types.
//!
//! Wire names are the Portuguese field names the browser client already
//! sends and expects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ticketdesk_core::TicketId;

/// A ticket field exceeded its column width.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field} must be at most {max} characters")]
pub struct TicketFieldError {
    pub field: &'static str,
    pub max: usize,
}

/// The editable content of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetails {
    #[serde(rename = "cep")]
    pub postal_code: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "bairro")]
    pub neighborhood: String,
    #[serde(rename = "rua")]
    pub street: String,
    #[serde(rename = "contribuinte")]
    pub taxpayer: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    /// Free text, stored as the client sent it.
    #[serde(rename = "dataDoPedido")]
    pub order_date: String,
    #[serde(rename = "statusDoPedido")]
    pub order_status: String,
    /// Service-order number.
    #[serde(rename = "os")]
    pub service_order: String,
}

impl TicketDetails {
    /// Check every field against the width of its column.
    ///
    /// # Errors
    ///
    /// Returns the first field that is too long.
    pub fn validate(&self) -> Result<(), TicketFieldError> {
        let limits: [(&'static str, &str, usize); 8] = [
            ("cep", &self.postal_code, 9),
            ("cidade", &self.city, 100),
            ("bairro", &self.neighborhood, 100),
            ("rua", &self.street, 200),
            ("contribuinte", &self.taxpayer, 150),
            ("telefone", &self.phone, 20),
            ("statusDoPedido", &self.order_status, 50),
            ("os", &self.service_order, 50),
        ];

        for (field, value, max) in limits {
            if value.chars().count() > max {
                return Err(TicketFieldError { field, max });
            }
        }
        Ok(())
    }
}

/// A stored ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    #[serde(flatten)]
    pub details: TicketDetails,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_details() -> TicketDetails {
        TicketDetails {
            postal_code: "01310-100".to_owned(),
            city: "São Paulo".to_owned(),
            neighborhood: "Bela Vista".to_owned(),
            street: "Av. Paulista".to_owned(),
            taxpayer: "Maria Souza".to_owned(),
            phone: "+55 11 91234-5678".to_owned(),
            order_date: "2025-10-24".to_owned(),
            order_status: "Aberto".to_owned(),
            service_order: "OS-1042".to_owned(),
        }
    }

    #[test]
    fn test_wire_names() {
        let ticket = Ticket {
            id: TicketId::new(7),
            details: sample_details(),
        };
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["cep"], "01310-100");
        assert_eq!(json["dataDoPedido"], "2025-10-24");
        assert_eq!(json["statusDoPedido"], "Aberto");
        assert_eq!(json["os"], "OS-1042");
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample_details().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_first_overlong_field() {
        let mut details = sample_details();
        details.postal_code = "0131010000".to_owned();
        details.phone = "9".repeat(30);
        assert_eq!(
            details.validate(),
            Err(TicketFieldError {
                field: "cep",
                max: 9
            })
        );
    }

    #[test]
    fn test_width_counts_characters_not_bytes() {
        let mut details = sample_details();
        details.city = "ã".repeat(100);
        assert!(details.validate().is_ok());
    }
}
