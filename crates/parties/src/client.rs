use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{ClientId, FieldAccessor};

/// Client record (read-only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(alias = "correo", default)]
    pub email: String,
    #[serde(alias = "fechaRegistro")]
    pub registered_at: DateTime<Utc>,
}

/// Fields matched by the client search box.
pub const CLIENT_SEARCH_FIELDS: &[FieldAccessor<Client>] = &[Client::name];

impl Client {
    pub fn new(
        id: ClientId,
        name: impl Into<String>,
        email: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            registered_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registration date as shown in the listing (`dd/mm/yyyy`, date only).
    pub fn registered_on_display(&self) -> String {
        self.registered_at.format("%d/%m/%Y").to_string()
    }
}
