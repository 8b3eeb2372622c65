use serde::Serialize;
use utoipa::ToSchema;

use crate::state::game::Person;

/// Person exposed to clients; same shape as the catalog JSON.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PersonDto {
    /// Unique catalog id.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Short hint shown to the guessing team.
    pub description: String,
    /// Picture URL.
    pub image: String,
}

impl From<&Person> for PersonDto {
    fn from(person: &Person) -> Self {
        Self {
            id: person.id,
            name: person.name.clone(),
            description: person.description.clone(),
            image: person.image.clone(),
        }
    }
}
