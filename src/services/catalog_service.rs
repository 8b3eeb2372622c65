use std::sync::Arc;

use tracing::{error, info};

use crate::{
    dao::catalog,
    dto::person::PersonDto,
    error::ServiceError,
    state::{
        CatalogState, SharedState,
        game::{Person, PersonCatalog},
    },
};

/// Fetch the configured catalog once and share it with every session.
pub async fn load(state: SharedState) {
    let source = state.config().catalog().clone();
    state.set_catalog_state(CatalogState::Loading);

    match catalog::fetch(&source).await {
        Ok(persons) => {
            let catalog = Arc::new(PersonCatalog::new(persons.into_iter().map(Person::from)));
            info!(count = catalog.len(), "person catalog ready");
            state.set_catalog_state(CatalogState::Ready(catalog.clone()));

            let sessions: Vec<_> = state
                .sessions()
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            for controller in sessions {
                controller.attach_catalog(catalog.clone()).await;
                controller.publish().await;
            }
        }
        Err(err) => {
            error!(error = %err, source = ?source, "failed to load person catalog");
            state.set_catalog_state(CatalogState::Failed(err.to_string()));
        }
    }
}

/// Every person of the loaded catalog, in catalog order.
pub fn persons(state: &SharedState) -> Result<Vec<PersonDto>, ServiceError> {
    match state.catalog_state() {
        CatalogState::Ready(catalog) => Ok(catalog.iter().map(PersonDto::from).collect()),
        CatalogState::Loading => Err(ServiceError::CatalogUnavailable(
            "person catalog is still loading".into(),
        )),
        CatalogState::Failed(message) => Err(ServiceError::CatalogUnavailable(format!(
            "person catalog failed to load: {message}"
        ))),
    }
}
